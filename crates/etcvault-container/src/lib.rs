//! Wire container codec for `etcvault`.
//!
//! Every value that etcvault touches on the wire is a *container*: the exact
//! string `ETCVAULT::<version>:<payload>::ETCVAULT`. This crate parses and
//! serializes the three container versions and nothing else — no I/O, no
//! cryptography. Strings that do not have container shape are reported as
//! [`ContainerError::Invalid`] so callers can pass them through untouched.

pub mod asis;
pub mod basic;
pub mod error;
pub mod plain1;
pub mod v1;

use std::fmt;

pub use asis::Asis;
pub use basic::Basic;
pub use error::ContainerError;
pub use plain1::Plain1;
pub use v1::V1;

/// A parsed container of any version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// `asis` — decodes to a fixed literal, bypassing cryptography.
    Asis(Asis),
    /// `plain`/`plain1` — cleartext awaiting encryption on first write.
    Plain1(Plain1),
    /// `1` — RSA/AES ciphertext.
    V1(V1),
}

impl Container {
    /// Parse a wire string, dispatching on the version tag.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Invalid`] when the input has no container shape at
    /// all, [`ContainerError::UnknownVersion`] for an unrecognized version
    /// tag, and the variant parsers' errors otherwise.
    pub fn parse(input: &str) -> Result<Self, ContainerError> {
        let basic = Basic::parse(input)?;

        match basic.version.as_str() {
            "1" => V1::parse(input).map(Container::V1),
            "plain" | "plain1" => Plain1::parse(input).map(Container::Plain1),
            "asis" => Asis::parse(input).map(Container::Asis),
            _ => Err(ContainerError::UnknownVersion),
        }
    }

    /// The canonical version tag of this container.
    #[must_use]
    pub fn version(&self) -> &'static str {
        match self {
            Container::Asis(_) => "asis",
            Container::Plain1(_) => "plain1",
            Container::V1(_) => "1",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Asis(c) => c.fmt(f),
            Container::Plain1(c) => c.fmt(f),
            Container::V1(c) => c.fmt(f),
        }
    }
}
