//! Structural layer of the container grammar.
//!
//! [`Basic`] splits a wire string into its version tag and raw payload
//! without interpreting either. The variant parsers build on it.

use std::fmt;

use crate::error::ContainerError;

const PREFIX: &str = "ETCVAULT::";
const SUFFIX: &str = "::ETCVAULT";

/// Shortest possible container: `ETCVAULT:::::ETCVAULT` (empty version and
/// payload) is 21 bytes.
const MIN_LEN: usize = 21;

/// A structurally parsed container: version tag plus uninterpreted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basic {
    pub version: String,
    pub content: String,
}

impl Basic {
    /// Parse the outer sentinel grammar.
    ///
    /// Requires the total length to be at least 21 bytes, the prefix
    /// `ETCVAULT::` to occur in the input, and the first occurrence of the
    /// suffix `::ETCVAULT` to sit exactly at the end. The inner section is
    /// the byte range `10..len-10`, split at its first `:` into version and
    /// payload.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Invalid`] when the sentinel frame is absent,
    /// [`ContainerError::Parse`] when the frame is present but the inner
    /// section has no `:` separator.
    pub fn parse(input: &str) -> Result<Self, ContainerError> {
        if input.len() < MIN_LEN {
            return Err(ContainerError::Invalid);
        }
        if !input.contains(PREFIX) || input.find(SUFFIX) != Some(input.len() - SUFFIX.len()) {
            return Err(ContainerError::Invalid);
        }

        let inner = input
            .get(PREFIX.len()..input.len() - SUFFIX.len())
            .ok_or(ContainerError::Invalid)?;

        let (version, content) = inner.split_once(':').ok_or(ContainerError::Parse)?;

        Ok(Basic {
            version: version.to_owned(),
            content: content.to_owned(),
        })
    }
}

impl fmt::Display for Basic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}:{}{SUFFIX}", self.version, self.content)
    }
}
