//! The `asis` container: an explicit "don't touch" marker whose payload is
//! returned verbatim by the transformation engine.

use std::fmt;

use crate::basic::Basic;
use crate::error::ContainerError;

/// An `asis` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asis {
    pub content: String,
}

impl Asis {
    /// Parse an `asis` container.
    ///
    /// # Errors
    ///
    /// Structural errors from [`Basic::parse`], or
    /// [`ContainerError::DifferentVersion`] when the version tag is not
    /// `asis`.
    pub fn parse(input: &str) -> Result<Self, ContainerError> {
        let basic = Basic::parse(input)?;

        if basic.version != "asis" {
            return Err(ContainerError::DifferentVersion);
        }

        Ok(Asis {
            content: basic.content,
        })
    }
}

impl fmt::Display for Asis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ETCVAULT::asis:{}::ETCVAULT", self.content)
    }
}
