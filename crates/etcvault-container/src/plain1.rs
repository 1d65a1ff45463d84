//! The `plain1` container: a key name and cleartext payload, written by a
//! client and meant to be encrypted by the proxy on its way to storage.
//!
//! Accepted version tags are `plain` and `plain1`; the serializer emits
//! `plain`, matching what is expected on the wire.

use std::fmt;

use crate::basic::Basic;
use crate::error::ContainerError;

/// A `plain1` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plain1 {
    pub key_name: String,
    pub content: String,
}

impl Plain1 {
    /// Parse a `plain`/`plain1` container. The payload is
    /// `<keyName>:<content>`, split at the first `:`.
    ///
    /// # Errors
    ///
    /// Structural errors from [`Basic::parse`];
    /// [`ContainerError::DifferentVersion`] for any other version tag;
    /// [`ContainerError::Parse`] when the payload has no `:` separator.
    pub fn parse(input: &str) -> Result<Self, ContainerError> {
        let basic = Basic::parse(input)?;

        if basic.version != "plain" && basic.version != "plain1" {
            return Err(ContainerError::DifferentVersion);
        }

        let (key_name, content) = basic
            .content
            .split_once(':')
            .ok_or(ContainerError::Parse)?;

        Ok(Plain1 {
            key_name: key_name.to_owned(),
            content: content.to_owned(),
        })
    }
}

impl fmt::Display for Plain1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ETCVAULT::plain:{}:{}::ETCVAULT",
            self.key_name, self.content
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_alias() {
        let plain = Plain1::parse("ETCVAULT::plain:foo:content::ETCVAULT").unwrap();

        assert_eq!(plain.key_name, "foo");
        assert_eq!(plain.content, "content");
    }

    #[test]
    fn parses_plain1_alias() {
        let plain = Plain1::parse("ETCVAULT::plain1:foo:content::ETCVAULT").unwrap();

        assert_eq!(plain.key_name, "foo");
        assert_eq!(plain.content, "content");
    }

    #[test]
    fn content_may_contain_separators() {
        let plain = Plain1::parse("ETCVAULT::plain:foo:a:b:c::ETCVAULT").unwrap();

        assert_eq!(plain.key_name, "foo");
        assert_eq!(plain.content, "a:b:c");
    }

    #[test]
    fn rejects_missing_key_separator() {
        assert_eq!(
            Plain1::parse("ETCVAULT::plain1:justakey::ETCVAULT"),
            Err(ContainerError::Parse)
        );
    }

    #[test]
    fn rejects_other_versions() {
        assert_eq!(
            Plain1::parse("ETCVAULT::asis:content::ETCVAULT"),
            Err(ContainerError::DifferentVersion)
        );
    }

    #[test]
    fn serializes_with_plain_version() {
        let plain = Plain1 {
            key_name: "foo".to_owned(),
            content: "content".to_owned(),
        };
        assert_eq!(plain.to_string(), "ETCVAULT::plain:foo:content::ETCVAULT");
    }
}
