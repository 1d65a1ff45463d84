//! The V1 ciphertext container.
//!
//! Short form carries an RSA-encrypted payload directly; long form carries
//! an RSA-wrapped AES content key alongside the AES-encrypted payload. The
//! wire payload is `<keyName>:<formatTag>:<rest>`; the format tag is the
//! string `long` for long form and empty for short form, so short-form wire
//! strings contain two adjacent colons. Both byte strings travel as
//! standard padded base64, joined by a single comma in long form.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::basic::Basic;
use crate::error::ContainerError;

/// A V1 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V1 {
    pub key_name: String,
    /// RSA-wrapped AES content key; present exactly in long form.
    pub content_key: Option<Vec<u8>>,
    /// RSA ciphertext (short form) or AES ciphertext (long form).
    pub content: Vec<u8>,
}

impl V1 {
    /// Parse a V1 container.
    ///
    /// # Errors
    ///
    /// Structural errors from [`Basic::parse`];
    /// [`ContainerError::DifferentVersion`] when the version tag is not `1`;
    /// [`ContainerError::Parse`] when the three-way payload split or the
    /// long-form comma split fails; [`ContainerError::Base64`] for invalid
    /// base64 fragments.
    pub fn parse(input: &str) -> Result<Self, ContainerError> {
        let basic = Basic::parse(input)?;

        if basic.version != "1" {
            return Err(ContainerError::DifferentVersion);
        }

        let (key_name, rest) = basic
            .content
            .split_once(':')
            .ok_or(ContainerError::Parse)?;
        let (format, content_part) = rest.split_once(':').ok_or(ContainerError::Parse)?;

        let (content_key, content) = if format == "long" {
            let (key_b64, content_b64) =
                content_part.split_once(',').ok_or(ContainerError::Parse)?;
            (
                Some(BASE64.decode(key_b64)?),
                BASE64.decode(content_b64)?,
            )
        } else {
            (None, BASE64.decode(content_part)?)
        };

        Ok(V1 {
            key_name: key_name.to_owned(),
            content_key,
            content,
        })
    }
}

impl fmt::Display for V1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content_key {
            Some(content_key) => write!(
                f,
                "ETCVAULT::1:{}:long:{},{}::ETCVAULT",
                self.key_name,
                BASE64.encode(content_key),
                BASE64.encode(&self.content)
            ),
            None => write!(
                f,
                "ETCVAULT::1:{}::{}::ETCVAULT",
                self.key_name,
                BASE64.encode(&self.content)
            ),
        }
    }
}
