//! The transformation engine.
//!
//! One entry point, [`Engine::transform`], turns a candidate string into
//! either its unchanged self (not a container), an encrypted V1 container
//! (cleartext `plain1` input), or decrypted plaintext (`v1` input). The
//! proxy drives the engine through the [`Transformer`] trait so tests can
//! substitute their own.

use std::sync::Arc;

use etcvault_container::{Container, ContainerError, Plain1, V1};
use rand::rngs::OsRng;
use rand::RngCore as _;
use rsa::Oaep;
use sha2::Sha256;

use crate::ecb;
use crate::error::EngineError;
use crate::key::Key;
use crate::keychain::Keychain;

/// The seam between the proxy and the engine.
pub trait Transformer: Send + Sync {
    /// Transform a single candidate value string.
    fn transform(&self, text: &str) -> Result<String, EngineError>;

    /// Rewrite an etcd JSON response body (see the `json` module).
    fn transform_etcd_response(&self, body: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// The keychain backing this transformer, for key listings.
    fn keychain(&self) -> &Keychain;
}

/// The production engine: hybrid RSA-OAEP / AES encryption over a keychain.
#[derive(Debug)]
pub struct Engine {
    keychain: Arc<Keychain>,
}

impl Engine {
    #[must_use]
    pub fn new(keychain: Arc<Keychain>) -> Self {
        Engine { keychain }
    }

    /// Transform a candidate string.
    ///
    /// Non-container input is returned unchanged with no error; every other
    /// failure (semantic parse errors, key resolution, cryptography)
    /// surfaces to the caller.
    pub fn transform(&self, text: &str) -> Result<String, EngineError> {
        let (result, _) = self.transform_and_parse(text)?;
        Ok(result)
    }

    /// Like [`transform`](Engine::transform), but also hands back the parsed
    /// source container (when there was one) for auditing.
    pub fn transform_and_parse(
        &self,
        text: &str,
    ) -> Result<(String, Option<Container>), EngineError> {
        let container = match Container::parse(text) {
            Ok(container) => container,
            Err(ContainerError::Invalid) => return Ok((text.to_owned(), None)),
            Err(err) => return Err(err.into()),
        };

        let result = match &container {
            Container::Asis(asis) => asis.content.clone(),
            Container::Plain1(plain) => self.encrypt_plain1(plain)?,
            Container::V1(v1) => self.decrypt_v1(v1)?,
        };

        Ok((result, Some(container)))
    }

    /// Encrypt cleartext under the named key, emitting a V1 container.
    ///
    /// Short form when the cleartext fits in one OAEP message; long form
    /// (RSA-wrapped AES content key) otherwise.
    fn encrypt_plain1(&self, plain: &Plain1) -> Result<String, EngineError> {
        let key = self.keychain.find(&plain.key_name)?;
        let content = plain.content.as_bytes();

        if fits(content.len(), key.max_message_len()) {
            let encrypted = key
                .public
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), content)?;
            let result = V1 {
                key_name: key.name.clone(),
                content_key: None,
                content: encrypted,
            };
            return Ok(result.to_string());
        }

        self.encrypt_plain1_long(&key, plain)
    }

    fn encrypt_plain1_long(&self, key: &Key, plain: &Plain1) -> Result<String, EngineError> {
        let max = key.max_message_len();

        // The largest AES key size OAEP can still wrap under this modulus.
        let content_key_len = *[32usize, 24, 16]
            .iter()
            .find(|&&len| fits(len, max))
            .ok_or(EngineError::TooShortKey)?;

        let mut content_key = vec![0u8; content_key_len];
        OsRng.fill_bytes(&mut content_key);

        let wrapped_key = key
            .public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &content_key)?;
        let encrypted = ecb::encrypt_with_pkcs7(&content_key, plain.content.as_bytes())?;

        let result = V1 {
            key_name: key.name.clone(),
            content_key: Some(wrapped_key),
            content: encrypted,
        };
        Ok(result.to_string())
    }

    /// Decrypt a V1 container back to its cleartext.
    fn decrypt_v1(&self, v1: &V1) -> Result<String, EngineError> {
        let key = self.keychain.find(&v1.key_name)?;
        let private = key.private.as_ref().ok_or(EngineError::NoPrivateKey)?;

        let plaintext = match &v1.content_key {
            None => private.decrypt(Oaep::new::<Sha256>(), &v1.content)?,
            Some(wrapped_key) => {
                let content_key = private.decrypt(Oaep::new::<Sha256>(), wrapped_key)?;
                ecb::decrypt_with_pkcs7(&content_key, &v1.content)?
            }
        };

        Ok(String::from_utf8(plaintext)?)
    }
}

fn fits(len: usize, max: i64) -> bool {
    i64::try_from(len).is_ok_and(|len| len <= max)
}

impl Transformer for Engine {
    fn transform(&self, text: &str) -> Result<String, EngineError> {
        Engine::transform(self, text)
    }

    fn transform_etcd_response(&self, body: &[u8]) -> Result<Vec<u8>, EngineError> {
        Engine::transform_etcd_response(self, body)
    }

    fn keychain(&self) -> &Keychain {
        &self.keychain
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::KeychainError;
    use crate::testutil;

    fn fixture_engine() -> (tempfile::TempDir, Engine) {
        let (dir, keychain) = testutil::keychain_with_fixture_keys();
        (dir, Engine::new(Arc::new(keychain)))
    }

    #[test]
    fn passes_plain_text_through() {
        let (_dir, engine) = fixture_engine();

        assert_eq!(engine.transform("plain text").unwrap(), "plain text");
    }

    #[test]
    fn unwraps_asis_container() {
        let (_dir, engine) = fixture_engine();

        assert_eq!(
            engine.transform("ETCVAULT::asis:plain::ETCVAULT").unwrap(),
            "plain"
        );
    }

    #[test]
    fn surfaces_semantic_parse_errors() {
        let (_dir, engine) = fixture_engine();

        let err = engine
            .transform("ETCVAULT::plain1::ETCVAULT")
            .unwrap_err();
        assert_eq!(err.to_string(), "couldn't parse");
    }

    #[test]
    fn encrypts_short_cleartext_and_round_trips() {
        let (_dir, engine) = fixture_engine();

        let encrypted = engine
            .transform("ETCVAULT::plain:the-key:this text should be encrypted::ETCVAULT")
            .unwrap();

        assert!(encrypted.starts_with("ETCVAULT::1:the-key::"));
        assert!(!encrypted.contains("this text should be encrypted"));

        assert_eq!(
            engine.transform(&encrypted).unwrap(),
            "this text should be encrypted"
        );
    }

    #[test]
    fn encrypts_long_cleartext_and_round_trips() {
        let (_dir, engine) = fixture_engine();
        let cleartext =
            "this text is too long so this should be long format aaaaaaaaaaaaaaaaaaaaaaaaaa";

        let encrypted = engine
            .transform(&format!("ETCVAULT::plain:the-key:{cleartext}::ETCVAULT"))
            .unwrap();

        assert!(encrypted.starts_with("ETCVAULT::1:the-key:long:"));
        assert!(!encrypted.contains(cleartext));

        assert_eq!(engine.transform(&encrypted).unwrap(), cleartext);
    }

    #[test]
    fn decrypts_recorded_short_form_ciphertext() {
        let (_dir, engine) = fixture_engine();

        let decrypted = engine
            .transform("ETCVAULT::1:the-key::oXKv3edU7AjUXK1+7+Ng7y5tjByLzMe8MRL2lCxlsE03pHS2AXnd3mvar5dkbgeTU4dY8lcMPYAqRGXi2y9YJ7MD+8vKpkORczLYOBTiSXY8cuttvWY+ffjeJMSsLiHn0tDdtjvCtshSBTe9vLz75yyW8J91DUm9CriHWtQhaXw=::ETCVAULT")
            .unwrap();

        assert_eq!(decrypted, "this text should be encrypted");
    }

    #[test]
    fn decrypts_recorded_long_form_ciphertext() {
        let (_dir, engine) = fixture_engine();

        let decrypted = engine
            .transform("ETCVAULT::1:the-key:long:JRrn3XxO/HJEu/xYblTkxooOGvFkvnHz4AyinTceZMI2ybRbS2TyoOS+fTGZTTdUMnQ0gKhqH/KsCBjtvW/lw+CXEXVooCmpRCRyVYJIu/FH+oarHIGkpDTeJruEVaL1Jlvo0gb9Ea4zeZuKSiabY+puoTHVCEm1sEN8pHE48xA=,6LaTIBRfKOMBfHq/2JaF/ooeVe97GLGe5gJB8DBYMI30q8mynk9DoMgDKX4ROoiUXatFhSS20hvIIZEUwt62qN7ksivXSb9OybZwU22h6Kw=::ETCVAULT")
            .unwrap();

        assert_eq!(
            decrypted,
            "this text is too long so this should be long format aaaaaaaaaaaaaaaaaaaaaaaaaa"
        );
    }

    #[test]
    fn form_selection_follows_the_oaep_capacity_boundary() {
        // 1024-bit modulus, SHA-256 OAEP: capacity is 62 bytes. One byte
        // either side of the boundary flips the container form.
        let (_dir, engine) = fixture_engine();

        for (len, prefix) in [
            (61, "ETCVAULT::1:the-key::"),
            (62, "ETCVAULT::1:the-key::"),
            (63, "ETCVAULT::1:the-key:long:"),
        ] {
            let cleartext = "a".repeat(len);
            let encrypted = engine
                .transform(&format!("ETCVAULT::plain:the-key:{cleartext}::ETCVAULT"))
                .unwrap();
            assert!(encrypted.starts_with(prefix), "len {len}: {encrypted}");
            assert_eq!(engine.transform(&encrypted).unwrap(), cleartext, "len {len}");
        }
    }

    #[test]
    fn encryption_with_unknown_key_fails() {
        let (_dir, engine) = fixture_engine();

        let err = engine
            .transform("ETCVAULT::plain:nope:text::ETCVAULT")
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Keychain(KeychainError::NotFound)
        ));
    }

    #[test]
    fn decryption_without_private_key_fails() {
        let (_dir, engine) = fixture_engine();

        // `pubkey.pub` holds only the public half.
        let err = engine
            .transform("ETCVAULT::1:pubkey::aGVsbG8=::ETCVAULT")
            .unwrap_err();
        assert!(matches!(err, EngineError::NoPrivateKey));
    }

    #[test]
    fn tiny_key_cannot_wrap_any_content_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let keychain = Arc::new(Keychain::new(dir.path()));
        keychain.save(&Key::generate("tiny", 512).unwrap()).unwrap();

        let engine = Engine::new(Arc::clone(&keychain));
        let long_text = "a".repeat(200);

        let err = engine
            .transform(&format!("ETCVAULT::plain:tiny:{long_text}::ETCVAULT"))
            .unwrap_err();
        assert!(matches!(err, EngineError::TooShortKey));
    }

    #[test]
    fn transform_and_parse_reports_source_container() {
        let (_dir, engine) = fixture_engine();

        let (result, container) = engine
            .transform_and_parse("ETCVAULT::asis:plain::ETCVAULT")
            .unwrap();
        assert_eq!(result, "plain");
        assert_eq!(container.map(|c| c.version()), Some("asis"));

        let (result, container) = engine.transform_and_parse("not a container").unwrap();
        assert_eq!(result, "not a container");
        assert!(container.is_none());
    }
}
