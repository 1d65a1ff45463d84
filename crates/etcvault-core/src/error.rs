//! Error types for `etcvault-core`.
//!
//! Key errors never include key material — only names and operation
//! descriptions.

use etcvault_container::ContainerError;

/// Errors from loading, parsing, or serializing a single key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The input contained no PEM block this crate understands.
    #[error("couldn't find pem block")]
    MissingPem,

    /// The PEM block parsed but holds a non-RSA key.
    #[error("not an RSA key")]
    NotRsa,

    /// PKCS#1 DER inside a private-key PEM failed to parse or serialize.
    #[error("invalid pkcs#1 key data: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// SPKI DER inside a public-key PEM failed to parse or serialize.
    #[error("invalid public key data: {0}")]
    Spki(#[from] rsa::pkcs8::spki::Error),

    /// RSA key generation failed.
    #[error("key generation failed: {0}")]
    Generate(#[from] rsa::Error),

    /// A PEM header could not be attached.
    #[error("couldn't build pem block: {0}")]
    Pem(#[from] pem::PemError),
}

/// Errors from the on-disk keychain.
#[derive(Debug, thiserror::Error)]
pub enum KeychainError {
    /// Neither `<name>.pem` nor `<name>.pub` exists.
    #[error("couldn't find specified key")]
    NotFound,

    /// A key of this name is already present; saves never overwrite.
    #[error("key already exists: {name}")]
    AlreadyExists { name: String },

    /// A key file existed but failed to load.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Filesystem access failed.
    #[error("keychain io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the symmetric (AES-ECB + PKCS#7) layer.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("pkcs7 padding invalid")]
    InvalidPadding,

    #[error("invalid length; it should be multiple of aes block size")]
    InvalidLength,

    /// AES accepts 16, 24, or 32 byte keys only.
    #[error("unsupported aes key length: {len}")]
    InvalidKeyLength { len: usize },
}

/// Errors from the transformation engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Keychain(#[from] KeychainError),

    /// Decryption was requested but only the public half is available.
    #[error("no private key provided")]
    NoPrivateKey,

    /// The RSA modulus cannot wrap even a 16-byte AES content key.
    #[error("key too short; couldn't generate 16, 24, and 32 bytes aes key")]
    TooShortKey,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// RSA-OAEP encryption or decryption failed.
    #[error("rsa operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    /// Decrypted bytes must form a valid etcd value string.
    #[error("decrypted content is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Re-serialization of a rewritten JSON document failed.
    #[error("couldn't serialize transformed response: {0}")]
    Json(#[from] serde_json::Error),
}
