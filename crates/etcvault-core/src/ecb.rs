//! AES block-by-block encryption with PKCS#7 padding, as used by long-form
//! V1 containers.
//!
//! Each block is enciphered independently (ECB). This is a known weakness
//! of the V1 format that must be preserved bit-exactly: values already in
//! storage were produced this way, and a format revision — not a silent
//! cipher change — is the migration path.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};

use crate::error::CryptoError;

pub(crate) const BLOCK_SIZE: usize = 16;

enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockCipher {
    fn new(key: &[u8]) -> Result<Self, CryptoError> {
        match key.len() {
            16 => Ok(BlockCipher::Aes128(Aes128::new(GenericArray::from_slice(
                key,
            )))),
            24 => Ok(BlockCipher::Aes192(Aes192::new(GenericArray::from_slice(
                key,
            )))),
            32 => Ok(BlockCipher::Aes256(Aes256::new(GenericArray::from_slice(
                key,
            )))),
            len => Err(CryptoError::InvalidKeyLength { len }),
        }
    }

    fn encrypt_block(&self, block: &mut Block) {
        match self {
            BlockCipher::Aes128(cipher) => cipher.encrypt_block(block),
            BlockCipher::Aes192(cipher) => cipher.encrypt_block(block),
            BlockCipher::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut Block) {
        match self {
            BlockCipher::Aes128(cipher) => cipher.decrypt_block(block),
            BlockCipher::Aes192(cipher) => cipher.decrypt_block(block),
            BlockCipher::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }
}

/// Pad with PKCS#7 and encrypt each block independently.
pub(crate) fn encrypt_with_pkcs7(key: &[u8], msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = BlockCipher::new(key)?;

    let mut out = pad(msg);
    for chunk in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(Block::from_mut_slice(chunk));
    }
    Ok(out)
}

/// Decrypt each block independently and strip PKCS#7 padding.
///
/// # Errors
///
/// [`CryptoError::InvalidLength`] unless the input is a non-empty multiple
/// of the block size; [`CryptoError::InvalidPadding`] when the tail is not
/// uniform padding.
pub(crate) fn decrypt_with_pkcs7(key: &[u8], msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = BlockCipher::new(key)?;

    if msg.is_empty() || msg.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidLength);
    }

    let mut out = msg.to_vec();
    for chunk in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(Block::from_mut_slice(chunk));
    }
    unpad(&mut out)?;
    Ok(out)
}

/// PKCS#7: always at least one byte of padding, up to a full block.
fn pad(msg: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - msg.len() % BLOCK_SIZE;

    let mut out = Vec::with_capacity(msg.len() + padding);
    out.extend_from_slice(msg);
    #[allow(clippy::cast_possible_truncation)]
    out.resize(msg.len() + padding, padding as u8);
    out
}

fn unpad(msg: &mut Vec<u8>) -> Result<(), CryptoError> {
    let padding = usize::from(*msg.last().ok_or(CryptoError::InvalidPadding)?);

    if padding == 0 || padding > msg.len() {
        return Err(CryptoError::InvalidPadding);
    }
    if msg[msg.len() - padding..]
        .iter()
        .any(|&b| usize::from(b) != padding)
    {
        return Err(CryptoError::InvalidPadding);
    }

    msg.truncate(msg.len() - padding);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY_16: &[u8] = b"0123456789abcdef";
    const KEY_32: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn round_trips_short_message() {
        let encrypted = encrypt_with_pkcs7(KEY_16, b"hello").unwrap();

        assert_eq!(encrypted.len(), BLOCK_SIZE);
        assert_eq!(decrypt_with_pkcs7(KEY_16, &encrypted).unwrap(), b"hello");
    }

    #[test]
    fn round_trips_block_aligned_message() {
        let msg = b"exactly 16 bytes";
        let encrypted = encrypt_with_pkcs7(KEY_32, msg).unwrap();

        // A full extra block of padding.
        assert_eq!(encrypted.len(), 2 * BLOCK_SIZE);
        assert_eq!(decrypt_with_pkcs7(KEY_32, &encrypted).unwrap(), msg);
    }

    #[test]
    fn round_trips_empty_message() {
        let encrypted = encrypt_with_pkcs7(KEY_16, b"").unwrap();

        assert_eq!(encrypted.len(), BLOCK_SIZE);
        assert_eq!(decrypt_with_pkcs7(KEY_16, &encrypted).unwrap(), b"");
    }

    #[test]
    fn identical_blocks_produce_identical_ciphertext() {
        // The defining (mis)feature of ECB, relied on for compatibility.
        let msg = [b'a'; 32];
        let encrypted = encrypt_with_pkcs7(KEY_16, &msg).unwrap();

        assert_eq!(encrypted[0..16], encrypted[16..32]);
    }

    #[test]
    fn rejects_unaligned_ciphertext() {
        assert!(matches!(
            decrypt_with_pkcs7(KEY_16, &[0u8; 17]),
            Err(CryptoError::InvalidLength)
        ));
    }

    #[test]
    fn rejects_empty_ciphertext() {
        assert!(matches!(
            decrypt_with_pkcs7(KEY_16, &[]),
            Err(CryptoError::InvalidLength)
        ));
    }

    #[test]
    fn rejects_non_uniform_padding() {
        // A block whose tail claims three bytes of padding but only has one.
        let cipher = BlockCipher::new(KEY_16).unwrap();
        let mut block = *Block::from_slice(b"aaaaaaaaaaaaa\x02\x02\x03");
        cipher.encrypt_block(&mut block);

        assert!(matches!(
            decrypt_with_pkcs7(KEY_16, block.as_slice()),
            Err(CryptoError::InvalidPadding)
        ));
    }

    #[test]
    fn rejects_unsupported_key_length() {
        assert!(matches!(
            encrypt_with_pkcs7(b"short", b"hello"),
            Err(CryptoError::InvalidKeyLength { len: 5 })
        ));
    }

    #[test]
    fn unpad_validates_every_tail_byte() {
        let mut msg = b"aaaaaaaaaaaaab\x02\x03".to_vec();
        assert!(matches!(
            unpad(&mut msg),
            Err(CryptoError::InvalidPadding)
        ));

        let mut ok = b"aaaaaaaaaaaaaa\x02\x02".to_vec();
        unpad(&mut ok).unwrap();
        assert_eq!(ok, b"aaaaaaaaaaaaaa");
    }
}
