//! Passphrase-based encryption of secrets kept in the configuration file.
//!
//! Values are sealed with ChaCha20-Poly1305. The key is derived from the
//! passphrase and a random per-value salt with PBKDF2-HMAC-SHA256. The stored
//! form is the lowercase hex encoding of `salt || nonce || ciphertext`.

use chacha20poly1305::{
    ChaCha20Poly1305, KeyInit, Nonce,
    aead::{Aead, OsRng, rand_core::RngCore},
};
use ring::pbkdf2;
use std::num::NonZeroU32;
use thiserror::Error;
use zeroize::Zeroize;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// PBKDF2 rounds for deriving a sealing key from a passphrase.
const KDF_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(iterations) => iterations,
    None => panic!("iteration count must be non-zero"),
};

/// Error type for cipher operations.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The stored value is not valid hex.
    #[error("invalid encoding: {0}")]
    Encoding(#[from] hex::FromHexError),

    /// The stored value is too short to hold a salt and nonce.
    #[error("encrypted value too short")]
    Truncated,

    /// Authentication failed, usually because the passphrase is wrong.
    #[error("decryption failed")]
    Decrypt,

    /// Sealing the value failed.
    #[error("encryption failed")]
    Encrypt,

    /// The decrypted bytes are not UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encrypt `plaintext` under `passphrase`.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<String, CipherError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = cipher_for(&salt, passphrase)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|_| CipherError::Encrypt)?;

    let mut combined = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(hex::encode(combined))
}

/// Decrypt a value produced by [`encrypt`].
///
/// Fails with [`CipherError::Decrypt`] when `passphrase` differs from the one
/// used to encrypt.
pub fn decrypt(encoded: &str, passphrase: &str) -> Result<String, CipherError> {
    let combined = hex::decode(encoded.trim())?;
    if combined.len() < SALT_LEN + NONCE_LEN {
        return Err(CipherError::Truncated);
    }

    let (salt, rest) = combined.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = cipher_for(salt, passphrase)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::Decrypt)?;

    Ok(String::from_utf8(plaintext)?)
}

fn cipher_for(salt: &[u8], passphrase: &str) -> Result<ChaCha20Poly1305, CipherError> {
    let mut key_bytes = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        KDF_ITERATIONS,
        salt,
        passphrase.as_bytes(),
        &mut key_bytes,
    );
    let cipher = ChaCha20Poly1305::new_from_slice(&key_bytes).map_err(|_| CipherError::Encrypt);
    key_bytes.zeroize();
    cipher
}
