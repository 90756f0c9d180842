//! Password-derived encryption of paste content.
//!
//! Keys come from PBKDF2-HMAC-SHA256 and content is sealed with AES-256-GCM.
//! A ciphertext token is the base64url encoding of
//!
//! ```text
//! 0x01 || nonce[12] || ciphertext+tag             (fixed salt)
//! 0x02 || salt[16] || nonce[12] || ciphertext+tag (per-paste salt)
//! ```
//!
//! Passwords are additionally stored as argon2 PHC strings so a wrong guess
//! can be rejected before running the key derivation.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

/// Salt shared by every fixed-salt token.
///
/// Identical passwords produce identical keys under this salt, which is why
/// [`SaltMode::PerPaste`] is the default.
const FIXED_SALT: &[u8] = b"sealbin.fixed-salt.v1";

pub const KDF_ITERATIONS: u32 = 100_000;
pub const KEY_LEN: usize = 32;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

const VERSION_FIXED_SALT: u8 = 0x01;
const VERSION_PER_PASTE_SALT: u8 = 0x02;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Authenticated decryption did not succeed.
///
/// Wrong passwords and damaged tokens are deliberately not distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("decryption failed")]
pub struct DecryptionFailed;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaltMode {
    Fixed,
    #[default]
    PerPaste,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    #[cfg(test)]
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derive the key for `password` under the fixed salt.
pub fn derive_key(password: &str) -> DerivedKey {
    derive_key_with_salt(password, FIXED_SALT)
}

pub fn derive_key_with_salt(password: &str, salt: &[u8]) -> DerivedKey {
    DerivedKey(pbkdf2::pbkdf2_hmac_array::<Sha256, KEY_LEN>(
        password.as_bytes(),
        salt,
        KDF_ITERATIONS,
    ))
}

/// Encrypt `plaintext` into a self-contained token.
pub fn encrypt(plaintext: &str, password: &str, mode: SaltMode) -> Result<String, CryptoError> {
    let mut token = Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + plaintext.len() + 16);

    let key = match mode {
        SaltMode::Fixed => {
            token.push(VERSION_FIXED_SALT);
            derive_key(password)
        }
        SaltMode::PerPaste => {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            token.push(VERSION_PER_PASTE_SALT);
            token.extend_from_slice(&salt);
            derive_key_with_salt(password, &salt)
        }
    };

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| CryptoError::Encrypt)?;

    token.extend_from_slice(&nonce);
    token.extend_from_slice(&ciphertext);

    Ok(URL_SAFE.encode(token))
}

/// Decrypt a token produced by [`encrypt`] in either salt mode.
pub fn decrypt(token: &str, password: &str) -> Result<String, DecryptionFailed> {
    let raw = URL_SAFE.decode(token).map_err(|_| DecryptionFailed)?;
    let (&version, rest) = raw.split_first().ok_or(DecryptionFailed)?;

    let (key, rest) = match version {
        VERSION_FIXED_SALT => (derive_key(password), rest),
        VERSION_PER_PASTE_SALT => {
            if rest.len() < SALT_LEN {
                return Err(DecryptionFailed);
            }
            let (salt, rest) = rest.split_at(SALT_LEN);
            (derive_key_with_salt(password, salt), rest)
        }
        _ => return Err(DecryptionFailed),
    };

    if rest.len() < NONCE_LEN {
        return Err(DecryptionFailed);
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| DecryptionFailed)
}

/// Hash a paste password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(CryptoError::Hash)?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
