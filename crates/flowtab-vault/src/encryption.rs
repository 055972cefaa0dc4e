// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential encryption service.
//!
//! Secrets are stored as `hex(nonce):hex(tag):hex(ciphertext)`, three
//! lowercase hex fields separated by colons. The nonce is 12 bytes and the
//! tag 16 bytes; the ciphertext has the same length as the UTF-8 plaintext.

use flowtab_core::FlowtabError;
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN, NONCE_LEN, TAG_LEN};

/// AES-256-GCM encryption service for stored credentials.
///
/// Construct one per process from the configured key and share it via
/// `Arc`. The key never changes for the life of the value.
pub struct EncryptionService {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl EncryptionService {
    /// Build from raw key bytes.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(*key),
        }
    }

    /// Build from a 64-character hex key.
    ///
    /// Fails with [`FlowtabError::Config`] if the string is not hex or does
    /// not decode to exactly 32 bytes.
    pub fn from_hex(key_hex: &str) -> Result<Self, FlowtabError> {
        let bytes = Zeroizing::new(hex::decode(key_hex.trim()).map_err(|_| {
            FlowtabError::Config("encryption key must be hex encoded".to_string())
        })?);
        let key: Zeroizing<[u8; KEY_LEN]> =
            Zeroizing::new(bytes.as_slice().try_into().map_err(|_| {
                FlowtabError::Config(format!(
                    "encryption key must be {KEY_LEN} bytes ({} hex chars), got {} bytes",
                    KEY_LEN * 2,
                    bytes.len()
                ))
            })?);
        Ok(Self::new(&key))
    }

    /// Encrypt a UTF-8 secret into its stored form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, FlowtabError> {
        let (sealed, nonce) = crypto::seal(&self.key, plaintext.as_bytes())?;
        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(body)
        ))
    }

    /// Decrypt a value produced by [`EncryptionService::encrypt`].
    ///
    /// Structural problems are [`FlowtabError::SecretFormat`]; a failed
    /// authentication check or non-UTF-8 plaintext is
    /// [`FlowtabError::Decryption`].
    pub fn decrypt(&self, encoded: &str) -> Result<String, FlowtabError> {
        let parts: Vec<&str> = encoded.split(':').collect();
        let [nonce_hex, tag_hex, body_hex] = parts.as_slice() else {
            return Err(FlowtabError::SecretFormat(format!(
                "expected 3 colon-separated parts, got {}",
                parts.len()
            )));
        };

        let nonce = decode_field("nonce", nonce_hex)?;
        let tag = decode_field("tag", tag_hex)?;
        let mut sealed = decode_field("ciphertext", body_hex)?;

        let nonce: [u8; NONCE_LEN] = nonce.as_slice().try_into().map_err(|_| {
            FlowtabError::SecretFormat(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            ))
        })?;
        if tag.len() != TAG_LEN {
            return Err(FlowtabError::SecretFormat(format!(
                "tag must be {TAG_LEN} bytes, got {}",
                tag.len()
            )));
        }

        sealed.extend_from_slice(&tag);
        let plaintext = crypto::open(&self.key, &nonce, &sealed)?;
        String::from_utf8(plaintext).map_err(|e| FlowtabError::Decryption {
            message: "plaintext is not valid UTF-8".to_string(),
            source: Some(Box::new(e)),
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, FlowtabError> {
    hex::decode(value)
        .map_err(|e| FlowtabError::SecretFormat(format!("{name} is not valid hex: {e}")))
}

/// Generate a fresh random key as 64 hex characters.
pub fn generate_key_hex() -> Result<String, FlowtabError> {
    let key = Zeroizing::new(crypto::generate_random_key()?);
    Ok(hex::encode(*key))
}

/// Mask a secret value for display: show first 4 and last 4 characters.
///
/// Values shorter than 10 characters are fully masked.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
