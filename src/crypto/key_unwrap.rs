// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RSA-OAEP Key Unwrap
//!
//! The platform wraps a fresh AES-128 key per request with the endpoint's RSA
//! public key using OAEP padding (SHA-256 hash, MGF1 with SHA-256). This module
//! parses the private key PEM and recovers that AES key.
//!
//! ## Security Considerations
//!
//! - The unwrapped key lives in a [`SessionKey`], which is zeroized on drop
//! - Neither the private key nor the session key is ever logged

use std::fmt;

use rsa::{pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, Oaep, RsaPrivateKey};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::aes_gcm::AES_KEY_SIZE;
use super::CryptoError;

/// AES key recovered from `encrypted_aes_key`.
///
/// Exists for the lifetime of one request only.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; AES_KEY_SIZE]);

impl SessionKey {
    /// Wrap raw key bytes, rejecting anything that is not an AES-128 key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != AES_KEY_SIZE {
            return Err(CryptoError::InvalidKey {
                key_type: "session_aes_key".to_string(),
                reason: format!(
                    "unwrapped key must be {} bytes, got {}",
                    AES_KEY_SIZE,
                    bytes.len()
                ),
            });
        }
        let mut key = [0u8; AES_KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Parse an RSA private key from PEM.
///
/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`).
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidKey {
            key_type: "flow_private_key".to_string(),
            reason: format!("not a PKCS#8 or PKCS#1 RSA private key: {}", e),
        })
}

/// Short, non-reversible identifier for a PEM, safe to log.
pub fn key_fingerprint(pem: &str) -> String {
    let digest = Sha256::digest(pem.trim().as_bytes());
    hex::encode(&digest[..8])
}

/// Unwrap the per-request AES key with RSA-OAEP (SHA-256 / MGF1-SHA-256).
///
/// # Errors
///
/// - `KeyUnwrap` if the ciphertext does not decrypt under `private_key`
///   (rotated key, corrupted payload, malformed OAEP block)
/// - `InvalidKey` if the recovered key is not exactly 16 bytes
pub fn unwrap_key(
    encrypted_aes_key: &[u8],
    private_key: &RsaPrivateKey,
) -> Result<SessionKey, CryptoError> {
    let mut raw = private_key
        .decrypt(Oaep::new::<Sha256>(), encrypted_aes_key)
        .map_err(|e| CryptoError::KeyUnwrap {
            reason: format!("RSA-OAEP decryption failed: {}", e),
        })?;

    let key = SessionKey::from_slice(&raw);
    raw.zeroize();
    key
}
