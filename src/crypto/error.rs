// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error types for the hybrid RSA-OAEP / AES-GCM codec.
//!
//! ## Error Variants
//!
//! - **KeyUnwrap**: RSA-OAEP decryption of the per-request AES key failed
//! - **PayloadDecrypt**: AES-GCM decryption failed (auth tag mismatch, truncated input)
//! - **InvalidKey**: Key material has the wrong size or format
//! - **InvalidPayload**: Decrypted plaintext is not the expected JSON document
//! - **EncryptionFailed**: AES-GCM encryption of a response failed (internal fault)
//!
//! `KeyUnwrap` and `PayloadDecrypt` are kept apart for logging only. At the
//! protocol boundary every variant except `EncryptionFailed` becomes the same
//! "refresh your public key" response.

use std::fmt;

/// Error type for all cryptographic operations on the flow endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// RSA-OAEP unwrap of `encrypted_aes_key` failed
    ///
    /// This error occurs when:
    /// - The key was wrapped with a different (rotated) public key
    /// - The ciphertext is corrupted or has the wrong length
    /// - The OAEP padding block is malformed
    KeyUnwrap {
        /// Specific failure reason
        reason: String,
    },

    /// AES-GCM decryption of `encrypted_flow_data` failed
    ///
    /// This error occurs when:
    /// - Authentication tag verification fails (tampered data or wrong key)
    /// - Ciphertext is shorter than the 16-byte tag
    PayloadDecrypt {
        /// Specific failure reason
        reason: String,
    },

    /// Invalid cryptographic key
    InvalidKey {
        /// Type of key that failed (e.g., "session_aes_key", "flow_private_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// Decrypted plaintext failed validation
    InvalidPayload {
        /// Which part of the payload failed validation
        field: String,
        /// Specific failure reason
        reason: String,
    },

    /// Response encryption failed
    EncryptionFailed {
        /// Specific failure reason
        reason: String,
    },
}

impl CryptoError {
    /// Whether this failure happened while decrypting the inbound request.
    ///
    /// Inbound failures mean the platform holds a stale public key and must
    /// refresh it; outbound failures are internal faults.
    pub fn is_inbound(&self) -> bool {
        !matches!(self, CryptoError::EncryptionFailed { .. })
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::KeyUnwrap { reason } => {
                write!(f, "AES key unwrap failed: {}", reason)
            }
            CryptoError::PayloadDecrypt { reason } => {
                write!(f, "Payload decryption failed: {}", reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
            CryptoError::EncryptionFailed { reason } => {
                write!(f, "Response encryption failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for CryptoError {}
