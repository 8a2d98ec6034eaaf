// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid Encryption for the Flow Endpoint
//!
//! This module implements the cryptographic framing of the flow data-exchange
//! protocol:
//!
//! - **Key Unwrap**: RSA-OAEP (SHA-256, MGF1-SHA-256) decryption of the
//!   per-request AES-128 key
//! - **Payload**: AES-128-GCM with a 16-byte IV and a 16-byte tag appended to
//!   the ciphertext
//! - **IV Flip**: responses are sealed under the bitwise complement of the
//!   request IV
//! - **Private Key**: provider abstraction plus a TTL cache of the parsed key
//!
//! ## Security Considerations
//!
//! - Session keys are request-scoped and zeroized on drop
//! - The response IV is derived from the request IV only
//! - Private keys and session keys are never logged
//!
//! ## Protocol Flow
//!
//! 1. Platform generates a random AES-128 key and 16-byte IV
//! 2. Platform encrypts the request JSON with AES-GCM and wraps the AES key
//!    with the endpoint's RSA public key
//! 3. Endpoint unwraps the AES key with its private key
//! 4. Endpoint decrypts the request with the AES key and IV
//! 5. Endpoint encrypts its response with the same AES key and the flipped IV

pub mod aes_gcm;
pub mod codec;
pub mod error;
pub mod key_unwrap;
pub mod private_key;

pub use aes_gcm::{decrypt_payload, encrypt_payload, flip_iv, AES_KEY_SIZE, IV_SIZE, TAG_SIZE};
pub use codec::{decrypt_request, DecryptedRequest, EnvelopeBytes, ResponseSession};
pub use error::CryptoError;
pub use key_unwrap::{key_fingerprint, parse_private_key_pem, unwrap_key, SessionKey};
pub use private_key::{
    EnvKeyProvider, FileKeyProvider, InMemoryKeyProvider, KeyCache, KeyProvider, PRIVATE_KEY_ENV,
};
