// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid Request/Response Codec
//!
//! Composes the RSA-OAEP unwrap and the AES-GCM transforms into the two
//! operations the flow endpoint needs:
//!
//! 1. [`decrypt_request`]: unwrap the AES key, decrypt the flow data with the
//!    request IV
//! 2. [`ResponseSession::encrypt_response`]: serialize a response and seal it
//!    with the same AES key under the flipped IV

use rsa::RsaPrivateKey;
use serde::{de::DeserializeOwned, Serialize};

use super::aes_gcm::{decrypt_payload, encrypt_payload, IV_SIZE};
use super::key_unwrap::{unwrap_key, SessionKey};
use super::CryptoError;

/// Decoded bytes of an inbound envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeBytes {
    pub encrypted_flow_data: Vec<u8>,
    pub encrypted_aes_key: Vec<u8>,
    pub initial_vector: [u8; IV_SIZE],
}

/// What is needed to answer a decrypted request
#[derive(Debug)]
pub struct ResponseSession {
    key: SessionKey,
    request_iv: [u8; IV_SIZE],
}

/// A successfully decrypted request
#[derive(Debug)]
pub struct DecryptedRequest {
    pub plaintext: Vec<u8>,
    pub session: ResponseSession,
}

impl ResponseSession {
    pub fn new(key: SessionKey, request_iv: [u8; IV_SIZE]) -> Self {
        Self { key, request_iv }
    }

    /// Serialize `body` to JSON and encrypt it under the flipped request IV.
    ///
    /// Returns the base64 string sent as the `text/plain` response body.
    pub fn encrypt_response<T: Serialize>(&self, body: &T) -> Result<String, CryptoError> {
        let json = serde_json::to_vec(body).map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("failed to serialize response: {}", e),
        })?;
        encrypt_payload(&json, self.key.as_bytes(), &self.request_iv)
    }
}

impl DecryptedRequest {
    /// Parse the decrypted plaintext as JSON.
    ///
    /// A payload that decrypts but is not the expected document is treated as
    /// a decryption failure.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, CryptoError> {
        serde_json::from_slice(&self.plaintext).map_err(|e| CryptoError::InvalidPayload {
            field: "encrypted_flow_data".to_string(),
            reason: format!("decrypted payload is not valid JSON: {}", e),
        })
    }
}

/// Decrypt an inbound envelope with the endpoint's private key.
///
/// No partial success: a failure at either stage invalidates the request.
pub fn decrypt_request(
    envelope: &EnvelopeBytes,
    private_key: &RsaPrivateKey,
) -> Result<DecryptedRequest, CryptoError> {
    let key = unwrap_key(&envelope.encrypted_aes_key, private_key)?;
    let plaintext = decrypt_payload(
        &envelope.encrypted_flow_data,
        key.as_bytes(),
        &envelope.initial_vector,
    )?;

    Ok(DecryptedRequest {
        plaintext,
        session: ResponseSession::new(key, envelope.initial_vector),
    })
}
