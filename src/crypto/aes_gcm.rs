// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-GCM for Flow Payloads
//!
//! Implements the symmetric half of the flow endpoint's hybrid scheme.
//!
//! **Wire Format**:
//! ```text
//! [ciphertext (variable length) | tag (16 bytes)]
//! ```
//!
//! - Key: 16 bytes (AES-128), unwrapped from the request envelope
//! - IV: 16 bytes, carried as `initial_vector` in the envelope
//! - Tag: 16 bytes, appended to the ciphertext
//! - No Additional Authenticated Data (AAD)
//!
//! Responses are sealed under the bitwise complement of the request IV, so a
//! captured response can never be replayed as a request (and vice versa).

use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit},
    aes::Aes128,
    AesGcm,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};

use super::CryptoError;

/// AES-128-GCM with the 16-byte IV used by the flow protocol
type FlowCipher = AesGcm<Aes128, U16>;

/// Size of the `initial_vector` in bytes
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Size of the unwrapped AES key in bytes
pub const AES_KEY_SIZE: usize = 16;

/// Derive the response IV from the request IV.
///
/// Every bit is inverted, so the response IV always differs from the request
/// IV and never depends on anything the client sends besides the request IV.
pub fn flip_iv(iv: &[u8; IV_SIZE]) -> [u8; IV_SIZE] {
    let mut flipped = [0u8; IV_SIZE];
    for (out, byte) in flipped.iter_mut().zip(iv.iter()) {
        *out = !byte;
    }
    flipped
}

fn cipher_for(key: &[u8]) -> Result<FlowCipher, CryptoError> {
    if key.len() != AES_KEY_SIZE {
        return Err(CryptoError::InvalidKey {
            key_type: "session_aes_key".to_string(),
            reason: format!("expected {} bytes, got {}", AES_KEY_SIZE, key.len()),
        });
    }

    FlowCipher::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "session_aes_key".to_string(),
        reason: format!("failed to create AES-GCM cipher: {}", e),
    })
}

/// Decrypt `encrypted_flow_data` with the session key and the request IV.
///
/// The 16-byte tag is split off the end of `ciphertext_and_tag` before the
/// cipher runs.
///
/// # Errors
///
/// - `InvalidKey` if the key is not 16 bytes
/// - `PayloadDecrypt` if the input is shorter than the tag or the tag does
///   not verify (wrong key, wrong IV, tampered data)
pub fn decrypt_payload(
    ciphertext_and_tag: &[u8],
    key: &[u8],
    iv: &[u8; IV_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext_and_tag.len() < TAG_SIZE {
        return Err(CryptoError::PayloadDecrypt {
            reason: format!(
                "encrypted data too short: expected at least {} bytes for tag, got {}",
                TAG_SIZE,
                ciphertext_and_tag.len()
            ),
        });
    }

    let cipher = cipher_for(key)?;

    let (ciphertext, tag) = ciphertext_and_tag.split_at(ciphertext_and_tag.len() - TAG_SIZE);
    let mut buffer = ciphertext.to_vec();

    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            b"",
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|e| CryptoError::PayloadDecrypt {
            reason: format!(
                "authentication error - wrong key, wrong IV or corrupted data: {}",
                e
            ),
        })?;

    Ok(buffer)
}

/// Encrypt a response payload under the flipped request IV.
///
/// Returns base64(ciphertext || tag), ready to be sent as the response body.
///
/// `request_iv` is the IV the request was decrypted with; the flip happens
/// here so callers cannot accidentally reuse the request IV.
pub fn encrypt_payload(
    plaintext: &[u8],
    key: &[u8],
    request_iv: &[u8; IV_SIZE],
) -> Result<String, CryptoError> {
    let cipher = cipher_for(key).map_err(|e| CryptoError::EncryptionFailed {
        reason: e.to_string(),
    })?;
    let response_iv = flip_iv(request_iv);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&response_iv), b"", &mut buffer)
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("aes-gcm error: {}", e),
        })?;
    buffer.extend_from_slice(tag.as_slice());

    Ok(B64.encode(buffer))
}
