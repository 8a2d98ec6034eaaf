// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire envelope posted by the platform to the flow endpoint.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use serde::{Deserialize, Serialize};

use super::errors::EnvelopeError;
use crate::crypto::{EnvelopeBytes, IV_SIZE};

/// `{ encrypted_flow_data, encrypted_aes_key, initial_vector }`, all base64.
///
/// Fields are optional here so that a missing field is reported as such
/// instead of as a generic deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(default)]
    pub encrypted_flow_data: Option<String>,
    #[serde(default)]
    pub encrypted_aes_key: Option<String>,
    #[serde(default)]
    pub initial_vector: Option<String>,
}

impl EncryptedEnvelope {
    pub fn from_slice(body: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(body).map_err(|_| EnvelopeError::NotJson)
    }

    /// Validate and base64-decode all three fields.
    pub fn decode(&self) -> Result<EnvelopeBytes, EnvelopeError> {
        let encrypted_flow_data = decode_field("encrypted_flow_data", &self.encrypted_flow_data)?;
        let encrypted_aes_key = decode_field("encrypted_aes_key", &self.encrypted_aes_key)?;
        let iv = decode_field("initial_vector", &self.initial_vector)?;

        let initial_vector: [u8; IV_SIZE] =
            iv.as_slice()
                .try_into()
                .map_err(|_| EnvelopeError::InvalidIvLength {
                    expected: IV_SIZE,
                    actual: iv.len(),
                })?;

        Ok(EnvelopeBytes {
            encrypted_flow_data,
            encrypted_aes_key,
            initial_vector,
        })
    }
}

fn decode_field(name: &'static str, value: &Option<String>) -> Result<Vec<u8>, EnvelopeError> {
    let raw = value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(EnvelopeError::MissingField(name))?;

    let bytes = B64
        .decode(raw)
        .map_err(|_| EnvelopeError::InvalidBase64(name))?;
    if bytes.is_empty() {
        return Err(EnvelopeError::MissingField(name));
    }
    Ok(bytes)
}
