// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::flows::LogicError;

/// Plaintext body of every non-200 response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Malformed wire envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("request body is not a JSON object")]
    NotJson,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is not valid base64")]
    InvalidBase64(&'static str),

    #[error("initial_vector must be {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },
}

/// Failures answered in plaintext, bypassing encryption
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("failed to decrypt request: {0}")]
    Crypto(#[from] CryptoError),

    #[error("flow endpoint is not configured")]
    NotConfigured,

    #[error("private key is misconfigured: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn status_code(&self) -> u16 {
        match self {
            TransportError::Envelope(_) => 400,
            TransportError::Crypto(e) if e.is_inbound() => 421,
            TransportError::Crypto(_) => 500,
            TransportError::NotConfigured
            | TransportError::Configuration(_)
            | TransportError::Internal(_) => 500,
        }
    }

    /// Message sent to the client; never carries key or payload detail
    pub fn public_message(&self) -> String {
        match self {
            TransportError::Envelope(e) => e.to_string(),
            TransportError::Crypto(e) if e.is_inbound() => "failed to decrypt request".to_string(),
            TransportError::NotConfigured => "flow endpoint not configured".to_string(),
            TransportError::Crypto(_)
            | TransportError::Configuration(_)
            | TransportError::Internal(_) => "internal server error".to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.public_message())
    }
}

/// Everything that can go wrong handling one endpoint request.
///
/// `Transport` errors are returned as plaintext HTTP statuses. `Protocol`
/// errors happen after decryption and are sent back encrypted with status 200.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] LogicError),
}

impl GatewayError {
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Transport(e) => e.status_code(),
            GatewayError::Protocol(_) => 200,
        }
    }
}

impl From<EnvelopeError> for GatewayError {
    fn from(e: EnvelopeError) -> Self {
        GatewayError::Transport(e.into())
    }
}

impl From<CryptoError> for GatewayError {
    fn from(e: CryptoError) -> Self {
        GatewayError::Transport(e.into())
    }
}
