// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flow Endpoint Protocol Handler
//!
//! One request runs through these stages, each with its own failure status:
//!
//! 1. Parse and validate the envelope (400)
//! 2. Load the private key (500 when not configured or unparseable)
//! 3. Unwrap the AES key and decrypt the action (421)
//! 4. Dispatch: `ping` is answered directly, everything else goes to the
//!    [`Dispatcher`]; logic errors become an encrypted `error_msg` payload
//! 5. Encrypt the response under the flipped IV (200, base64 text)

use anyhow::anyhow;
use rsa::RsaPrivateKey;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::envelope::EncryptedEnvelope;
use super::errors::{GatewayError, TransportError};
use crate::crypto::{decrypt_request, KeyCache};
use crate::flows::{DecryptedAction, Dispatcher, FlowAction, LogicError, ScreenResponse};
use crate::storage::{FlowSubmission, SubmissionSink};

/// Message shown to the user when a screen handler fails unexpectedly
pub const HANDLER_FAILURE_MESSAGE: &str = "Something went wrong, please try again";

#[derive(Clone)]
pub struct FlowEndpoint {
    key_cache: Arc<KeyCache>,
    dispatcher: Dispatcher,
    sink: Arc<dyn SubmissionSink>,
}

impl FlowEndpoint {
    pub fn new(
        key_cache: Arc<KeyCache>,
        dispatcher: Dispatcher,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        Self {
            key_cache,
            dispatcher,
            sink,
        }
    }

    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.key_cache
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one raw request body, returning the base64 response body.
    pub async fn handle(&self, body: &[u8]) -> Result<String, TransportError> {
        let envelope = EncryptedEnvelope::from_slice(body)?.decode()?;
        debug!(
            "[flow-endpoint] envelope ok: {} bytes flow data, {} bytes wrapped key",
            envelope.encrypted_flow_data.len(),
            envelope.encrypted_aes_key.len()
        );

        let private_key = match self.key_cache.current_key().await {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!("[flow-endpoint] ⚠️  No private key configured");
                return Err(TransportError::NotConfigured);
            }
            Err(e) => {
                error!("[flow-endpoint] ❌ Private key unavailable: {}", e);
                return Err(TransportError::Configuration(e.to_string()));
            }
        };

        let request = match decrypt_request(&envelope, &private_key) {
            Ok(request) => request,
            Err(e) if e.is_inbound() => match self.rotated_key(&private_key).await {
                Some(rotated) => decrypt_request(&envelope, &rotated).map_err(|e| {
                    warn!("[flow-endpoint] 🔒 Decryption failed with rotated key: {}", e);
                    e
                })?,
                None => {
                    warn!("[flow-endpoint] 🔒 Decryption failed: {}", e);
                    return Err(e.into());
                }
            },
            Err(e) => return Err(e.into()),
        };
        let action: DecryptedAction = request.parse_json().map_err(|e| {
            warn!("[flow-endpoint] 🔒 Decrypted payload rejected: {}", e);
            e
        })?;

        info!(
            "[flow-endpoint] 📨 action={} screen={}",
            action.action,
            action.screen.as_deref().unwrap_or("-")
        );
        self.record(&action);

        let response = match self.respond(&action).await {
            Ok(response) => response,
            Err(GatewayError::Protocol(e)) => {
                warn!("[flow-endpoint] ⚠️  {} failed: {}", action.action, e);
                ScreenResponse::error(user_message(&e))
            }
            Err(GatewayError::Transport(e)) => return Err(e),
        };

        request.session.encrypt_response(&response).map_err(|e| {
            error!("[flow-endpoint] ❌ Response encryption failed: {}", e);
            TransportError::from(e)
        })
    }

    /// Key the provider holds now, if it differs from `stale`
    async fn rotated_key(&self, stale: &Arc<RsaPrivateKey>) -> Option<Arc<RsaPrivateKey>> {
        match self.key_cache.reload().await {
            Ok(Some(current)) if !Arc::ptr_eq(&current, stale) => {
                info!("[flow-endpoint] 🔑 Private key rotated, retrying decryption");
                Some(current)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("[flow-endpoint] ⚠️  Key reload failed: {}", e);
                None
            }
        }
    }

    async fn respond(&self, action: &DecryptedAction) -> Result<ScreenResponse, GatewayError> {
        if action.action == FlowAction::Ping {
            return Ok(ScreenResponse::ping());
        }
        // A panicking handler must still get an encrypted error reply
        let dispatcher = self.dispatcher.clone();
        let action = action.clone();
        match tokio::spawn(async move { dispatcher.dispatch(&action).await }).await {
            Ok(result) => Ok(result?),
            Err(e) => {
                error!("[flow-endpoint] ❌ Screen handler aborted: {}", e);
                Err(LogicError::Handler(anyhow!("screen handler aborted: {}", e)).into())
            }
        }
    }

    /// Hand the action to the sink without waiting for it
    fn record(&self, action: &DecryptedAction) {
        let flow_type = self
            .dispatcher
            .registry()
            .resolve(action.flow_token.as_deref())
            .map(|flow| flow.definition.flow_type.clone());
        let submission = FlowSubmission::from_action(flow_type, action);
        let sink = self.sink.clone();

        tokio::spawn(async move {
            if let Err(e) = sink.record(submission).await {
                warn!("[flow-endpoint] ⚠️  Failed to record submission: {}", e);
            }
        });
    }
}

fn user_message(error: &LogicError) -> String {
    match error {
        LogicError::Handler(_) => HANDLER_FAILURE_MESSAGE.to_string(),
        other => other.to_string(),
    }
}
