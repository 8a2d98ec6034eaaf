// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decrypted request and response payloads exchanged with the platform.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Form field data carried by requests and responses
pub type FormData = Map<String, Value>;

/// Action requested by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlowAction {
    /// Health check from the platform
    Ping,
    /// Flow opened; render the entry screen
    Init,
    /// User submitted a screen
    DataExchange,
    /// User navigated back to a screen with `refresh_on_back`
    Back,
    /// Anything else; rejected by the dispatcher
    Other(String),
}

impl FlowAction {
    pub fn as_str(&self) -> &str {
        match self {
            FlowAction::Ping => "ping",
            FlowAction::Init => "INIT",
            FlowAction::DataExchange => "data_exchange",
            FlowAction::Back => "BACK",
            FlowAction::Other(other) => other,
        }
    }
}

impl From<String> for FlowAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ping" => FlowAction::Ping,
            "INIT" => FlowAction::Init,
            "data_exchange" => FlowAction::DataExchange,
            "BACK" => FlowAction::Back,
            _ => FlowAction::Other(value),
        }
    }
}

impl From<FlowAction> for String {
    fn from(action: FlowAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for FlowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decrypted body of a data-exchange request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptedAction {
    #[serde(default)]
    pub version: String,
    pub action: FlowAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FormData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_token: Option<String>,
}

/// Response payload, encrypted before it leaves the process.
///
/// Serializes as `{ "screen": ..., "data": {...} }` for a screen transition or
/// `{ "data": {...}, "completion": true }` for a terminal reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    pub data: FormData,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub completion: bool,
}

impl ScreenResponse {
    /// Render `screen` with `data`
    pub fn screen(screen: impl Into<String>, data: FormData) -> Self {
        Self {
            screen: Some(screen.into()),
            data,
            completion: false,
        }
    }

    /// Terminal completion payload
    pub fn complete(data: FormData) -> Self {
        Self {
            screen: None,
            data,
            completion: true,
        }
    }

    /// `{ "data": { "status": "active" } }`
    pub fn ping() -> Self {
        Self {
            screen: None,
            data: object(json!({ "status": "active" })),
            completion: false,
        }
    }

    /// `{ "data": { "error_msg": message } }`
    pub fn error(message: impl Into<String>) -> Self {
        let mut data = FormData::new();
        data.insert("error_msg".to_string(), Value::String(message.into()));
        Self {
            screen: None,
            data,
            completion: false,
        }
    }
}

/// Convert a `json!` object literal into [`FormData`]; non-objects become empty.
pub fn object(value: Value) -> FormData {
    match value {
        Value::Object(map) => map,
        _ => FormData::new(),
    }
}
