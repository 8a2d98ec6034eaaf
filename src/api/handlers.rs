// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::flows::FlowDefinition;
use crate::storage::FlowSubmission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Build details, features and accepted data-exchange versions
    pub build: serde_json::Value,
}

/// Readiness of the flow endpoint as reported to `GET /api/flows/endpoint`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    Ready,
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatusResponse {
    pub status: EndpointStatus,
    pub message: String,
}

impl EndpointStatusResponse {
    pub fn ready() -> Self {
        Self {
            status: EndpointStatus::Ready,
            message: "Flow endpoint is ready to receive encrypted requests".to_string(),
        }
    }

    pub fn not_configured() -> Self {
        Self {
            status: EndpointStatus::NotConfigured,
            message: "No private key configured for the flow endpoint".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionsResponse {
    pub submissions: Vec<FlowSubmission>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionsResponse {
    pub flows: Vec<FlowDefinition>,
    pub default_flow: Option<String>,
}
