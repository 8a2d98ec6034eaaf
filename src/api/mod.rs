// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod envelope;
pub mod errors;
pub mod flow_endpoint;
pub mod handlers;
pub mod http_server;

pub use envelope::EncryptedEnvelope;
pub use errors::{EnvelopeError, ErrorResponse, GatewayError, TransportError};
pub use flow_endpoint::{FlowEndpoint, HANDLER_FAILURE_MESSAGE};
pub use handlers::{
    DefinitionsResponse, EndpointStatus, EndpointStatusResponse, HealthResponse,
    SubmissionsResponse,
};
pub use http_server::{create_app, start_server, AppState};
