// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod crypto;
pub mod flows;
pub mod storage;
pub mod version;

// Re-export main types
pub use api::{create_app, start_server, AppState, GatewayError, TransportError};
pub use config::GatewayConfig;
pub use crypto::{CryptoError, KeyCache, KeyProvider};
pub use flows::{DecryptedAction, Dispatcher, FlowAction, HandlerRegistry, ScreenResponse};
pub use storage::{FlowSubmission, SubmissionSink, SubmissionStore};
