// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::errors::TransportError;
use super::flow_endpoint::FlowEndpoint;
use super::handlers::{
    DefinitionsResponse, EndpointStatusResponse, HealthResponse, SubmissionsResponse,
};
use crate::crypto::{InMemoryKeyProvider, KeyCache, KeyProvider};
use crate::flows::{Dispatcher, HandlerRegistry};
use crate::storage::{SubmissionQuery, SubmissionSink, SubmissionStore};

/// Shared state behind every route
pub struct AppState {
    pub endpoint: FlowEndpoint,
    pub submissions: SubmissionStore,
}

impl AppState {
    /// State whose submissions go to `submissions`
    pub fn new(key_cache: Arc<KeyCache>, dispatcher: Dispatcher, submissions: SubmissionStore) -> Self {
        let sink: Arc<dyn SubmissionSink> = Arc::new(submissions.clone());
        Self {
            endpoint: FlowEndpoint::new(key_cache, dispatcher, sink),
            submissions,
        }
    }

    /// State backed by an in-memory key provider and an empty registry
    pub fn new_for_test() -> Self {
        let provider: Arc<dyn KeyProvider> = Arc::new(InMemoryKeyProvider::new(None));
        Self::new(
            Arc::new(KeyCache::new(provider, Duration::from_secs(60))),
            Dispatcher::new(Arc::new(HandlerRegistry::new())),
            SubmissionStore::default(),
        )
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/flows/endpoint",
            get(endpoint_status_handler).post(flow_endpoint_handler),
        )
        .route("/api/flows/submissions", get(submissions_handler))
        .route("/api/flows/definitions", get(definitions_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c or SIGTERM
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 Flow gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Flow gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("🛑 Shutdown signal received");
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::version::VERSION_NUMBER.to_string(),
        build: crate::version::get_version_info(),
    })
}

async fn endpoint_status_handler(State(state): State<Arc<AppState>>) -> Json<EndpointStatusResponse> {
    match state.endpoint.key_cache().is_configured().await {
        Ok(true) => Json(EndpointStatusResponse::ready()),
        Ok(false) => Json(EndpointStatusResponse::not_configured()),
        Err(e) => {
            warn!("[flow-endpoint] ⚠️  Key provider failed during status check: {}", e);
            Json(EndpointStatusResponse::not_configured())
        }
    }
}

async fn flow_endpoint_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.endpoint.handle(&body).await {
        Ok(encrypted) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            encrypted,
        )
            .into_response(),
        Err(e) => TransportErrorResponse(e).into_response(),
    }
}

async fn submissions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubmissionQuery>,
) -> Response {
    let submissions = state.submissions.list(&query).await;
    let count = submissions.len();
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(SubmissionsResponse { submissions, count }),
    )
        .into_response()
}

async fn definitions_handler(State(state): State<Arc<AppState>>) -> Json<DefinitionsResponse> {
    let registry = state.endpoint.dispatcher().registry();
    Json(DefinitionsResponse {
        flows: registry.definitions().into_iter().cloned().collect(),
        default_flow: registry.default_flow().map(str::to_string),
    })
}

// Error response wrapper
struct TransportErrorResponse(TransportError);

impl IntoResponse for TransportErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_response())).into_response()
    }
}
