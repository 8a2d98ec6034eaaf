// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use flow_gateway::{
    api::{start_server, AppState},
    config::GatewayConfig,
    crypto::KeyCache,
    flows::Dispatcher,
    storage::SubmissionStore,
    version,
};
use std::{env, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = GatewayConfig::parse();

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);

    let addr = config.socket_addr()?;
    let key_cache = Arc::new(KeyCache::new(config.key_provider(), config.key_cache_ttl()));

    match key_cache.current_key().await {
        Ok(Some(_)) => info!("🔐 Flow private key loaded - endpoint ready"),
        Ok(None) => {
            warn!("⚠️  No flow private key configured");
            warn!("   Set FLOW_PRIVATE_KEY or --private-key-file to enable the endpoint");
        }
        Err(e) => warn!("⚠️  Flow private key is unusable: {}", e),
    }

    let registry = config.default_registry()?;
    info!(
        "📋 {} flow(s) registered, default '{}'",
        registry.definitions().len(),
        config.default_flow
    );

    let state = Arc::new(AppState::new(
        key_cache,
        Dispatcher::new(Arc::new(registry)),
        SubmissionStore::new(config.submission_capacity),
    ));

    start_server(addr, state).await
}
