// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gateway configuration from command-line flags and environment variables.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::{EnvKeyProvider, FileKeyProvider, KeyProvider};
use crate::flows::{
    booking_flow, BookingSettings, CalendarBackend, HandlerRegistry, InMemoryCalendar,
    MAX_BOOKING_DAYS,
};

/// Flow Gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "flow-gateway")]
#[command(version)]
#[command(about = "Encrypted data-exchange endpoint for WhatsApp Flows", long_about = None)]
pub struct GatewayConfig {
    /// Address to bind
    #[arg(long, env = "FLOW_GATEWAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "FLOW_GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// PEM file holding the flow private key; falls back to FLOW_PRIVATE_KEY
    #[arg(long, env = "FLOW_PRIVATE_KEY_FILE")]
    pub private_key_file: Option<PathBuf>,

    /// How long a parsed private key is reused before the provider is asked again
    #[arg(long, env = "FLOW_KEY_CACHE_TTL_SECS", default_value_t = 300)]
    pub key_cache_ttl_secs: u64,

    /// Submissions kept in memory
    #[arg(long, env = "FLOW_SUBMISSION_CAPACITY", default_value_t = 1000)]
    pub submission_capacity: usize,

    /// Flow used when the flow token does not name one
    #[arg(long, env = "FLOW_DEFAULT_FLOW", default_value = "booking")]
    pub default_flow: String,

    /// Days offered by the booking flow (1-90)
    #[arg(
        long,
        env = "FLOW_BOOKING_DAYS",
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_BOOKING_DAYS))
    )]
    pub booking_days: u32,
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow!("invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    pub fn key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.key_cache_ttl_secs)
    }

    /// File provider when a key file is configured, environment otherwise
    pub fn key_provider(&self) -> Arc<dyn KeyProvider> {
        match &self.private_key_file {
            Some(path) => Arc::new(FileKeyProvider::new(path.clone())),
            None => Arc::new(EnvKeyProvider::default()),
        }
    }

    pub fn booking_settings(&self) -> BookingSettings {
        BookingSettings {
            days_ahead: self.booking_days.clamp(1, MAX_BOOKING_DAYS),
            ..Default::default()
        }
    }

    /// Registry with every built-in flow, defaulting to `default_flow`
    pub fn build_registry(&self, calendar: Arc<dyn CalendarBackend>) -> Result<HandlerRegistry> {
        let mut registry = HandlerRegistry::new();
        registry.register(booking_flow(calendar, self.booking_settings()))?;
        registry.set_default_flow(&self.default_flow)?;
        Ok(registry)
    }

    /// Registry backed by an in-memory calendar
    pub fn default_registry(&self) -> Result<HandlerRegistry> {
        self.build_registry(Arc::new(InMemoryCalendar::default()))
    }
}
