// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flow Private Key Provisioning
//!
//! The endpoint's RSA private key is owned by an external settings store and
//! fetched on demand through [`KeyProvider`]. Parsing a 2048-bit PEM on every
//! request is wasteful, so [`KeyCache`] keeps the parsed key for a short TTL
//! and drops it as soon as the provider reports a different PEM. A caller that
//! suspects a rotation inside the TTL asks again with [`KeyCache::reload`].
//!
//! ## Security Considerations
//!
//! - The PEM is NEVER logged; only a truncated SHA-256 fingerprint is
//! - A missing key is reported as "not configured", never as a crypto error

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rsa::RsaPrivateKey;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::key_unwrap::{key_fingerprint, parse_private_key_pem};

/// Default environment variable holding an inline PEM
pub const PRIVATE_KEY_ENV: &str = "FLOW_PRIVATE_KEY";

/// Source of the endpoint's current RSA private key
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Return the current private key PEM, or `None` when no key is provisioned
    async fn get_private_key(&self) -> Result<Option<String>>;
}

/// Reads the PEM from an environment variable.
///
/// Escaped `\n` sequences are expanded, so single-line PEMs from `.env` files
/// work.
#[derive(Debug, Clone)]
pub struct EnvKeyProvider {
    var: String,
}

impl EnvKeyProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvKeyProvider {
    fn default() -> Self {
        Self::new(PRIVATE_KEY_ENV)
    }
}

#[async_trait]
impl KeyProvider for EnvKeyProvider {
    async fn get_private_key(&self) -> Result<Option<String>> {
        match env::var(&self.var) {
            Ok(value) => {
                let value = value.trim().replace("\\n", "\n");
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(anyhow!("{} is not valid unicode: {}", self.var, e)),
        }
    }
}

/// Reads the PEM from a file; a missing file means "not configured".
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KeyProvider for FileKeyProvider {
    async fn get_private_key(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("failed to read private key file {}", self.path.display())
            }),
        }
    }
}

/// Holds the PEM in memory, standing in for the settings store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyProvider {
    pem: Arc<RwLock<Option<String>>>,
}

impl InMemoryKeyProvider {
    pub fn new(pem: Option<String>) -> Self {
        Self {
            pem: Arc::new(RwLock::new(pem)),
        }
    }

    /// Replace the stored key (key rotation)
    pub async fn set_private_key(&self, pem: impl Into<String>) {
        *self.pem.write().await = Some(pem.into());
    }

    /// Remove the stored key
    pub async fn clear(&self) {
        *self.pem.write().await = None;
    }
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_private_key(&self) -> Result<Option<String>> {
        Ok(self.pem.read().await.clone())
    }
}

struct CachedKey {
    fingerprint: String,
    key: Arc<RsaPrivateKey>,
    fetched_at: Instant,
}

/// Process-wide cache of the parsed private key.
///
/// Within the TTL the cached key is served without consulting the provider.
/// After the TTL the provider is asked again; an unchanged PEM only refreshes
/// the timestamp, a changed PEM is parsed and replaces the entry, and an absent
/// PEM clears it.
pub struct KeyCache {
    provider: Arc<dyn KeyProvider>,
    ttl: Duration,
    entry: RwLock<Option<CachedKey>>,
}

impl KeyCache {
    pub fn new(provider: Arc<dyn KeyProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Whether a key is provisioned at all. Performs no parsing.
    pub async fn is_configured(&self) -> Result<bool> {
        Ok(self.provider.get_private_key().await?.is_some())
    }

    /// Return the current parsed key, or `None` when no key is provisioned.
    ///
    /// # Errors
    ///
    /// Fails when the provider fails or the provisioned PEM cannot be parsed.
    pub async fn current_key(&self) -> Result<Option<Arc<RsaPrivateKey>>> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(Some(cached.key.clone()));
                }
            }
        }

        self.reload().await
    }

    /// Ask the provider for the key now, ignoring the TTL.
    ///
    /// Returns the cached `Arc` untouched when the PEM has not changed, so
    /// callers can tell a rotation apart with [`Arc::ptr_eq`].
    pub async fn reload(&self) -> Result<Option<Arc<RsaPrivateKey>>> {
        let pem = match self.provider.get_private_key().await? {
            Some(pem) => pem,
            None => {
                if self.entry.write().await.take().is_some() {
                    warn!("🔑 Flow private key was removed; cache cleared");
                }
                return Ok(None);
            }
        };

        let fingerprint = key_fingerprint(&pem);
        let mut entry = self.entry.write().await;

        if let Some(cached) = entry.as_mut() {
            if cached.fingerprint == fingerprint {
                cached.fetched_at = Instant::now();
                debug!("🔑 Flow private key unchanged ({})", fingerprint);
                return Ok(Some(cached.key.clone()));
            }
        }

        let key = Arc::new(
            parse_private_key_pem(&pem)
                .map_err(|e| anyhow!("provisioned flow private key is unusable: {}", e))?,
        );
        info!("✅ Flow private key loaded ({})", fingerprint);

        *entry = Some(CachedKey {
            fingerprint,
            key: key.clone(),
            fetched_at: Instant::now(),
        });

        Ok(Some(key))
    }
}
