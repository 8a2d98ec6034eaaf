// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flow Submission Storage Module
//!
//! Records every decrypted action the gateway handles. Writes are best-effort:
//! the endpoint spawns them and only logs failures.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::flows::{DecryptedAction, FormData};

/// Entries returned when a listing does not ask for a limit
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Upper bound on entries returned by one listing
pub const MAX_LIST_LIMIT: usize = 200;

/// Entries kept by [`SubmissionStore::default`]
pub const DEFAULT_CAPACITY: usize = 1000;

/// One decrypted action as received by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSubmission {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub flow_type: Option<String>,
    pub flow_token: Option<String>,
    pub action: String,
    pub screen: Option<String>,
    pub version: String,
    pub data: FormData,
}

impl FlowSubmission {
    pub fn from_action(flow_type: Option<String>, action: &DecryptedAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            flow_type,
            flow_token: action.flow_token.clone(),
            action: action.action.to_string(),
            screen: action.screen.clone(),
            version: action.version.clone(),
            data: action.data.clone().unwrap_or_default(),
        }
    }
}

/// Destination for recorded submissions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn record(&self, submission: FlowSubmission) -> Result<()>;
}

/// Listing filters; all present filters must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionQuery {
    pub flow_type: Option<String>,
    pub flow_token: Option<String>,
    pub action: Option<String>,
    /// Kept as text so a bad value falls back to the default instead of
    /// failing the request
    pub limit: Option<String>,
}

impl SubmissionQuery {
    /// Requested limit clamped to `1..=MAX_LIST_LIMIT`.
    ///
    /// Non-numeric input means the default, fractions are truncated and
    /// anything below one becomes one.
    pub fn effective_limit(&self) -> usize {
        let requested = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite());
        match requested {
            None => DEFAULT_LIST_LIMIT,
            Some(n) if n < 1.0 => 1,
            Some(n) => (n.trunc() as usize).min(MAX_LIST_LIMIT),
        }
    }

    fn matches(&self, submission: &FlowSubmission) -> bool {
        fn eq(filter: &Option<String>, value: Option<&str>) -> bool {
            filter.as_deref().map_or(true, |f| value == Some(f))
        }

        eq(&self.flow_type, submission.flow_type.as_deref())
            && eq(&self.flow_token, submission.flow_token.as_deref())
            && eq(&self.action, Some(submission.action.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionStoreStats {
    pub total_recorded: u64,
    pub evicted: u64,
}

/// Bounded in-memory submission log; the oldest entry is evicted when full
#[derive(Clone)]
pub struct SubmissionStore {
    entries: Arc<RwLock<VecDeque<FlowSubmission>>>,
    stats: Arc<RwLock<SubmissionStoreStats>>,
    capacity: usize,
}

impl SubmissionStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            stats: Arc::new(RwLock::new(SubmissionStoreStats::default())),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first
    pub async fn list(&self, query: &SubmissionQuery) -> Vec<FlowSubmission> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .filter(|s| query.matches(s))
            .take(query.effective_limit())
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        info!("🧹 Clearing all flow submissions");
        self.entries.write().await.clear();
    }

    pub async fn stats(&self) -> SubmissionStoreStats {
        self.stats.read().await.clone()
    }
}

impl Default for SubmissionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl SubmissionSink for SubmissionStore {
    async fn record(&self, submission: FlowSubmission) -> Result<()> {
        debug!(
            "📥 Recording {} submission {} (screen {:?})",
            submission.action, submission.id, submission.screen
        );

        let mut entries = self.entries.write().await;
        let mut evicted = 0;
        while entries.len() >= self.capacity {
            entries.pop_front();
            evicted += 1;
        }
        entries.push_back(submission);
        drop(entries);

        let mut stats = self.stats.write().await;
        stats.total_recorded += 1;
        stats.evicted += evicted;
        Ok(())
    }
}
