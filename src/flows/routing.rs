// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Routing model: the declared screen graph of one flow template.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Adjacency list `screen -> screens reachable in one step`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingModel {
    edges: BTreeMap<String, Vec<String>>,
}

impl RoutingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style edge declaration; `targets` may be empty for terminal screens
    pub fn with_screen<I, S>(mut self, screen: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges
            .insert(screen.into(), targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn contains(&self, screen: &str) -> bool {
        self.edges.contains_key(screen)
    }

    pub fn screens(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn targets(&self, screen: &str) -> &[String] {
        self.edges.get(screen).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `from -> to` is a declared edge
    pub fn is_edge(&self, from: &str, to: &str) -> bool {
        self.targets(from).iter().any(|t| t == to)
    }

    /// Screens with no outgoing edges
    pub fn is_terminal(&self, screen: &str) -> bool {
        self.contains(screen) && self.targets(screen).is_empty()
    }

    /// All screens reachable from `entry`, `entry` included
    pub fn reachable_from(&self, entry: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        if !self.contains(entry) {
            return seen;
        }

        let mut queue = VecDeque::from([entry.to_string()]);
        seen.insert(entry.to_string());
        while let Some(screen) = queue.pop_front() {
            for next in self.targets(&screen) {
                if seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        seen
    }

    /// Check the model is self-consistent for the given entry screen.
    pub fn validate(&self, entry: &str) -> Result<()> {
        if !self.contains(entry) {
            return Err(anyhow!(
                "entry screen '{}' is not declared in the routing model",
                entry
            ));
        }

        for (screen, targets) in &self.edges {
            if let Some(missing) = targets.iter().find(|t| !self.contains(t)) {
                return Err(anyhow!(
                    "screen '{}' routes to undeclared screen '{}'",
                    screen,
                    missing
                ));
            }
        }

        Ok(())
    }
}
