// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Screen handler contract and the registry keyed by (flow type, screen id).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::action::FormData;
use super::routing::RoutingModel;

/// Separator between the flow type and the opaque part of a flow token
pub const FLOW_TOKEN_SEPARATOR: char = ':';

/// Input handed to a screen handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenContext {
    pub flow_type: String,
    pub screen: String,
    pub flow_token: Option<String>,
    pub data: FormData,
}

impl ScreenContext {
    /// Trimmed, non-empty string field from the form data
    pub fn field(&self, name: &str) -> Option<&str> {
        self.data
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Like [`ScreenContext::field`], failing with a validation error when absent
    pub fn required(&self, name: &str, message: &str) -> Result<&str, ScreenError> {
        self.field(name)
            .ok_or_else(|| ScreenError::Validation(message.to_string()))
    }
}

/// Outcome of a forward submission
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Move to `screen`, which must be an edge of the submitted screen
    Next { screen: String, data: FormData },
    /// Close the flow with a terminal payload
    Complete { data: FormData },
}

/// Failures a screen handler may report
#[derive(Debug, Error)]
pub enum ScreenError {
    /// User input was rejected; the same screen is shown again with `message`
    #[error("{0}")]
    Validation(String),

    /// Anything else (downstream outage, bug); surfaced as an error payload
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Business logic behind one screen.
///
/// `render` produces the screen's data for INIT, BACK and validation
/// re-renders and must not have side effects. `submit` is the forward path
/// and is the only place side effects (bookings, writes) may happen.
#[async_trait]
pub trait ScreenHandler: Send + Sync {
    async fn render(&self, ctx: &ScreenContext) -> Result<FormData, ScreenError>;

    async fn submit(&self, ctx: &ScreenContext) -> Result<Transition, ScreenError>;
}

/// Static description of a flow template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub flow_type: String,
    pub name: String,
    pub description: String,
    pub entry_screen: String,
    pub routing_model: RoutingModel,
}

/// A flow definition together with its handlers
pub struct RegisteredFlow {
    pub definition: FlowDefinition,
    handlers: HashMap<String, Arc<dyn ScreenHandler>>,
}

impl RegisteredFlow {
    pub fn handler(&self, screen: &str) -> Option<&Arc<dyn ScreenHandler>> {
        self.handlers.get(screen)
    }

    /// Declared and reachable from the entry screen
    pub fn is_reachable(&self, screen: &str) -> bool {
        self.definition
            .routing_model
            .reachable_from(&self.definition.entry_screen)
            .contains(screen)
    }
}

/// Builder for one flow's handler set
pub struct FlowBuilder {
    definition: FlowDefinition,
    handlers: HashMap<String, Arc<dyn ScreenHandler>>,
}

impl FlowBuilder {
    pub fn new(definition: FlowDefinition) -> Self {
        Self {
            definition,
            handlers: HashMap::new(),
        }
    }

    pub fn screen(mut self, screen: impl Into<String>, handler: Arc<dyn ScreenHandler>) -> Self {
        self.handlers.insert(screen.into(), handler);
        self
    }

    fn build(self) -> Result<RegisteredFlow> {
        let FlowBuilder {
            definition,
            handlers,
        } = self;
        let model = &definition.routing_model;

        model.validate(&definition.entry_screen).map_err(|e| {
            anyhow!("flow '{}' has an invalid routing model: {}", definition.flow_type, e)
        })?;

        if !handlers.contains_key(&definition.entry_screen) {
            return Err(anyhow!(
                "flow '{}' has no handler for entry screen '{}'",
                definition.flow_type,
                definition.entry_screen
            ));
        }

        if let Some(screen) = handlers.keys().find(|s| !model.contains(s)) {
            return Err(anyhow!(
                "flow '{}' registers a handler for undeclared screen '{}'",
                definition.flow_type,
                screen
            ));
        }

        if let Some(screen) = model
            .screens()
            .find(|s| !model.is_terminal(s) && !handlers.contains_key(*s))
        {
            return Err(anyhow!(
                "flow '{}' has no handler for non-terminal screen '{}'",
                definition.flow_type,
                screen
            ));
        }

        Ok(RegisteredFlow {
            definition,
            handlers,
        })
    }
}

/// All flows the gateway can serve
#[derive(Default)]
pub struct HandlerRegistry {
    flows: HashMap<String, RegisteredFlow>,
    default_flow: Option<String>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a flow. The first registered flow becomes the
    /// default unless one is set explicitly.
    pub fn register(&mut self, flow: FlowBuilder) -> Result<()> {
        let flow = flow.build()?;
        let flow_type = flow.definition.flow_type.clone();

        if self.flows.contains_key(&flow_type) {
            return Err(anyhow!("flow '{}' is already registered", flow_type));
        }

        info!(
            "📋 Registered flow '{}' ({} screens, entry {})",
            flow_type,
            flow.definition.routing_model.screens().count(),
            flow.definition.entry_screen
        );

        if self.default_flow.is_none() {
            self.default_flow = Some(flow_type.clone());
        }
        self.flows.insert(flow_type, flow);
        Ok(())
    }

    pub fn set_default_flow(&mut self, flow_type: &str) -> Result<()> {
        if !self.flows.contains_key(flow_type) {
            return Err(anyhow!("cannot default to unregistered flow '{}'", flow_type));
        }
        self.default_flow = Some(flow_type.to_string());
        Ok(())
    }

    pub fn default_flow(&self) -> Option<&str> {
        self.default_flow.as_deref()
    }

    pub fn get(&self, flow_type: &str) -> Option<&RegisteredFlow> {
        self.flows.get(flow_type)
    }

    /// Resolve the flow a request belongs to.
    ///
    /// A flow token of the form `<flow_type>:<opaque>` selects that flow when it
    /// is registered; anything else falls back to the default flow.
    pub fn resolve(&self, flow_token: Option<&str>) -> Option<&RegisteredFlow> {
        flow_token
            .and_then(|token| token.split_once(FLOW_TOKEN_SEPARATOR))
            .and_then(|(flow_type, _)| self.flows.get(flow_type))
            .or_else(|| self.default_flow.as_deref().and_then(|f| self.flows.get(f)))
    }

    /// Definitions sorted by flow type
    pub fn definitions(&self) -> Vec<&FlowDefinition> {
        let mut defs: Vec<_> = self.flows.values().map(|f| &f.definition).collect();
        defs.sort_by(|a, b| a.flow_type.cmp(&b.flow_type));
        defs
    }
}
