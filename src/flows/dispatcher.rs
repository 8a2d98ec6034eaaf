// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Screen Action Dispatcher
//!
//! Routes a decrypted action to the screen handler registered for its flow and
//! screen, and turns the handler's outcome into a [`ScreenResponse`].
//!
//! | action          | handler path | resulting screen                   |
//! |-----------------|--------------|------------------------------------|
//! | `INIT`          | `render`     | flow entry screen                  |
//! | `data_exchange` | `submit`     | next screen, or completion payload |
//! | `BACK`          | `render`     | the screen being returned to       |
//!
//! Validation failures re-render the submitted screen with `error_message`
//! set instead of advancing.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::action::{DecryptedAction, FlowAction, FormData, ScreenResponse};
use super::registry::{
    HandlerRegistry, RegisteredFlow, ScreenContext, ScreenError, ScreenHandler, Transition,
};

/// Data field carrying a validation message on a re-rendered screen
pub const ERROR_MESSAGE_FIELD: &str = "error_message";

/// Failures after successful decryption.
///
/// All of these are answered with an encrypted error payload, never with a
/// transport-level status.
#[derive(Debug, Error)]
pub enum LogicError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("no flow registered for this request")]
    UnknownFlow,

    #[error("action '{0}' requires a screen")]
    MissingScreen(FlowAction),

    #[error("unknown screen '{screen}' for flow '{flow_type}'")]
    UnknownScreen { flow_type: String, screen: String },

    #[error("screen '{to}' is not reachable from '{from}'")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Handler(anyhow::Error),
}

/// Generic dispatcher over any [`HandlerRegistry`]
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: &DecryptedAction) -> Result<ScreenResponse, LogicError> {
        match &request.action {
            FlowAction::Ping => Ok(ScreenResponse::ping()),
            FlowAction::Init => self.init(request).await,
            FlowAction::DataExchange => self.data_exchange(request).await,
            FlowAction::Back => self.back(request).await,
            FlowAction::Other(action) => Err(LogicError::UnknownAction(action.clone())),
        }
    }

    fn flow_for(&self, request: &DecryptedAction) -> Result<&RegisteredFlow, LogicError> {
        self.registry
            .resolve(request.flow_token.as_deref())
            .ok_or(LogicError::UnknownFlow)
    }

    /// Look up a declared, reachable screen and its handler
    fn screen_handler<'a>(
        flow: &'a RegisteredFlow,
        screen: &str,
    ) -> Result<&'a Arc<dyn ScreenHandler>, LogicError> {
        let unknown = || LogicError::UnknownScreen {
            flow_type: flow.definition.flow_type.clone(),
            screen: screen.to_string(),
        };

        if !flow.is_reachable(screen) {
            return Err(unknown());
        }
        flow.handler(screen).ok_or_else(unknown)
    }

    fn context(flow: &RegisteredFlow, screen: &str, request: &DecryptedAction) -> ScreenContext {
        ScreenContext {
            flow_type: flow.definition.flow_type.clone(),
            screen: screen.to_string(),
            flow_token: request.flow_token.clone(),
            data: request.data.clone().unwrap_or_default(),
        }
    }

    async fn render(
        handler: &Arc<dyn ScreenHandler>,
        ctx: &ScreenContext,
    ) -> Result<ScreenResponse, LogicError> {
        match handler.render(ctx).await {
            Ok(data) => Ok(ScreenResponse::screen(ctx.screen.clone(), data)),
            Err(ScreenError::Validation(message)) => {
                Ok(ScreenResponse::screen(ctx.screen.clone(), error_data(message)))
            }
            Err(ScreenError::Failed(e)) => Err(LogicError::Handler(e)),
        }
    }

    async fn init(&self, request: &DecryptedAction) -> Result<ScreenResponse, LogicError> {
        let flow = self.flow_for(request)?;
        let entry = &flow.definition.entry_screen;
        let handler = Self::screen_handler(flow, entry)?;

        let ctx = ScreenContext {
            flow_type: flow.definition.flow_type.clone(),
            screen: entry.clone(),
            flow_token: request.flow_token.clone(),
            data: FormData::new(),
        };

        info!(
            "🚀 INIT flow '{}' at screen {}",
            flow.definition.flow_type, entry
        );
        Self::render(handler, &ctx).await
    }

    async fn data_exchange(&self, request: &DecryptedAction) -> Result<ScreenResponse, LogicError> {
        let flow = self.flow_for(request)?;
        let screen = request
            .screen
            .as_deref()
            .ok_or(LogicError::MissingScreen(FlowAction::DataExchange))?;
        let handler = Self::screen_handler(flow, screen)?;
        let ctx = Self::context(flow, screen, request);

        match handler.submit(&ctx).await {
            Ok(Transition::Next { screen: next, data }) => {
                if !flow.definition.routing_model.is_edge(screen, &next) {
                    warn!(
                        "⚠️  Handler for {} tried to route to undeclared screen {}",
                        screen, next
                    );
                    return Err(LogicError::InvalidTransition {
                        from: screen.to_string(),
                        to: next,
                    });
                }
                debug!("➡️  {} -> {}", screen, next);
                Ok(ScreenResponse::screen(next, data))
            }
            Ok(Transition::Complete { data }) => {
                info!("🏁 Flow '{}' completed at {}", flow.definition.flow_type, screen);
                Ok(ScreenResponse::complete(data))
            }
            Err(ScreenError::Validation(message)) => {
                debug!("✋ Validation failed on {}: {}", screen, message);
                let mut response = Self::render(handler, &ctx).await?;
                response
                    .data
                    .insert(ERROR_MESSAGE_FIELD.to_string(), message.into());
                Ok(response)
            }
            Err(ScreenError::Failed(e)) => Err(LogicError::Handler(e)),
        }
    }

    async fn back(&self, request: &DecryptedAction) -> Result<ScreenResponse, LogicError> {
        let flow = self.flow_for(request)?;
        let screen = request
            .screen
            .as_deref()
            .ok_or(LogicError::MissingScreen(FlowAction::Back))?;
        let handler = Self::screen_handler(flow, screen)?;
        let ctx = Self::context(flow, screen, request);

        debug!("⬅️  BACK to {}", screen);
        Self::render(handler, &ctx).await
    }
}

fn error_data(message: String) -> FormData {
    let mut data = FormData::new();
    data.insert(ERROR_MESSAGE_FIELD.to_string(), message.into());
    data
}
