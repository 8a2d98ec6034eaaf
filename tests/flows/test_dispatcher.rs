// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for the screen action dispatcher

use anyhow::anyhow;
use async_trait::async_trait;
use flow_gateway::flows::{
    object, DecryptedAction, Dispatcher, FlowAction, FlowBuilder, FlowDefinition, FormData,
    HandlerRegistry, LogicError, RoutingModel, ScreenContext, ScreenError, ScreenHandler,
    ScreenResponse, Transition, ERROR_MESSAGE_FIELD,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct StartScreen;

#[async_trait]
impl ScreenHandler for StartScreen {
    async fn render(&self, _ctx: &ScreenContext) -> Result<FormData, ScreenError> {
        Ok(object(json!({ "greeting": "hello" })))
    }

    async fn submit(&self, _ctx: &ScreenContext) -> Result<Transition, ScreenError> {
        Ok(Transition::Next {
            screen: "FORM".to_string(),
            data: object(json!({ "prefill": "Ana" })),
        })
    }
}

/// Counts render and submit calls separately
#[derive(Default)]
struct FormScreen {
    renders: AtomicUsize,
    submits: AtomicUsize,
}

#[async_trait]
impl ScreenHandler for FormScreen {
    async fn render(&self, _ctx: &ScreenContext) -> Result<FormData, ScreenError> {
        let renders = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(object(json!({ "renders": renders })))
    }

    async fn submit(&self, ctx: &ScreenContext) -> Result<Transition, ScreenError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        match ctx.required("name", "Name is required")? {
            "skip" => Ok(Transition::Next {
                screen: "NOWHERE".to_string(),
                data: FormData::new(),
            }),
            "restart" => Ok(Transition::Next {
                screen: "START".to_string(),
                data: FormData::new(),
            }),
            "fail" => Err(anyhow!("calendar backend timed out").into()),
            name => Ok(Transition::Complete {
                data: object(json!({ "name": name })),
            }),
        }
    }
}

fn definition(flow_type: &str) -> FlowDefinition {
    FlowDefinition {
        flow_type: flow_type.to_string(),
        name: flow_type.to_string(),
        description: String::new(),
        entry_screen: "START".to_string(),
        routing_model: RoutingModel::new()
            .with_screen("START", ["FORM"])
            .with_screen("FORM", ["DONE", "START"])
            .with_screen("DONE", Vec::<String>::new())
            .with_screen("ORPHAN", ["DONE"]),
    }
}

fn setup() -> (Dispatcher, Arc<FormScreen>) {
    let form = Arc::new(FormScreen::default());
    let mut registry = HandlerRegistry::new();
    registry
        .register(
            FlowBuilder::new(definition("survey"))
                .screen("START", Arc::new(StartScreen))
                .screen("FORM", form.clone())
                .screen("ORPHAN", Arc::new(StartScreen)),
        )
        .unwrap();
    (Dispatcher::new(Arc::new(registry)), form)
}

fn request(action: &str, screen: Option<&str>, data: serde_json::Value) -> DecryptedAction {
    DecryptedAction {
        version: "3.0".to_string(),
        action: FlowAction::from(action.to_string()),
        screen: screen.map(str::to_string),
        data: Some(object(data)),
        flow_token: Some("survey:token-1".to_string()),
    }
}

#[tokio::test]
async fn test_ping_is_answered() {
    let (dispatcher, _) = setup();
    let response = dispatcher
        .dispatch(&request("ping", None, json!({})))
        .await
        .unwrap();
    assert_eq!(response, ScreenResponse::ping());
}

#[tokio::test]
async fn test_init_renders_entry_screen() {
    let (dispatcher, _) = setup();
    let response = dispatcher
        .dispatch(&request("INIT", None, json!({ "ignored": true })))
        .await
        .unwrap();

    assert_eq!(response.screen.as_deref(), Some("START"));
    assert_eq!(response.data, object(json!({ "greeting": "hello" })));
    assert!(!response.completion);
}

#[tokio::test]
async fn test_data_exchange_follows_edge() {
    let (dispatcher, _) = setup();
    let response = dispatcher
        .dispatch(&request("data_exchange", Some("START"), json!({})))
        .await
        .unwrap();

    assert_eq!(response.screen.as_deref(), Some("FORM"));
    assert_eq!(response.data["prefill"], json!("Ana"));
}

#[tokio::test]
async fn test_completion_shape() {
    let (dispatcher, _) = setup();
    let response = dispatcher
        .dispatch(&request("data_exchange", Some("FORM"), json!({ "name": "Ana" })))
        .await
        .unwrap();

    assert!(response.completion);
    assert!(response.screen.is_none());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "data": { "name": "Ana" }, "completion": true })
    );
}

#[tokio::test]
async fn test_validation_error_rerenders_same_screen() {
    let (dispatcher, form) = setup();
    let response = dispatcher
        .dispatch(&request("data_exchange", Some("FORM"), json!({ "name": "  " })))
        .await
        .unwrap();

    assert_eq!(response.screen.as_deref(), Some("FORM"));
    assert_eq!(response.data[ERROR_MESSAGE_FIELD], json!("Name is required"));
    assert_eq!(response.data["renders"], json!(1));
    assert_eq!(form.submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_back_replays_without_forward_side_effects() {
    let (dispatcher, form) = setup();

    for _ in 0..3 {
        let response = dispatcher
            .dispatch(&request("BACK", Some("FORM"), json!({ "name": "Ana" })))
            .await
            .unwrap();
        assert_eq!(response.screen.as_deref(), Some("FORM"));
    }

    assert_eq!(form.renders.load(Ordering::SeqCst), 3);
    assert_eq!(form.submits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_back_edge_is_allowed_forward() {
    let (dispatcher, _) = setup();
    let response = dispatcher
        .dispatch(&request("data_exchange", Some("FORM"), json!({ "name": "restart" })))
        .await
        .unwrap();
    assert_eq!(response.screen.as_deref(), Some("START"));
}

#[tokio::test]
async fn test_transition_outside_routing_model_is_rejected() {
    let (dispatcher, _) = setup();
    let err = dispatcher
        .dispatch(&request("data_exchange", Some("FORM"), json!({ "name": "skip" })))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LogicError::InvalidTransition { ref from, ref to } if from == "FORM" && to == "NOWHERE"
    ));
}

#[tokio::test]
async fn test_unknown_and_unreachable_screens() {
    let (dispatcher, _) = setup();

    for screen in ["MISSING", "ORPHAN"] {
        let err = dispatcher
            .dispatch(&request("data_exchange", Some(screen), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, LogicError::UnknownScreen { .. }), "{}", screen);
    }

    // Terminal screens have no handler
    let err = dispatcher
        .dispatch(&request("BACK", Some("DONE"), json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LogicError::UnknownScreen { .. }));
}

#[tokio::test]
async fn test_missing_screen() {
    let (dispatcher, _) = setup();
    let err = dispatcher
        .dispatch(&request("data_exchange", None, json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LogicError::MissingScreen(FlowAction::DataExchange)));

    let err = dispatcher
        .dispatch(&request("BACK", None, json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LogicError::MissingScreen(FlowAction::Back)));
}

#[tokio::test]
async fn test_unknown_action() {
    let (dispatcher, _) = setup();
    let err = dispatcher
        .dispatch(&request("navigate", Some("FORM"), json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LogicError::UnknownAction(ref a) if a == "navigate"));
    assert_eq!(err.to_string(), "unknown action 'navigate'");
}

#[tokio::test]
async fn test_handler_failure() {
    let (dispatcher, _) = setup();
    let err = dispatcher
        .dispatch(&request("data_exchange", Some("FORM"), json!({ "name": "fail" })))
        .await
        .unwrap_err();
    assert!(matches!(err, LogicError::Handler(_)));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_flow_token_selects_flow() {
    let mut registry = HandlerRegistry::new();
    registry
        .register(
            FlowBuilder::new(definition("survey"))
                .screen("START", Arc::new(StartScreen))
                .screen("FORM", Arc::new(FormScreen::default()))
                .screen("ORPHAN", Arc::new(StartScreen)),
        )
        .unwrap();

    let mut other = definition("feedback");
    other.entry_screen = "FORM".to_string();
    registry
        .register(
            FlowBuilder::new(other)
                .screen("START", Arc::new(StartScreen))
                .screen("FORM", Arc::new(FormScreen::default()))
                .screen("ORPHAN", Arc::new(StartScreen)),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let mut init = request("INIT", None, json!({}));
    init.flow_token = Some("feedback:xyz".to_string());
    let response = dispatcher.dispatch(&init).await.unwrap();
    assert_eq!(response.screen.as_deref(), Some("FORM"));

    init.flow_token = Some("opaque".to_string());
    let response = dispatcher.dispatch(&init).await.unwrap();
    assert_eq!(response.screen.as_deref(), Some("START"));

    init.flow_token = None;
    let response = dispatcher.dispatch(&init).await.unwrap();
    assert_eq!(response.screen.as_deref(), Some("START"));
}

#[tokio::test]
async fn test_empty_registry_has_no_flow() {
    let dispatcher = Dispatcher::new(Arc::new(HandlerRegistry::new()));
    let err = dispatcher
        .dispatch(&request("INIT", None, json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, LogicError::UnknownFlow));
}
