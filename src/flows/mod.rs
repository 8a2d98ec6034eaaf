// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flow Screen Logic
//!
//! Everything that happens after a request has been decrypted: parsing the
//! action, resolving the flow and screen, running the screen handler and
//! shaping the response that gets encrypted back.

pub mod action;
pub mod booking;
pub mod dispatcher;
pub mod registry;
pub mod routing;

pub use action::{object, DecryptedAction, FlowAction, FormData, ScreenResponse};
pub use booking::{
    booking_flow, BookingRequest, BookingSettings, CalendarBackend, Choice, InMemoryCalendar,
    TimeSlot, BOOKING_FLOW_TYPE, MAX_BOOKING_DAYS,
};
pub use dispatcher::{Dispatcher, LogicError, ERROR_MESSAGE_FIELD};
pub use registry::{
    FlowBuilder, FlowDefinition, HandlerRegistry, RegisteredFlow, ScreenContext, ScreenError,
    ScreenHandler, Transition, FLOW_TOKEN_SEPARATOR,
};
pub use routing::RoutingModel;
