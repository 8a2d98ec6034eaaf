// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Appointment booking flow
//!
//! Reference handler set for a dynamic booking form:
//!
//! ```text
//! BOOKING_START -> SELECT_TIME -> CUSTOMER_INFO -> SUCCESS
//!                  SELECT_TIME -> BOOKING_START
//!                                 CUSTOMER_INFO -> SELECT_TIME
//! ```
//!
//! Availability and bookings come from a [`CalendarBackend`]. The only side
//! effect, booking the slot, happens when CUSTOMER_INFO is submitted.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::action::{object, FormData};
use super::registry::{
    FlowBuilder, FlowDefinition, ScreenContext, ScreenError, ScreenHandler, Transition,
};
use super::routing::RoutingModel;

pub const BOOKING_FLOW_TYPE: &str = "booking";

pub const BOOKING_START: &str = "BOOKING_START";
pub const SELECT_TIME: &str = "SELECT_TIME";
pub const CUSTOMER_INFO: &str = "CUSTOMER_INFO";
pub const SUCCESS: &str = "SUCCESS";

/// Working hours offered by [`InMemoryCalendar`] by default
pub const DEFAULT_HOURS: [u32; 6] = [9, 10, 11, 14, 15, 16];

/// `{ id, title }` pair used by dropdown data sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub title: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Bookable time; `id` is the RFC 3339 start time, `title` is `HH:MM`
pub type TimeSlot = Choice;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service: String,
    pub date: NaiveDate,
    pub slot_id: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub flow_token: Option<String>,
}

/// External calendar the booking flow reads from and writes to
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    async fn available_slots(&self, service: &str, date: NaiveDate) -> Result<Vec<TimeSlot>>;

    /// Book a slot, returning the calendar event id
    async fn book(&self, request: &BookingRequest) -> Result<String>;
}

/// Calendar kept in memory with a fixed set of hourly slots per day
#[derive(Clone)]
pub struct InMemoryCalendar {
    hours: Vec<u32>,
    bookings: Arc<RwLock<HashMap<String, BookingRequest>>>,
}

impl InMemoryCalendar {
    pub fn new(hours: Vec<u32>) -> Self {
        Self {
            hours,
            bookings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn bookings(&self) -> Vec<BookingRequest> {
        self.bookings.read().await.values().cloned().collect()
    }

    fn slot_for(date: NaiveDate, hour: u32) -> Option<TimeSlot> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        let start = date.and_time(time).and_utc();
        Some(Choice::new(
            start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            start.format("%H:%M").to_string(),
        ))
    }
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new(DEFAULT_HOURS.to_vec())
    }
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    async fn available_slots(&self, _service: &str, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        let bookings = self.bookings.read().await;
        Ok(self
            .hours
            .iter()
            .filter_map(|hour| Self::slot_for(date, *hour))
            .filter(|slot| !bookings.contains_key(&slot.id))
            .collect())
    }

    async fn book(&self, request: &BookingRequest) -> Result<String> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&request.slot_id) {
            return Err(anyhow!("slot {} is already booked", request.slot_id));
        }
        bookings.insert(request.slot_id.clone(), request.clone());
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// Longest booking window offered
pub const MAX_BOOKING_DAYS: u32 = 90;

/// Tunables for the booking flow
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub services: Vec<Choice>,
    /// Number of consecutive days offered, starting today; at most
    /// [`MAX_BOOKING_DAYS`]
    pub days_ahead: u32,
    /// Fixed first day; `None` means today (UTC)
    pub start_date: Option<NaiveDate>,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            services: vec![
                Choice::new("consultation", "Consultation"),
                Choice::new("visit", "Visit"),
                Choice::new("support", "Support"),
            ],
            days_ahead: 7,
            start_date: None,
        }
    }
}

struct Booking {
    calendar: Arc<dyn CalendarBackend>,
    settings: BookingSettings,
}

impl Booking {
    fn first_day(&self) -> NaiveDate {
        self.settings
            .start_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    fn days_ahead(&self) -> u32 {
        self.settings.days_ahead.clamp(1, MAX_BOOKING_DAYS)
    }

    /// Whether `date` falls in the offered window
    fn offers(&self, date: NaiveDate) -> bool {
        let first = self.first_day();
        date >= first
            && date.signed_duration_since(first).num_days() < i64::from(self.days_ahead())
    }

    fn dates(&self) -> Vec<Choice> {
        let first = self.first_day();
        (0..self.days_ahead())
            .map_while(|offset| first.checked_add_signed(Duration::days(i64::from(offset))))
            .map(|date| {
                Choice::new(
                    date.format("%Y-%m-%d").to_string(),
                    date.format("%a, %d %b").to_string(),
                )
            })
            .collect()
    }

    fn service<'a>(&'a self, ctx: &ScreenContext) -> Result<&'a Choice, ScreenError> {
        let id = ctx.required("selected_service", "Choose a service")?;
        self.settings
            .services
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ScreenError::Validation(format!("Unknown service '{}'", id)))
    }

    fn date(&self, ctx: &ScreenContext) -> Result<NaiveDate, ScreenError> {
        let raw = ctx.required("selected_date", "Choose a date")?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) if self.offers(date) => Ok(date),
            _ => Err(ScreenError::Validation(
                "That date is not available, choose another".to_string(),
            )),
        }
    }

    async fn slots(&self, service: &Choice, date: NaiveDate) -> Result<Vec<TimeSlot>, ScreenError> {
        Ok(self.calendar.available_slots(&service.id, date).await?)
    }

    /// Slot the user picked, provided it is still open
    async fn open_slot(
        &self,
        ctx: &ScreenContext,
        service: &Choice,
        date: NaiveDate,
    ) -> Result<TimeSlot, ScreenError> {
        let slot_id = ctx.required("selected_slot", "Choose a time")?;
        self.slots(service, date)
            .await?
            .into_iter()
            .find(|s| s.id == slot_id)
            .ok_or_else(|| {
                ScreenError::Validation("That time was just taken, choose another".to_string())
            })
    }

    fn select_time_data(service: &Choice, date: NaiveDate, slots: &[TimeSlot]) -> FormData {
        object(json!({
            "title": "Choose a time",
            "subtitle": format!("Available times for {}", service.title),
            "selected_service": service.id,
            "selected_date": date.format("%Y-%m-%d").to_string(),
            "slots": slots,
        }))
    }

    fn customer_info_data(service: &Choice, date: NaiveDate, slot: &TimeSlot) -> FormData {
        object(json!({
            "title": "Your details",
            "subtitle": format!("{} on {} at {}", service.title, date.format("%a, %d %b"), slot.title),
            "selected_service": service.id,
            "selected_date": date.format("%Y-%m-%d").to_string(),
            "selected_slot": slot.id,
        }))
    }
}

struct StartScreen(Arc<Booking>);
struct SelectTimeScreen(Arc<Booking>);
struct CustomerInfoScreen(Arc<Booking>);

#[async_trait]
impl ScreenHandler for StartScreen {
    async fn render(&self, _ctx: &ScreenContext) -> Result<FormData, ScreenError> {
        Ok(object(json!({
            "title": "Book an appointment",
            "subtitle": "Choose the service and the date",
            "services": self.0.settings.services,
            "dates": self.0.dates(),
            "error_message": "",
        })))
    }

    async fn submit(&self, ctx: &ScreenContext) -> Result<Transition, ScreenError> {
        let service = self.0.service(ctx)?;
        let date = self.0.date(ctx)?;
        let slots = self.0.slots(service, date).await?;
        if slots.is_empty() {
            return Err(ScreenError::Validation(
                "No times left on this date, choose another".to_string(),
            ));
        }

        Ok(Transition::Next {
            screen: SELECT_TIME.to_string(),
            data: Booking::select_time_data(service, date, &slots),
        })
    }
}

#[async_trait]
impl ScreenHandler for SelectTimeScreen {
    /// Re-queries availability, so going back always shows fresh slots
    async fn render(&self, ctx: &ScreenContext) -> Result<FormData, ScreenError> {
        let service = self.0.service(ctx)?;
        let date = self.0.date(ctx)?;
        let slots = self.0.slots(service, date).await?;
        Ok(Booking::select_time_data(service, date, &slots))
    }

    async fn submit(&self, ctx: &ScreenContext) -> Result<Transition, ScreenError> {
        let service = self.0.service(ctx)?;
        let date = self.0.date(ctx)?;
        let slot = self.0.open_slot(ctx, service, date).await?;

        Ok(Transition::Next {
            screen: CUSTOMER_INFO.to_string(),
            data: Booking::customer_info_data(service, date, &slot),
        })
    }
}

#[async_trait]
impl ScreenHandler for CustomerInfoScreen {
    async fn render(&self, ctx: &ScreenContext) -> Result<FormData, ScreenError> {
        let service = self.0.service(ctx)?;
        let date = self.0.date(ctx)?;
        let slot = self.0.open_slot(ctx, service, date).await?;
        Ok(Booking::customer_info_data(service, date, &slot))
    }

    async fn submit(&self, ctx: &ScreenContext) -> Result<Transition, ScreenError> {
        let service = self.0.service(ctx)?;
        let date = self.0.date(ctx)?;
        let slot = self.0.open_slot(ctx, service, date).await?;
        let customer_name = ctx.required("customer_name", "Tell us your name")?;

        let request = BookingRequest {
            service: service.id.clone(),
            date,
            slot_id: slot.id.clone(),
            customer_name: customer_name.to_string(),
            customer_phone: ctx.field("customer_phone").map(str::to_string),
            notes: ctx.field("notes").map(str::to_string),
            flow_token: ctx.flow_token.clone(),
        };
        let event_id = self.0.calendar.book(&request).await?;
        info!("📅 Booked {} for {} ({})", slot.id, service.id, event_id);

        Ok(Transition::Next {
            screen: SUCCESS.to_string(),
            data: object(json!({
                "message": format!(
                    "Your {} is booked for {} at {}.",
                    service.title.to_lowercase(),
                    date.format("%a, %d %b"),
                    slot.title
                ),
                "event_id": event_id,
            })),
        })
    }
}

/// Static definition of the booking flow
pub fn booking_definition() -> FlowDefinition {
    FlowDefinition {
        flow_type: BOOKING_FLOW_TYPE.to_string(),
        name: "Appointment booking".to_string(),
        description: "Real-time booking against calendar availability".to_string(),
        entry_screen: BOOKING_START.to_string(),
        routing_model: RoutingModel::new()
            .with_screen(BOOKING_START, [SELECT_TIME])
            .with_screen(SELECT_TIME, [CUSTOMER_INFO, BOOKING_START])
            .with_screen(CUSTOMER_INFO, [SUCCESS, SELECT_TIME])
            .with_screen(SUCCESS, Vec::<String>::new()),
    }
}

/// Booking flow wired to `calendar`, ready for [`HandlerRegistry::register`]
///
/// [`HandlerRegistry::register`]: super::registry::HandlerRegistry::register
pub fn booking_flow(calendar: Arc<dyn CalendarBackend>, settings: BookingSettings) -> FlowBuilder {
    let booking = Arc::new(Booking { calendar, settings });
    FlowBuilder::new(booking_definition())
        .screen(BOOKING_START, Arc::new(StartScreen(booking.clone())))
        .screen(SELECT_TIME, Arc::new(SelectTimeScreen(booking.clone())))
        .screen(CUSTOMER_INFO, Arc::new(CustomerInfoScreen(booking)))
}

/// Dropdown entries from a rendered data field
pub fn choices(data: &FormData, field: &str) -> Vec<Choice> {
    data.get(field)
        .cloned()
        .and_then(|v: Value| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
