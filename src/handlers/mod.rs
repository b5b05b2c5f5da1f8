pub mod event;
pub mod mapper;
pub mod month;
pub mod response;

use crate::components::google_calendar::CalendarBackend;
use crate::config::Config;
use crate::error::CalendarResult;
use axum::{
    routing::{any, get},
    Router,
};
use chrono_tz::Tz;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use mapper::{DisplayEvent, NewEventRequest};
pub use response::{ApiError, ErrorResponse};

/// State shared by all handlers. Built once at startup, never mutated.
#[derive(Clone)]
pub struct AppState {
    /// Calendar provider
    pub backend: Arc<dyn CalendarBackend>,
    /// Zone for month windows and all-day dates
    pub timezone: Tz,
    /// Background for events without a palette entry
    pub default_color: String,
}

impl AppState {
    pub fn new(backend: Arc<dyn CalendarBackend>, timezone: Tz, default_color: &str) -> Self {
        Self {
            backend,
            timezone,
            default_color: default_color.to_string(),
        }
    }

    /// State for a backend using the configured zone and fallback color
    pub fn from_config(config: &Config, backend: Arc<dyn CalendarBackend>) -> CalendarResult<Self> {
        Ok(Self::new(backend, config.tz()?, &config.default_event_color))
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/events/month", any(month::month_events_missing))
        .route("/events/month/", any(month::month_events_missing))
        .route("/events/month/{date}", any(month::month_events))
        .route("/events", any(event::event_without_id))
        .route("/events/", any(event::event_without_id))
        .route("/events/{id}", any(event::event))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// Handler for API health check
pub async fn health_handler() -> &'static str {
    "OK"
}
