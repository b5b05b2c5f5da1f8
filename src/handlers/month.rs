use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    Json,
};
use tracing::{debug, error};

use super::mapper::{to_display_event, DisplayEvent};
use super::response::{ApiError, ApiResult};
use super::AppState;
use crate::error::Error;
use crate::utils::time::EventWindow;

/// Handler for `/events/month/{date}`
pub async fn month_events(
    method: Method,
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Vec<DisplayEvent>>> {
    list_month(&state, &method, Some(date.as_str())).await.map(Json)
}

/// Handler for the month route when the date segment is missing
pub async fn month_events_missing(
    method: Method,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<DisplayEvent>>> {
    list_month(&state, &method, None).await.map(Json)
}

/// Events of a month view, padded with the neighbouring grid days
pub async fn list_month(
    state: &AppState,
    method: &Method,
    token: Option<&str>,
) -> ApiResult<Vec<DisplayEvent>> {
    if method != Method::GET {
        return Err(Error::MethodNotAllowed(method.to_string()).into());
    }

    let window = EventWindow::for_month(token, &state.timezone)?;
    debug!("Fetching events between {} and {}", window.start, window.end);

    let unavailable = |e: Error| {
        error!("Unable to retrieve user's events: {}", e);
        ApiError::new(StatusCode::BAD_GATEWAY, "Unable to retrieve user's events")
    };

    let palette = state.backend.colors().await.map_err(unavailable)?;
    let events = state.backend.list_events(&window).await.map_err(unavailable)?;

    Ok(events
        .iter()
        .map(|event| {
            to_display_event(event, &palette, &state.timezone, &state.default_color)
        })
        .collect())
}
