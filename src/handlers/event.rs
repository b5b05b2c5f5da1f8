use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use super::mapper::{assemble_event, NewEventRequest};
use super::response::{ApiError, ApiResult};
use super::AppState;
use crate::components::google_calendar::{EventId, ProviderEvent};
use crate::error::Error;

/// Handler for `/events/{id}`
pub async fn event(
    method: Method,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    dispatch(&state, &method, &id, &body).await
}

/// Handler for `/events` (no id in the path)
pub async fn event_without_id(method: Method, State(state): State<AppState>, body: Bytes) -> Response {
    dispatch(&state, &method, "", &body).await
}

/// Route a single-event request by method
pub async fn dispatch(state: &AppState, method: &Method, id: &str, body: &[u8]) -> Response {
    match *method {
        Method::GET => fetch_event(state, id).await.into_response(),
        Method::POST => create_event(state, body)
            .await
            .map(|created| (StatusCode::CREATED, Json(created)))
            .into_response(),
        Method::PATCH => update_event(state, id, body).await.map(Json).into_response(),
        Method::DELETE => delete_event(state, id).await.map(Json).into_response(),
        _ => ApiError::from(Error::MethodNotAllowed(method.to_string())).into_response(),
    }
}

fn decode_body(body: &[u8]) -> ApiResult<NewEventRequest> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected event body: {}", e);
        Error::Decode(e.to_string()).into()
    })
}

fn backend_failure(action: &str, e: Error) -> ApiError {
    error!("Failed to {}: {}", action, e);
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Fetch one event as the provider returns it. Failures answer 404 without a body.
pub async fn fetch_event(state: &AppState, id: &str) -> ApiResult<Json<ProviderEvent>> {
    if id.is_empty() {
        return Err(ApiError::status_only(StatusCode::NOT_FOUND));
    }

    match state.backend.get_event(id).await {
        Ok(event) => Ok(Json(event)),
        Err(e) => {
            error!("Unable to retrieve event {}: {}", id, e);
            Err(ApiError::status_only(StatusCode::NOT_FOUND))
        }
    }
}

pub async fn create_event(state: &AppState, body: &[u8]) -> ApiResult<EventId> {
    let request = decode_body(body)?;
    let patch = assemble_event(&request);

    let created = state
        .backend
        .insert_event(&patch)
        .await
        .map_err(|e| backend_failure("create event", e))?;

    info!("Created event {}", created.id);
    Ok(created)
}

/// Patch only the fields present in the request; absent fields stay as stored
pub async fn update_event(state: &AppState, id: &str, body: &[u8]) -> ApiResult<EventId> {
    if id.is_empty() {
        return Err(Error::MissingParameter("event id").into());
    }

    let request = decode_body(body)?;
    let patch = assemble_event(&request);

    let updated = state
        .backend
        .patch_event(id, &patch)
        .await
        .map_err(|e| backend_failure("update event", e))?;

    info!("Updated event {}", updated.id);
    Ok(updated)
}

pub async fn delete_event(state: &AppState, id: &str) -> ApiResult<bool> {
    if id.is_empty() {
        return Err(Error::MissingParameter("event id").into());
    }

    state
        .backend
        .delete_event(id)
        .await
        .map_err(|e| backend_failure("delete event", e))?;

    info!("Deleted event {}", id);
    Ok(true)
}
