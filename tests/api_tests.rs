use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kalenteri::components::google_calendar::models::EventDateTime;
use kalenteri::components::google_calendar::{
    CalendarBackend, ColorPalette, EventId, EventPatch, InMemoryCalendar, ProviderEvent,
};
use kalenteri::error::{google_calendar_error, CalendarResult};
use kalenteri::handlers::{router, AppState};
use kalenteri::utils::time::EventWindow;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const DEFAULT_COLOR: &str = "#039be5";

/// Backend that fails every call
struct FailingCalendar;

#[async_trait]
impl CalendarBackend for FailingCalendar {
    async fn colors(&self) -> CalendarResult<ColorPalette> {
        Err(google_calendar_error("HTTP 503 - backend unavailable"))
    }

    async fn list_events(&self, _window: &EventWindow) -> CalendarResult<Vec<ProviderEvent>> {
        Err(google_calendar_error("HTTP 503 - backend unavailable"))
    }

    async fn get_event(&self, _event_id: &str) -> CalendarResult<ProviderEvent> {
        Err(google_calendar_error("HTTP 503 - backend unavailable"))
    }

    async fn insert_event(&self, _event: &EventPatch) -> CalendarResult<EventId> {
        Err(google_calendar_error("HTTP 503 - backend unavailable"))
    }

    async fn patch_event(&self, _event_id: &str, _event: &EventPatch) -> CalendarResult<EventId> {
        Err(google_calendar_error("HTTP 503 - backend unavailable"))
    }

    async fn delete_event(&self, _event_id: &str) -> CalendarResult<()> {
        Err(google_calendar_error("HTTP 503 - backend unavailable"))
    }
}

/// Backend that counts calls before delegating to an in-memory calendar
#[derive(Default)]
struct CountingCalendar {
    inner: InMemoryCalendar,
    calls: AtomicUsize,
}

impl CountingCalendar {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarBackend for CountingCalendar {
    async fn colors(&self) -> CalendarResult<ColorPalette> {
        self.hit();
        self.inner.colors().await
    }

    async fn list_events(&self, window: &EventWindow) -> CalendarResult<Vec<ProviderEvent>> {
        self.hit();
        self.inner.list_events(window).await
    }

    async fn get_event(&self, event_id: &str) -> CalendarResult<ProviderEvent> {
        self.hit();
        self.inner.get_event(event_id).await
    }

    async fn insert_event(&self, event: &EventPatch) -> CalendarResult<EventId> {
        self.hit();
        self.inner.insert_event(event).await
    }

    async fn patch_event(&self, event_id: &str, event: &EventPatch) -> CalendarResult<EventId> {
        self.hit();
        self.inner.patch_event(event_id, event).await
    }

    async fn delete_event(&self, event_id: &str) -> CalendarResult<()> {
        self.hit();
        self.inner.delete_event(event_id).await
    }
}

fn app(backend: Arc<dyn CalendarBackend>) -> Router {
    router(AppState::new(backend, chrono_tz::UTC, DEFAULT_COLOR))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

async fn seeded_calendar() -> Arc<InMemoryCalendar> {
    let calendar = Arc::new(InMemoryCalendar::with_default_palette());

    calendar
        .put_event(ProviderEvent {
            id: "holiday".to_string(),
            color_id: Some("1".to_string()),
            start: Some(EventDateTime::all_day("2024-03-10")),
            end: Some(EventDateTime::all_day("2024-03-11")),
            summary: Some("Company holiday".to_string()),
            ..Default::default()
        })
        .await;
    calendar
        .put_event(ProviderEvent {
            id: "review".to_string(),
            start: Some(EventDateTime {
                date_time: Some("2024-03-05T10:00:00+02:00".to_string()),
                ..Default::default()
            }),
            summary: Some("Design review".to_string()),
            location: Some("Room 2".to_string()),
            ..Default::default()
        })
        .await;
    calendar
        .put_event(ProviderEvent {
            id: "far-away".to_string(),
            start: Some(EventDateTime::all_day("2024-07-01")),
            ..Default::default()
        })
        .await;

    calendar
}

#[tokio::test]
async fn test_month_listing() {
    let app = app(seeded_calendar().await);

    let (status, body) = send(&app, "GET", "/events/month/202403", None).await;
    assert_eq!(status, StatusCode::OK);

    let events = json_body(&body);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);

    assert_eq!(events[0]["id"], "review");
    assert_eq!(events[0]["allDayEvent"], false);
    assert_eq!(events[0]["date"], "2024-03-05T10:00:00+02:00");
    assert_eq!(events[0]["color"], DEFAULT_COLOR);
    assert_eq!(events[0]["location"], "Room 2");

    assert_eq!(events[1]["id"], "holiday");
    assert_eq!(events[1]["allDayEvent"], true);
    assert_eq!(events[1]["date"], "2024-03-10T00:00:00Z");
    assert_eq!(events[1]["color"], "#a4bdfc");
    assert_eq!(events[1]["summary"], "Company holiday");
}

#[tokio::test]
async fn test_month_listing_empty() {
    let app = app(Arc::new(InMemoryCalendar::default()));

    let (status, body) = send(&app, "GET", "/events/month/202401", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));
}

#[tokio::test]
async fn test_month_listing_rejects_bad_requests() {
    let app = app(Arc::new(InMemoryCalendar::default()));

    let (status, body) = send(&app, "POST", "/events/month/202403", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(&body), json!({ "error": "invalid method: POST" }));

    let (status, body) = send(&app, "GET", "/events/month", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json_body(&body), json!({ "error": "invalid request, missing date" }));

    let (status, _) = send(&app, "GET", "/events/month/2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_month_listing_backend_failure_keeps_serving() {
    let app = app(Arc::new(FailingCalendar));

    let (status, body) = send(&app, "GET", "/events/month/202403", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(&body), json!({ "error": "Unable to retrieve user's events" }));

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_create_then_fetch() {
    let calendar = Arc::new(InMemoryCalendar::default());
    let app = app(calendar.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/events",
        Some(r#"{"summary":"Standup","date":"2024-03-10"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let created = json_body(&body);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created.as_object().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", &format!("/events/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let event = json_body(&body);
    assert_eq!(event["summary"], "Standup");
    assert_eq!(event["start"], json!({ "date": "2024-03-10" }));
    assert_eq!(event["end"], json!({ "date": "2024-03-10" }));
    assert!(event.get("colorId").is_none());
    assert!(event.get("location").is_none());
}

#[tokio::test]
async fn test_create_rejects_malformed_body() {
    let calendar = Arc::new(CountingCalendar::default());
    let app = app(calendar.clone());

    let (status, body) = send(&app, "POST", "/events", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].as_str().unwrap().starts_with("invalid request body"));
    assert_eq!(calendar.calls(), 0);
}

#[tokio::test]
async fn test_create_backend_failure() {
    let app = app(Arc::new(FailingCalendar));

    let (status, body) = send(&app, "POST", "/events", Some(r#"{"summary":"Standup"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .contains("backend unavailable"));
}

#[tokio::test]
async fn test_update_is_partial() {
    let calendar = seeded_calendar().await;
    let app = app(calendar.clone());

    let (status, body) = send(
        &app,
        "PATCH",
        "/events/review",
        Some(r#"{"summary":"Design review v2","location":""}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "id": "review" }));

    let stored = calendar.get_event("review").await.unwrap();
    assert_eq!(stored.summary.as_deref(), Some("Design review v2"));
    assert_eq!(stored.location.as_deref(), Some("Room 2"));
    assert!(stored.start.unwrap().is_timed());
}

#[tokio::test]
async fn test_update_and_delete_require_id() {
    let calendar = Arc::new(CountingCalendar::default());
    let app = app(calendar.clone());

    let (status, body) = send(&app, "PATCH", "/events", Some(r#"{"summary":"x"}"#)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json_body(&body), json!({ "error": "invalid request, missing event id" }));

    let (status, _) = send(&app, "DELETE", "/events", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(calendar.calls(), 0);
}

#[tokio::test]
async fn test_delete() {
    let calendar = seeded_calendar().await;
    let app = app(calendar.clone());

    let (status, body) = send(&app, "DELETE", "/events/holiday", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!(true));
    assert_eq!(calendar.len().await, 2);

    let (status, body) = send(&app, "DELETE", "/events/holiday", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("Event not found"));
}

#[tokio::test]
async fn test_fetch_missing_event_has_no_body() {
    let app = app(Arc::new(InMemoryCalendar::default()));

    let (status, body) = send(&app, "GET", "/events/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unknown_method_on_event() {
    let app = app(seeded_calendar().await);

    let (status, body) = send(&app, "PUT", "/events/holiday", Some("{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(&body), json!({ "error": "invalid method: PUT" }));
}
