use crate::components::google_calendar::models::{
    ColorPalette, EventAttendee, EventDateTime, EventPatch, ProviderEvent,
};
use crate::utils::time::normalize_start;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Flattened event shape served to month views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayEvent {
    pub id: String,
    pub attendees: Vec<EventAttendee>,
    #[serde(rename = "allDayEvent")]
    pub all_day: bool,
    #[serde(rename = "color")]
    pub background_color: String,
    pub date: String,
    pub description: String,
    pub location: String,
    pub summary: String,
}

/// Body accepted by create and update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEventRequest {
    pub color: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

/// Build the provider write structure from a request.
///
/// Empty strings are treated like absent fields and never clear a value.
pub fn assemble_event(request: &NewEventRequest) -> EventPatch {
    let date = non_empty(&request.date);

    EventPatch {
        start: date.as_deref().map(EventDateTime::all_day),
        end: date.as_deref().map(EventDateTime::all_day),
        color_id: non_empty(&request.color),
        description: non_empty(&request.description),
        location: non_empty(&request.location),
        summary: non_empty(&request.summary),
    }
}

/// Project a provider event into the month-view shape
pub fn to_display_event(
    event: &ProviderEvent,
    palette: &ColorPalette,
    tz: &Tz,
    default_color: &str,
) -> DisplayEvent {
    let (date, all_day) = match &event.start {
        Some(start) => normalize_start(start, tz),
        None => (String::new(), true),
    };

    let background_color = event
        .color_id
        .as_deref()
        .and_then(|id| palette.event_background(id))
        .unwrap_or(default_color)
        .to_string();

    DisplayEvent {
        id: event.id.clone(),
        attendees: event.attendees.clone().unwrap_or_default(),
        all_day,
        background_color,
        date,
        description: event.description.clone().unwrap_or_default(),
        location: event.location.clone().unwrap_or_default(),
        summary: event.summary.clone().unwrap_or_default(),
    }
}
