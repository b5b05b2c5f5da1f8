use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Start or end of a Google Calendar event.
///
/// All-day events carry `date` only, timed events carry `dateTime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// An all-day start or end on the given `YYYY-MM-DD` date
    pub fn all_day(date: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    /// Whether the value has a time-of-day component
    pub fn is_timed(&self) -> bool {
        self.date_time.as_deref().is_some_and(|dt| !dt.is_empty())
    }
}

/// Attendee of a Google Calendar event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<bool>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Google Calendar event resource as returned by the API.
///
/// Only the fields the facade reads are typed; everything else is kept in
/// `extra` so the resource can be handed back to callers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<EventAttendee>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sparse event body for inserts and patches. Unset fields are not serialized,
/// so a patch leaves them untouched on the stored event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl EventPatch {
    /// Apply the set fields onto an existing event
    pub fn apply_to(&self, event: &mut ProviderEvent) {
        if let Some(start) = &self.start {
            event.start = Some(start.clone());
        }
        if let Some(end) = &self.end {
            event.end = Some(end.clone());
        }
        if let Some(color_id) = &self.color_id {
            event.color_id = Some(color_id.clone());
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(summary) = &self.summary {
            event.summary = Some(summary.clone());
        }
    }
}

/// `fields=id` projection returned from inserts and patches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventId {
    pub id: String,
}

/// One page of an events list response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<ProviderEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorDefinition {
    pub background: String,
    pub foreground: String,
}

/// Color palette resource (`GET /colors`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    #[serde(default)]
    pub event: HashMap<String, ColorDefinition>,
    #[serde(default)]
    pub calendar: HashMap<String, ColorDefinition>,
}

impl ColorPalette {
    /// Background color for an event color id, if the palette knows it
    pub fn event_background(&self, color_id: &str) -> Option<&str> {
        self.event.get(color_id).map(|c| c.background.as_str())
    }
}
