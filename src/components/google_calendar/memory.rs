use super::models::{ColorDefinition, ColorPalette, EventId, EventPatch, ProviderEvent};
use super::CalendarBackend;
use crate::error::{google_calendar_error, CalendarResult};
use crate::utils::time::{parse_event_start, EventWindow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory calendar backend (for local development and testing)
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    events: RwLock<HashMap<String, ProviderEvent>>,
    palette: ColorPalette,
}

impl InMemoryCalendar {
    /// Create an empty calendar with the given palette
    pub fn new(palette: ColorPalette) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            palette,
        }
    }

    /// Create a calendar with a small palette of event colors
    pub fn with_default_palette() -> Self {
        let event = [("1", "#a4bdfc"), ("2", "#7ae7bf"), ("11", "#dc2127")]
            .into_iter()
            .map(|(id, background)| {
                (
                    id.to_string(),
                    ColorDefinition {
                        background: background.to_string(),
                        foreground: "#1d1d1d".to_string(),
                    },
                )
            })
            .collect();

        Self::new(ColorPalette {
            event,
            calendar: HashMap::new(),
        })
    }

    /// Store an event as-is, replacing any event with the same id
    pub async fn put_event(&self, event: ProviderEvent) {
        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event);
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether the calendar holds no events
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

/// Start instant used for window filtering and ordering
fn start_instant(event: &ProviderEvent) -> Option<DateTime<FixedOffset>> {
    event.start.as_ref().and_then(parse_event_start)
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    async fn colors(&self) -> CalendarResult<ColorPalette> {
        Ok(self.palette.clone())
    }

    async fn list_events(&self, window: &EventWindow) -> CalendarResult<Vec<ProviderEvent>> {
        let (min, max) = window.bounds()?;
        let events = self.events.read().await;

        let mut matching: Vec<(DateTime<FixedOffset>, ProviderEvent)> = events
            .values()
            .filter(|e| e.status.as_deref() != Some("cancelled"))
            .filter_map(|e| start_instant(e).map(|start| (start, e.clone())))
            .filter(|(start, _)| *start >= min && *start < max)
            .collect();

        matching.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        Ok(matching.into_iter().map(|(_, e)| e).collect())
    }

    async fn get_event(&self, event_id: &str) -> CalendarResult<ProviderEvent> {
        let events = self.events.read().await;
        events
            .get(event_id)
            .cloned()
            .ok_or_else(|| google_calendar_error(&format!("Event not found: {}", event_id)))
    }

    async fn insert_event(&self, event: &EventPatch) -> CalendarResult<EventId> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut stored = ProviderEvent {
            id: id.clone(),
            status: Some("confirmed".to_string()),
            ..Default::default()
        };
        event.apply_to(&mut stored);

        let mut events = self.events.write().await;
        events.insert(id.clone(), stored);
        Ok(EventId { id })
    }

    async fn patch_event(&self, event_id: &str, event: &EventPatch) -> CalendarResult<EventId> {
        let mut events = self.events.write().await;
        let stored = events
            .get_mut(event_id)
            .ok_or_else(|| google_calendar_error(&format!("Event not found: {}", event_id)))?;
        event.apply_to(stored);
        Ok(EventId {
            id: event_id.to_string(),
        })
    }

    async fn delete_event(&self, event_id: &str) -> CalendarResult<()> {
        let mut events = self.events.write().await;
        events
            .remove(event_id)
            .map(|_| ())
            .ok_or_else(|| google_calendar_error(&format!("Event not found: {}", event_id)))
    }
}
