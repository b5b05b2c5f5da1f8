mod client;
mod memory;
pub mod models;
pub mod token;

pub use client::GoogleCalendarClient;
pub use memory::InMemoryCalendar;
pub use models::{ColorPalette, EventId, EventPatch, ProviderEvent};

use crate::error::CalendarResult;
use crate::utils::time::EventWindow;
use async_trait::async_trait;

/// Operations the facade needs from a calendar provider
#[async_trait]
pub trait CalendarBackend: Send + Sync + 'static {
    /// Fetch the provider's color palette
    async fn colors(&self) -> CalendarResult<ColorPalette>;

    /// List single (expanded) non-deleted events inside the window, ordered by start time
    async fn list_events(&self, window: &EventWindow) -> CalendarResult<Vec<ProviderEvent>>;

    /// Fetch one event as the provider stores it
    async fn get_event(&self, event_id: &str) -> CalendarResult<ProviderEvent>;

    /// Insert a new event, returning only its id
    async fn insert_event(&self, event: &EventPatch) -> CalendarResult<EventId>;

    /// Patch the set fields of an existing event, returning only its id
    async fn patch_event(&self, event_id: &str, event: &EventPatch) -> CalendarResult<EventId>;

    /// Delete an event
    async fn delete_event(&self, event_id: &str) -> CalendarResult<()>;
}
