// Export components
pub mod google_calendar;

// Re-export the backend seam and its implementations
pub use google_calendar::{CalendarBackend, GoogleCalendarClient, InMemoryCalendar};
