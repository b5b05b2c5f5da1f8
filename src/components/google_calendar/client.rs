use super::models::{ColorPalette, EventId, EventPatch, EventsPage, ProviderEvent};
use super::token::TokenManager;
use super::CalendarBackend;
use crate::config::Config;
use crate::error::{google_calendar_error, CalendarResult};
use crate::utils::time::EventWindow;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Fields requested for month listings
const LIST_FIELDS: &str =
    "items(id,attendees,colorId,creator,description,location,updated,start,summary),nextPageToken";

/// Google Calendar v3 REST client bound to one calendar
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    base_url: Url,
    calendar_id: String,
    token_manager: TokenManager,
}

impl GoogleCalendarClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> CalendarResult<Self> {
        let client = Client::new();
        let token_manager = TokenManager::new(config, client.clone())?;
        Self::with_token_manager(
            &config.google_api_base,
            &config.google_calendar_id,
            client,
            token_manager,
        )
    }

    /// Create a client against an explicit API base URL
    pub fn with_token_manager(
        base_url: &str,
        calendar_id: &str,
        client: Client,
        token_manager: TokenManager,
    ) -> CalendarResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(google_calendar_error(&format!(
                "API base cannot hold paths: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            calendar_id: calendar_id.to_string(),
            token_manager,
        })
    }

    /// Build `{base}/<segments...>` with each segment percent-encoded
    fn url(&self, segments: &[&str]) -> CalendarResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("API base cannot hold paths"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn events_url(&self, event_id: Option<&str>) -> CalendarResult<Url> {
        match event_id {
            Some(id) => self.url(&["calendars", self.calendar_id.as_str(), "events", id]),
            None => self.url(&["calendars", self.calendar_id.as_str(), "events"]),
        }
    }

    async fn request(&self, method: Method, url: Url) -> CalendarResult<RequestBuilder> {
        let access_token = self.token_manager.access_token().await?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", access_token)))
    }

    /// Send a request and fail on non-success statuses
    async fn send(request: RequestBuilder, action: &str) -> CalendarResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to {}: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to {}: HTTP {} - {}",
                action, status, error_body
            )));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder, action: &str) -> CalendarResult<T> {
        Self::send(request, action)
            .await?
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendarClient {
    async fn colors(&self) -> CalendarResult<ColorPalette> {
        let url = self.url(&["colors"])?;
        let request = self.request(Method::GET, url).await?;
        Self::send_json(request, "fetch colors").await
    }

    async fn list_events(&self, window: &EventWindow) -> CalendarResult<Vec<ProviderEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.events_url(None)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &window.start)
                    .append_pair("timeMax", &window.end)
                    .append_pair("singleEvents", "true")
                    .append_pair("showDeleted", "false")
                    .append_pair("orderBy", "startTime")
                    .append_pair("fields", LIST_FIELDS);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let request = self.request(Method::GET, url).await?;
            let page: EventsPage = Self::send_json(request, "fetch events").await?;
            debug!("Fetched {} events", page.items.len());
            events.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(events)
    }

    async fn get_event(&self, event_id: &str) -> CalendarResult<ProviderEvent> {
        let url = self.events_url(Some(event_id))?;
        let request = self.request(Method::GET, url).await?;
        Self::send_json(request, "fetch event").await
    }

    async fn insert_event(&self, event: &EventPatch) -> CalendarResult<EventId> {
        let mut url = self.events_url(None)?;
        url.query_pairs_mut().append_pair("fields", "id");
        let request = self.request(Method::POST, url).await?.json(event);
        Self::send_json(request, "insert event").await
    }

    async fn patch_event(&self, event_id: &str, event: &EventPatch) -> CalendarResult<EventId> {
        let mut url = self.events_url(Some(event_id))?;
        url.query_pairs_mut().append_pair("fields", "id");
        let request = self.request(Method::PATCH, url).await?.json(event);
        Self::send_json(request, "update event").await
    }

    async fn delete_event(&self, event_id: &str) -> CalendarResult<()> {
        let url = self.events_url(Some(event_id))?;
        let request = self.request(Method::DELETE, url).await?;
        Self::send(request, "delete event").await?;
        Ok(())
    }
}
