use crate::error::{config_error, env_error, CalendarResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Default location of the optional server configuration file
pub const CONFIG_FILE: &str = "config/server.toml";

pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
pub const DEFAULT_TIMEZONE: &str = "UTC";
/// Google's default calendar blue, used when an event color has no palette entry
pub const DEFAULT_EVENT_COLOR: &str = "#039be5";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google Calendar API client ID
    pub google_client_id: String,
    /// Google Calendar API client secret
    pub google_client_secret: String,
    /// Static access token, skips the Redis token store when set
    pub google_access_token: Option<String>,
    /// Google Calendar ID to operate on
    pub google_calendar_id: String,
    /// Base URL of the Calendar v3 REST API
    pub google_api_base: String,
    /// OAuth token endpoint used for refreshing
    pub google_token_url: String,
    /// Redis connection holding the OAuth token
    pub redis_url: String,
    /// Timezone for month windows and all-day dates
    pub timezone: String,
    /// Background color for events missing from the palette
    pub default_event_color: String,
    /// Address to listen on
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
}

/// Optional values read from `config/server.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub calendar_id: Option<String>,
    pub api_base: Option<String>,
    pub token_url: Option<String>,
    pub redis_url: Option<String>,
    pub timezone: Option<String>,
    pub default_event_color: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

impl FileConfig {
    /// Parse the TOML contents of a config file
    pub fn parse(content: &str) -> CalendarResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> CalendarResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let file = match fs::read_to_string(CONFIG_FILE) {
            Ok(content) => FileConfig::parse(&content)?,
            Err(_) => FileConfig::default(),
        };

        Self::from_sources(|key| env::var(key).ok(), file)
    }

    /// Build a configuration from a variable lookup, falling back to file values and defaults
    pub fn from_sources<F>(lookup: F, file: FileConfig) -> CalendarResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let google_access_token = var("GOOGLE_ACCESS_TOKEN");

        // OAuth credentials are only needed when tokens come from Redis
        let (google_client_id, google_client_secret) = if google_access_token.is_some() {
            (
                var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            )
        } else {
            (
                var("GOOGLE_CLIENT_ID").ok_or_else(|| env_error("GOOGLE_CLIENT_ID"))?,
                var("GOOGLE_CLIENT_SECRET").ok_or_else(|| env_error("GOOGLE_CLIENT_SECRET"))?,
            )
        };

        let port = match var("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| config_error(&format!("Invalid PORT value: {}", p)))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let config = Config {
            google_client_id,
            google_client_secret,
            google_access_token,
            google_calendar_id: var("GOOGLE_CALENDAR_ID")
                .or(file.calendar_id)
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            google_api_base: var("GOOGLE_API_BASE")
                .or(file.api_base)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            google_token_url: var("GOOGLE_TOKEN_URL")
                .or(file.token_url)
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            redis_url: var("REDIS_URL")
                .or(file.redis_url)
                .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            timezone: var("TIMEZONE")
                .or(file.timezone)
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            default_event_color: var("DEFAULT_EVENT_COLOR")
                .or(file.default_event_color)
                .unwrap_or_else(|| DEFAULT_EVENT_COLOR.to_string()),
            bind_address: var("BIND_ADDRESS")
                .or(file.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port,
        };

        // Fail at startup rather than on the first request
        config.tz()?;

        Ok(config)
    }

    /// Parse the configured timezone
    pub fn tz(&self) -> CalendarResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }

    /// Socket address string for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
