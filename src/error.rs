use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(kalenteri::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(kalenteri::config))]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(kalenteri::google_calendar))]
    GoogleCalendar(String),

    #[error("invalid request, {0}")]
    #[diagnostic(code(kalenteri::invalid_input))]
    InvalidInput(String),

    #[error("invalid request, missing {0}")]
    #[diagnostic(code(kalenteri::missing_parameter))]
    MissingParameter(&'static str),

    #[error("invalid method: {0}")]
    #[diagnostic(code(kalenteri::method_not_allowed))]
    MethodNotAllowed(String),

    #[error("invalid request body: {0}")]
    #[diagnostic(code(kalenteri::decode))]
    Decode(String),

    #[error(transparent)]
    #[diagnostic(code(kalenteri::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(kalenteri::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(kalenteri::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type CalendarResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
