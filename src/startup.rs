use crate::components::google_calendar::{CalendarBackend, GoogleCalendarClient};
use crate::config::Config;
use crate::error::Error;
use crate::handlers::{router, AppState};
use crate::shutdown;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Build the handler state around the Google Calendar client
pub fn build_state(config: &Config) -> miette::Result<AppState> {
    let client = GoogleCalendarClient::new(config)?;
    let backend: Arc<dyn CalendarBackend> = Arc::new(client);

    info!(
        "Using calendar {} in timezone {}",
        config.google_calendar_id, config.timezone
    );

    Ok(AppState::from_config(config, backend)?)
}

/// Bind the listener and serve until a shutdown signal arrives
pub async fn start_server(config: Config) -> miette::Result<()> {
    let state = build_state(&config)?;
    let app = router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(Error::from)?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Server shut down");
    Ok(())
}
