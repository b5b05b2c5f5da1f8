use crate::config::Config;
use crate::error::{google_calendar_error, CalendarResult};
use chrono::Utc;
use redis::{AsyncCommands, Client as RedisClient};
use reqwest::Client;
use serde_json::{json, Value};

/// Redis key holding the serialized OAuth token
pub const TOKEN_KEY: &str = "google_calendar_token";

#[derive(Clone)]
enum TokenSource {
    /// Fixed bearer token from configuration
    Static(String),
    /// Token JSON stored in Redis, refreshed when expired
    Redis {
        redis: RedisClient,
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}

#[derive(Clone)]
pub struct TokenManager {
    source: TokenSource,
    client: Client,
}

impl TokenManager {
    /// Create a token manager from configuration
    pub fn new(config: &Config, client: Client) -> CalendarResult<Self> {
        if let Some(token) = &config.google_access_token {
            return Ok(Self::with_static_token(token, client));
        }

        let redis = RedisClient::open(config.redis_url.as_str())
            .map_err(|e| google_calendar_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            source: TokenSource::Redis {
                redis,
                client_id: config.google_client_id.clone(),
                client_secret: config.google_client_secret.clone(),
                token_url: config.google_token_url.clone(),
            },
            client,
        })
    }

    /// Token manager that always hands out the same access token
    pub fn with_static_token(token: &str, client: Client) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            client,
        }
    }

    /// Current access token, refreshing it first if it has expired
    pub async fn access_token(&self) -> CalendarResult<String> {
        let token = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Redis { .. } => self.get_token().await?,
        };

        token
            .get("access_token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| google_calendar_error("No access token available"))
    }

    /// Get OAuth token from Redis, refreshing it when expired
    async fn get_token(&self) -> CalendarResult<Value> {
        let TokenSource::Redis { redis, .. } = &self.source else {
            return Err(google_calendar_error("Token store is not configured"));
        };

        let mut redis_conn = redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to connect to Redis: {}", e)))?;

        let token_str: Option<String> = redis_conn
            .get(TOKEN_KEY)
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to read token from Redis: {}", e)))?;

        let Some(token_str) = token_str else {
            return Err(google_calendar_error(
                "No valid token found. Run get_calendar_token to authorize.",
            ));
        };

        let token: Value = serde_json::from_str(&token_str)
            .map_err(|e| google_calendar_error(&format!("Failed to parse token JSON: {}", e)))?;

        match token.get("expires_at").and_then(|v| v.as_i64()) {
            Some(expiry) if expiry > Utc::now().timestamp() => Ok(token),
            _ => self.refresh_token(&token).await,
        }
    }

    /// Refresh an expired token and store the result
    async fn refresh_token(&self, token: &Value) -> CalendarResult<Value> {
        let TokenSource::Redis {
            client_id,
            client_secret,
            token_url,
            ..
        } = &self.source
        else {
            return Err(google_calendar_error("Token store is not configured"));
        };

        let refresh_token = token
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| google_calendar_error("No refresh token in token data"))?;

        let params = [
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let new_token: Value = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse token response: {}", e)))?;

        let access_token = new_token
            .get("access_token")
            .cloned()
            .ok_or_else(|| google_calendar_error("Token response missing 'access_token' field"))?;

        let expires_in = new_token
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);

        let token_json = json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "expires_at": Utc::now().timestamp() + expires_in,
        });

        self.set_token(&token_json).await?;

        Ok(token_json)
    }

    /// Store a token in Redis (used by the authorization helper)
    pub async fn set_token(&self, token_json: &Value) -> CalendarResult<()> {
        let TokenSource::Redis { redis, .. } = &self.source else {
            return Err(google_calendar_error("Token store is not configured"));
        };

        let mut redis_conn = redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to connect to Redis: {}", e)))?;

        redis_conn
            .set::<_, _, ()>(TOKEN_KEY, token_json.to_string())
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to save token to Redis: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let manager = TokenManager::with_static_token("ya29.static", Client::new());
        assert_eq!(manager.access_token().await.unwrap(), "ya29.static");
    }

    #[tokio::test]
    async fn test_static_token_cannot_be_stored() {
        let manager = TokenManager::with_static_token("ya29.static", Client::new());
        assert!(manager.set_token(&json!({ "access_token": "x" })).await.is_err());
    }
}
