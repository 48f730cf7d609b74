//! Core configuration loaded from environment variables.
//!
//! The mobile shell embeds this crate and usually injects these values at
//! build time; for development and tests a `.env` file works as well.

use std::env;

/// Configuration for the session & notification core, loaded once at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the Bookline API (e.g. `https://api.bookline.app`)
    pub api_base_url: String,
    /// Prefix applied to every persisted key, isolating this app's state
    pub storage_scope: String,
    /// Default minutes before a booking that its reminder fires
    pub default_reminder_lead_minutes: i64,
    /// How often the badge count is resynchronized while foregrounded
    pub badge_poll_interval_secs: u64,
    /// HTTP request timeout handed to the transport
    pub http_timeout_secs: u64,
}

impl Default for CoreConfig {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            storage_scope: "bookline".to_string(),
            default_reminder_lead_minutes: 60,
            badge_poll_interval_secs: 300,
            http_timeout_secs: 30,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            api_base_url: env::var("BOOKLINE_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("BOOKLINE_API_URL"))?,
            storage_scope: env::var("BOOKLINE_STORAGE_SCOPE")
                .unwrap_or_else(|_| "bookline".to_string()),
            default_reminder_lead_minutes: env::var("BOOKLINE_REMINDER_LEAD_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            badge_poll_interval_secs: env::var("BOOKLINE_BADGE_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            http_timeout_secs: env::var("BOOKLINE_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
