//! Configuration management for the booking application.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Optional collaborators (LLM search, hosted auth, `PostgreSQL`) are only
//! wired in when their variables are present.

use crate::search::generator::{DEFAULT_API_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Train search
    pub search: SearchConfig,
    /// Authentication backend
    pub auth: AuthConfig,
    /// Booking database
    pub database: DatabaseConfig,
    /// Payment simulator
    pub payment: PaymentConfig,
    /// Facade behaviour
    pub app: AppConfig,
}

/// Train search configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Anthropic API key; `None` means fallback results only
    pub api_key: Option<String>,
    /// Messages API base URL
    pub api_url: String,
    /// Model name
    pub model: String,
    /// Response token limit
    pub max_tokens: u32,
    /// Limit on one generation request in seconds
    pub request_timeout: u64,
    /// Simulated latency of the fallback path in milliseconds
    pub fallback_delay_ms: u64,
}

/// Authentication configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Hosted auth base URL
    pub url: Option<String>,
    /// Hosted auth anonymous key
    pub anon_key: Option<String>,
    /// In-memory auth: require `confirm_email` before sign-in
    pub require_email_confirmation: bool,
}

/// Booking database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL; `None` keeps bookings in memory
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Payment simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Processing delay in milliseconds
    pub processing_delay_ms: u64,
}

/// Facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// How long request/response calls wait for a reply, in seconds
    pub response_timeout: u64,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn non_blank(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            search: SearchConfig {
                api_key: non_blank("ANTHROPIC_API_KEY"),
                api_url: env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
                model: env::var("SEARCH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                max_tokens: parsed("SEARCH_MAX_TOKENS", 4096),
                request_timeout: parsed("SEARCH_REQUEST_TIMEOUT_SECS", 25),
                fallback_delay_ms: parsed("SEARCH_FALLBACK_DELAY_MS", 1500),
            },
            auth: AuthConfig {
                url: non_blank("AUTH_URL"),
                anon_key: non_blank("AUTH_ANON_KEY"),
                require_email_confirmation: parsed("AUTH_REQUIRE_EMAIL_CONFIRMATION", false),
            },
            database: DatabaseConfig {
                url: non_blank("DATABASE_URL"),
                max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5),
                connect_timeout: parsed("DATABASE_CONNECT_TIMEOUT", 30),
            },
            payment: PaymentConfig {
                processing_delay_ms: parsed("PAYMENT_PROCESSING_DELAY_MS", 2500),
            },
            app: AppConfig {
                response_timeout: parsed("RESPONSE_TIMEOUT_SECS", 30),
            },
        }
    }

    /// Both hosted auth variables are set
    #[must_use]
    pub const fn uses_hosted_auth(&self) -> bool {
        self.auth.url.is_some() && self.auth.anon_key.is_some()
    }

    /// Fallback search latency
    #[must_use]
    pub const fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.search.fallback_delay_ms)
    }

    /// Generator request timeout
    #[must_use]
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.request_timeout)
    }

    /// Whether a generation can finish before the facade stops waiting
    #[must_use]
    pub const fn search_fits_response_timeout(&self) -> bool {
        self.search.request_timeout < self.app.response_timeout
    }

    /// Payment processing delay
    #[must_use]
    pub const fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment.processing_delay_ms)
    }

    /// Facade response timeout
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.app.response_timeout)
    }

    /// Database connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connect_timeout)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            request_timeout: 25,
            fallback_delay_ms: 1500,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            connect_timeout: 30,
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: 2500,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { response_timeout: 30 }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("fallback_delay_ms", &self.fallback_delay_ms)
            .finish()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "<redacted>"))
            .field("require_email_confirmation", &self.require_email_confirmation)
            .finish()
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.search.max_tokens, 4096);
        assert_eq!(config.fallback_delay(), Duration::from_millis(1500));
        assert_eq!(config.payment_delay(), Duration::from_millis(2500));
        assert_eq!(config.response_timeout(), Duration::from_secs(30));
        assert_eq!(config.search_timeout(), Duration::from_secs(25));
        assert!(config.search_fits_response_timeout());
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.uses_hosted_auth());
    }

    #[test]
    fn hosted_auth_needs_both_variables() {
        let mut config = Config::default();
        config.auth.url = Some("https://auth.example.com".to_string());
        assert!(!config.uses_hosted_auth());
        config.auth.anon_key = Some("anon".to_string());
        assert!(config.uses_hosted_auth());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = Config::default();
        config.search.api_key = Some("sk-live-123".to_string());
        config.database.url = Some("postgres://user:hunter2@db/rail".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-live-123"));
        assert!(!rendered.contains("hunter2"));
    }
}
