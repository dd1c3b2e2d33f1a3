//! Wiring collaborators from configuration.
//!
//! Each collaborator has a local stand-in, so the application runs with no
//! environment at all:
//!
//! | Collaborator | Configured                       | Otherwise                 |
//! |--------------|----------------------------------|---------------------------|
//! | Auth         | `AUTH_URL` + `AUTH_ANON_KEY`     | [`InMemoryAuthProvider`]  |
//! | Search       | `ANTHROPIC_API_KEY`              | fallback offers only      |
//! | Bookings     | `DATABASE_URL`                   | [`InMemoryBookingStore`]  |

use crate::app::{AppEnvironment, RailConnectApp};
use crate::auth::{AuthProvider, HostedAuthClient, InMemoryAuthProvider};
use crate::bookings::{BookingStore, BookingStoreError, InMemoryBookingStore, PostgresBookingStore};
use crate::config::Config;
use crate::payment::PaymentSimulator;
use crate::search::{ClaudeTrainGenerator, TrainSearch};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,railconnect=debug,sqlx=warn";

/// Install the global tracing subscriber
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn auth_provider(config: &Config) -> Arc<dyn AuthProvider> {
    match (&config.auth.url, &config.auth.anon_key) {
        (Some(url), Some(anon_key)) => {
            info!(%url, "Using hosted auth");
            Arc::new(HostedAuthClient::new(url.clone(), anon_key.clone()))
        }
        _ if config.auth.require_email_confirmation => {
            info!("Using in-memory auth with email confirmation");
            Arc::new(InMemoryAuthProvider::with_email_confirmation())
        }
        _ => {
            info!("Using in-memory auth");
            Arc::new(InMemoryAuthProvider::new())
        }
    }
}

fn train_search(config: &Config) -> TrainSearch {
    match &config.search.api_key {
        Some(api_key) => {
            info!(model = %config.search.model, "Using LLM train search");
            if !config.search_fits_response_timeout() {
                warn!(
                    search_timeout = ?config.search_timeout(),
                    response_timeout = ?config.response_timeout(),
                    "Searches may time out before the generator gives up"
                );
            }
            let generator = ClaudeTrainGenerator::new(api_key.clone())
                .with_api_url(config.search.api_url.clone())
                .with_model(config.search.model.clone())
                .with_max_tokens(config.search.max_tokens)
                .with_request_timeout(config.search_timeout());
            TrainSearch::new(Arc::new(generator))
        }
        None => {
            info!("No ANTHROPIC_API_KEY, serving fallback trains");
            TrainSearch::fallback_only().with_fallback_delay(config.fallback_delay())
        }
    }
}

async fn booking_store(config: &Config) -> Result<Arc<dyn BookingStore>, BookingStoreError> {
    let Some(url) = &config.database.url else {
        info!("No DATABASE_URL, keeping bookings in memory");
        return Ok(Arc::new(InMemoryBookingStore::new()));
    };

    info!("Connecting to booking database...");
    let store = PostgresBookingStore::connect(url, config.database.max_connections, config.connect_timeout()).await?;
    store.migrate().await?;
    info!("Booking database ready");
    Ok(Arc::new(store))
}

/// Build the environment described by `config`
///
/// # Errors
///
/// Returns a [`BookingStoreError`] if `DATABASE_URL` is set but the database
/// cannot be reached or migrated.
pub async fn build_environment(config: &Config) -> Result<AppEnvironment, BookingStoreError> {
    let bookings = booking_store(config).await?;
    Ok(
        AppEnvironment::new(auth_provider(config), train_search(config), bookings)
            .with_payments(PaymentSimulator::new(config.payment_delay())),
    )
}

/// Build the application described by `config`
///
/// # Errors
///
/// See [`build_environment`].
pub async fn build_app(config: &Config) -> Result<RailConnectApp, BookingStoreError> {
    let environment = build_environment(config).await?;
    Ok(RailConnectApp::new(environment).with_response_timeout(config.response_timeout()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn empty_config_builds_local_collaborators() {
        let mut config = Config::default();
        config.payment.processing_delay_ms = 10;

        let env = build_environment(&config).await.unwrap();

        assert!(!env.search.has_generator());
        assert_eq!(env.payments.processing_delay(), Duration::from_millis(10));
        assert!(env.auth.current().is_none());
    }

    #[tokio::test]
    async fn api_key_enables_generator() {
        let mut config = Config::default();
        config.search.api_key = Some("sk-test".to_string());

        let env = build_environment(&config).await.unwrap();

        assert!(env.search.has_generator());
    }
}
