//! Train search.
//!
//! Results come from a [`TrainGenerator`] when one is configured and
//! produces at least one valid offer; otherwise the fixed
//! [`fallback::fallback_offers`] are served. Search never fails: the
//! source is reported in [`SearchResults::source`] and logged.

pub mod fallback;
pub mod generator;
pub mod validate;

pub use generator::ClaudeTrainGenerator;

use crate::types::TrainOffer;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Invalid search input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// A field was blank
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The date is not `YYYY-MM-DD`
    #[error("Invalid travel date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Train generator failures. Never surfaced to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// No API key configured
    #[error("Generator API key not configured")]
    MissingApiKey,

    /// Network error
    #[error("Generator request failed: {0}")]
    RequestFailed(String),

    /// Rate limited (429)
    #[error("Generator rate limited")]
    RateLimited,

    /// Bad API key (401)
    #[error("Generator rejected the API key")]
    Unauthorized,

    /// Any other non-success status
    #[error("Generator API error ({status}): {message}")]
    ApiError {
        /// HTTP status
        status: u16,
        /// Response body
        message: String,
    },

    /// The reply was not the expected JSON
    #[error("Failed to parse generator response: {0}")]
    ResponseParseFailed(String),

    /// The reply parsed but contained no usable train
    #[error("Generator returned no valid train offers")]
    NoValidOffers,
}

/// A validated search request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    /// Origin station
    pub origin: String,
    /// Destination station
    pub destination: String,
    /// Date of travel
    pub date: NaiveDate,
}

impl SearchQuery {
    /// Trims and validates raw form input
    ///
    /// # Errors
    ///
    /// - [`SearchError::MissingField`] if any field is blank
    /// - [`SearchError::InvalidDate`] if the date is not `YYYY-MM-DD`
    pub fn parse(origin: &str, destination: &str, date: &str) -> Result<Self, SearchError> {
        let origin = origin.trim();
        let destination = destination.trim();
        let date = date.trim();

        if origin.is_empty() {
            return Err(SearchError::MissingField("origin"));
        }
        if destination.is_empty() {
            return Err(SearchError::MissingField("destination"));
        }
        if date.is_empty() {
            return Err(SearchError::MissingField("date"));
        }

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| SearchError::InvalidDate(date.to_string()))?;

        Ok(Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date,
        })
    }
}

/// Where a result list came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultSource {
    /// Produced by the train generator
    Generated,
    /// The static fallback set
    Fallback,
}

/// Ordered search results
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResults {
    /// Offers in the order they were produced
    pub offers: Vec<TrainOffer>,
    /// Origin of the offers
    pub source: ResultSource,
}

/// Produces raw train listings for a query
///
/// Implementations return the model's text unparsed; [`TrainSearch`]
/// validates it.
pub trait TrainGenerator: Send + Sync {
    /// Generate a raw JSON listing
    fn generate(&self, query: &SearchQuery) -> BoxFuture<'static, Result<String, GeneratorError>>;
}

/// Search front: optional generator plus fallback
#[derive(Clone)]
pub struct TrainSearch {
    generator: Option<Arc<dyn TrainGenerator>>,
    fallback_delay: Duration,
}

impl TrainSearch {
    /// Search backed by a generator
    #[must_use]
    pub fn new(generator: Arc<dyn TrainGenerator>) -> Self {
        Self {
            generator: Some(generator),
            fallback_delay: Duration::ZERO,
        }
    }

    /// Search that always serves the fallback set
    #[must_use]
    pub const fn fallback_only() -> Self {
        Self {
            generator: None,
            fallback_delay: Duration::ZERO,
        }
    }

    /// Simulated latency when no generator is configured
    #[must_use]
    pub const fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Whether a generator is configured
    #[must_use]
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Run a search
    pub async fn search(&self, query: &SearchQuery) -> SearchResults {
        if let Some(generator) = &self.generator {
            match generate_offers(generator.as_ref(), query).await {
                Ok(offers) => {
                    tracing::info!(
                        origin = %query.origin,
                        destination = %query.destination,
                        count = offers.len(),
                        "Search served generated offers"
                    );
                    return SearchResults {
                        offers,
                        source: ResultSource::Generated,
                    };
                }
                Err(error) => {
                    tracing::warn!(%error, "Train generator failed, serving fallback offers");
                }
            }
        } else {
            tracing::debug!("No train generator configured");
            if !self.fallback_delay.is_zero() {
                tokio::time::sleep(self.fallback_delay).await;
            }
        }

        metrics::counter!("railconnect.search.fallback").increment(1);
        SearchResults {
            offers: fallback::fallback_offers(),
            source: ResultSource::Fallback,
        }
    }
}

impl std::fmt::Debug for TrainSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainSearch")
            .field("generator", &self.generator.is_some())
            .field("fallback_delay", &self.fallback_delay)
            .finish()
    }
}

async fn generate_offers(
    generator: &dyn TrainGenerator,
    query: &SearchQuery,
) -> Result<Vec<TrainOffer>, GeneratorError> {
    let raw = generator.generate(query).await?;
    validate::parse_offers(&raw)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    struct CannedGenerator(Result<String, GeneratorError>);

    impl TrainGenerator for CannedGenerator {
        fn generate(&self, _query: &SearchQuery) -> BoxFuture<'static, Result<String, GeneratorError>> {
            let reply = self.0.clone();
            Box::pin(async move { reply })
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::parse("New Delhi", "Mumbai Central", "2024-06-15").unwrap()
    }

    fn numbers(results: &SearchResults) -> Vec<&str> {
        results.offers.iter().map(|o| o.number.as_str()).collect()
    }

    #[test]
    fn parse_trims_and_validates() {
        let q = SearchQuery::parse("  New Delhi ", "Mumbai Central", "2024-06-15").unwrap();
        assert_eq!(q.origin, "New Delhi");
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());

        assert_eq!(
            SearchQuery::parse("", "Mumbai", "2024-06-15"),
            Err(SearchError::MissingField("origin"))
        );
        assert_eq!(
            SearchQuery::parse("Delhi", "Mumbai", "15/06/2024"),
            Err(SearchError::InvalidDate("15/06/2024".to_string()))
        );
    }

    #[tokio::test]
    async fn without_generator_serves_fallback() {
        let results = TrainSearch::fallback_only().search(&query()).await;
        assert_eq!(results.source, ResultSource::Fallback);
        assert_eq!(numbers(&results), ["12951", "12903", "22221"]);
    }

    #[tokio::test]
    async fn generator_failure_serves_fallback() {
        let search = TrainSearch::new(Arc::new(CannedGenerator(Err(GeneratorError::RateLimited))));
        let results = search.search(&query()).await;
        assert_eq!(results.source, ResultSource::Fallback);
        assert_eq!(results.offers.len(), 3);
    }

    #[tokio::test]
    async fn unusable_reply_serves_fallback() {
        let search = TrainSearch::new(Arc::new(CannedGenerator(Ok("[]".to_string()))));
        assert_eq!(search.search(&query()).await.source, ResultSource::Fallback);
    }

    #[tokio::test]
    async fn valid_reply_is_returned_in_order() {
        let reply = serde_json::json!([
            {
                "trainNumber": "12002", "trainName": "Shatabdi Express",
                "source": "New Delhi", "destination": "Mumbai Central",
                "departureTime": "06:00", "arrivalTime": "14:00", "duration": "8h 0m",
                "availability": [{ "type": "AC 2 Tier (2A)", "available": 10, "price": 2100, "status": "AVAILABLE" }]
            },
            {
                "trainNumber": "11077", "trainName": "Jhelum Express",
                "source": "New Delhi", "destination": "Mumbai Central",
                "departureTime": "21:10", "arrivalTime": "19:45", "duration": "22h 35m",
                "availability": [{ "type": "Sleeper (SL)", "available": 0, "price": 540, "status": "WAITLIST" }]
            }
        ]);
        let search = TrainSearch::new(Arc::new(CannedGenerator(Ok(reply.to_string()))));

        let results = search.search(&query()).await;
        assert_eq!(results.source, ResultSource::Generated);
        assert_eq!(numbers(&results), ["12002", "11077"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_delay_applies_without_generator() {
        let search = TrainSearch::fallback_only().with_fallback_delay(Duration::from_millis(1500));
        let started = tokio::time::Instant::now();
        let results = search.search(&query()).await;
        assert_eq!(results.source, ResultSource::Fallback);
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
