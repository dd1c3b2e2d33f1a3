//! Train generator backed by the Anthropic Messages API.

use super::{GeneratorError, SearchQuery, TrainGenerator};
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Default limit on one generation request
///
/// Kept below the facade's default response timeout so a slow generation
/// falls back to fixed results instead of timing the caller out.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

const SYSTEM_PROMPT: &str = "You are a railway timetable service for Indian Railways. \
Reply with a single JSON array and nothing else.";

/// Generates realistic train listings with Claude
#[derive(Clone)]
pub struct ClaudeTrainGenerator {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
    request_timeout: Duration,
}

impl ClaudeTrainGenerator {
    /// Create a generator with an explicit API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create a generator with the key from `ANTHROPIC_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::MissingApiKey`] if the variable is unset or blank.
    pub fn from_env() -> Result<Self, GeneratorError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GeneratorError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the response token limit
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the per-request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn request(self, prompt: String) -> Result<String, GeneratorError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<MessagesResponse>()
                    .await
                    .map_err(|e| GeneratorError::ResponseParseFailed(e.to_string()))?;

                let text: String = body
                    .content
                    .into_iter()
                    .filter(|block| block.kind == "text")
                    .map(|block| block.text)
                    .collect();

                if text.trim().is_empty() {
                    return Err(GeneratorError::ResponseParseFailed(
                        "reply had no text content".to_string(),
                    ));
                }
                Ok(text)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(GeneratorError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(GeneratorError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(GeneratorError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}

impl std::fmt::Debug for ClaudeTrainGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeTrainGenerator")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl TrainGenerator for ClaudeTrainGenerator {
    fn generate(&self, query: &SearchQuery) -> BoxFuture<'static, Result<String, GeneratorError>> {
        let prompt = build_prompt(query);
        tracing::debug!(
            origin = %query.origin,
            destination = %query.destination,
            model = %self.model,
            "Requesting generated trains"
        );
        Box::pin(self.clone().request(prompt))
    }
}

/// The user prompt for a query
#[must_use]
pub fn build_prompt(query: &SearchQuery) -> String {
    format!(
        "Generate a list of 5 realistic trains traveling from {origin} to {destination} on {date}.\n\
         Include a mix of express and local trains.\n\
         For each train, provide realistic availability for the classes \
         \"Sleeper (SL)\", \"AC 3 Tier (3A)\", \"AC 2 Tier (2A)\" and \"AC First Class (1A)\".\n\
         Prices are whole Indian rupees.\n\n\
         Each array element must have exactly these fields:\n\
         trainNumber (string), trainName (string), source (string), destination (string), \
         departureTime (24h HH:MM), arrivalTime (24h HH:MM), duration (e.g. \"12h 30m\"), \
         availability (array of {{ type, available (integer), price (integer), \
         status (\"AVAILABLE\" | \"RAC\" | \"WAITLIST\") }}).",
        origin = query.origin,
        destination = query.destination,
        date = query.date.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn prompt_names_route_date_and_schema() {
        let query = SearchQuery::parse("New Delhi", "Mumbai Central", "2024-06-15").unwrap();
        let prompt = build_prompt(&query);

        assert!(prompt.contains("from New Delhi to Mumbai Central on 2024-06-15"));
        assert!(prompt.contains("AC First Class (1A)"));
        assert!(prompt.contains("availability (array of { type"));
    }

    #[test]
    fn builder_overrides() {
        let generator = ClaudeTrainGenerator::new("sk-test-secret")
            .with_api_url("http://localhost:9000/v1/")
            .with_model("claude-haiku")
            .with_max_tokens(512);

        assert_eq!(generator.api_url, "http://localhost:9000/v1");
        assert_eq!(generator.model, "claude-haiku");
        assert_eq!(generator.max_tokens, 512);
        assert!(!format!("{generator:?}").contains("sk-test-secret"));
    }
}
