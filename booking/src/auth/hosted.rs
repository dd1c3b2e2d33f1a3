//! Client for a hosted GoTrue-compatible auth service.
//!
//! Uses the password grant and keeps the access token in memory only.

use super::{AuthError, AuthProvider, SessionHolder, SignUpOutcome, check_password, normalize_email};
use crate::types::{Identity, UserId};
use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Deserialize)]
struct SessionPayload {
    access_token: String,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize, Default)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,
}

/// Sign-up returns a session when auto-confirm is on, a bare user otherwise
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpPayload {
    Session(SessionPayload),
    User(UserPayload),
}

#[derive(Deserialize, Default)]
struct ErrorPayload {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl UserPayload {
    fn into_identity(self, fallback_email: &str) -> Identity {
        let email = self.email.unwrap_or_else(|| fallback_email.to_string());
        Identity::new(UserId::new(self.id), email, self.user_metadata.name.as_deref())
    }
}

/// Hosted auth client
#[derive(Clone)]
pub struct HostedAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
    session: SessionHolder,
    access_token: Arc<Mutex<Option<String>>>,
}

impl HostedAuthClient {
    /// Create a client for `base_url` using the project's anonymous key
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: SessionHolder::new(),
            access_token: Arc::new(Mutex::new(None)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn start_session(&self, payload: SessionPayload, email: &str) -> Identity {
        *self.access_token.lock().await = Some(payload.access_token);
        let identity = payload.user.into_identity(email);
        self.session.set(Some(identity.clone()));
        identity
    }
}

impl std::fmt::Debug for HostedAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedAuthClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

async fn rejection(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let payload: ErrorPayload = serde_json::from_str(&body).unwrap_or_default();
    let message = payload
        .error_description
        .or(payload.msg)
        .or(payload.message)
        .unwrap_or(body);

    let lowered = message.to_ascii_lowercase();
    if lowered.contains("not confirmed") {
        return AuthError::EmailNotConfirmed;
    }
    if lowered.contains("already registered") || lowered.contains("already exists") {
        return AuthError::EmailTaken;
    }
    match status {
        StatusCode::BAD_REQUEST if lowered.contains("invalid login") => AuthError::InvalidCredentials,
        _ => AuthError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn request_failed(error: &reqwest::Error) -> AuthError {
    AuthError::RequestFailed(error.to_string())
}

impl AuthProvider for HostedAuthClient {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> BoxFuture<'static, Result<SignUpOutcome, AuthError>> {
        let this = self.clone();
        let email = email.to_string();
        let password = password.to_string();
        let display_name = display_name.map(ToString::to_string);

        Box::pin(async move {
            let email = normalize_email(&email)?;
            check_password(&password)?;

            let response = this
                .client
                .post(this.url("signup"))
                .header("apikey", &this.anon_key)
                .json(&json!({
                    "email": email,
                    "password": password,
                    "data": { "name": display_name },
                }))
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            if !response.status().is_success() {
                return Err(rejection(response).await);
            }

            let payload = response
                .json::<SignUpPayload>()
                .await
                .map_err(|e| AuthError::ResponseParseFailed(e.to_string()))?;

            match payload {
                SignUpPayload::Session(session) => {
                    Ok(SignUpOutcome::Session(this.start_session(session, &email).await))
                }
                SignUpPayload::User(_) => {
                    tracing::info!(%email, "Sign-up pending email confirmation");
                    Ok(SignUpOutcome::PendingVerification { email })
                }
            }
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'static, Result<Identity, AuthError>> {
        let this = self.clone();
        let email = email.trim().to_string();
        let password = password.to_string();

        Box::pin(async move {
            let response = this
                .client
                .post(this.url("token?grant_type=password"))
                .header("apikey", &this.anon_key)
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            if !response.status().is_success() {
                return Err(rejection(response).await);
            }

            let session = response
                .json::<SessionPayload>()
                .await
                .map_err(|e| AuthError::ResponseParseFailed(e.to_string()))?;

            Ok(this.start_session(session, &email).await)
        })
    }

    fn sign_out(&self) -> BoxFuture<'static, Result<(), AuthError>> {
        let this = self.clone();

        Box::pin(async move {
            let token = this.access_token.lock().await.take();
            this.session.set(None);

            let Some(token) = token else {
                return Ok(());
            };

            let response = this
                .client
                .post(this.url("logout"))
                .header("apikey", &this.anon_key)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            if response.status().is_success() {
                Ok(())
            } else {
                let error = rejection(response).await;
                tracing::warn!(%error, "Remote sign-out failed; local session cleared");
                Err(error)
            }
        })
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.session.current()
    }
}
