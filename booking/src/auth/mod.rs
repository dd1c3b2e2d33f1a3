//! Authentication and session tracking.
//!
//! An [`AuthProvider`] signs users up, in and out, and publishes the current
//! identity on a watch channel. The application forwards that channel into
//! the store, so the reducer never reads session state directly.

pub mod hosted;
pub mod memory;
pub mod session;

pub use hosted::HostedAuthClient;
pub use memory::InMemoryAuthProvider;
pub use session::SessionHolder;

use crate::types::Identity;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authentication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email is not plausibly an address
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password too short
    #[error("Password must be at least {min} characters")]
    WeakPassword {
        /// Minimum length
        min: usize,
    },

    /// An account already exists for the email
    #[error("An account with this email already exists")]
    EmailTaken,

    /// Wrong email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Sign-in before the confirmation link was followed
    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    /// No account for the email
    #[error("No account found for {0}")]
    UnknownAccount(String),

    /// Network error talking to the auth backend
    #[error("Auth request failed: {0}")]
    RequestFailed(String),

    /// The auth backend refused the request
    #[error("Auth backend error ({status}): {message}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Backend message
        message: String,
    },

    /// The auth backend answered with an unexpected body
    #[error("Failed to parse auth response: {0}")]
    ResponseParseFailed(String),
}

/// Result of a sign-up
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Signed in immediately
    Session(Identity),
    /// Account created; the user must confirm the email before signing in
    PendingVerification {
        /// Address the confirmation was sent to
        email: String,
    },
}

/// Auth collaborator
pub trait AuthProvider: Send + Sync {
    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] describing why the account was not created.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> BoxFuture<'static, Result<SignUpOutcome, AuthError>>;

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the credentials are refused.
    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'static, Result<Identity, AuthError>>;

    /// End the session
    ///
    /// The local session is cleared even when the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the backend could not be told.
    fn sign_out(&self) -> BoxFuture<'static, Result<(), AuthError>>;

    /// Identity changes, starting with the current value
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// The current identity, if signed in
    fn current(&self) -> Option<Identity>;
}

/// Lowercased, trimmed email, or an error if it cannot be an address
pub(crate) fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(email)
        }
        _ => Err(AuthError::InvalidEmail),
    }
}

/// Rejects passwords shorter than [`MIN_PASSWORD_LEN`]
pub(crate) fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}
