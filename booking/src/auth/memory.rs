//! In-memory auth provider for development and tests.

use super::{
    check_password, normalize_email, AuthError, AuthProvider, SessionHolder, SignUpOutcome,
};
use crate::types::{Identity, UserId};
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Clone, Debug)]
struct Account {
    identity: Identity,
    password_digest: String,
    confirmed: bool,
}

/// Accounts keyed by lowercased email, passwords stored as email-keyed SHA-256
/// digests
#[derive(Clone, Debug)]
pub struct InMemoryAuthProvider {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    session: SessionHolder,
    require_confirmation: bool,
}

impl InMemoryAuthProvider {
    /// Provider that signs users in straight after sign-up
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            session: SessionHolder::new(),
            require_confirmation: false,
        }
    }

    /// Provider that requires [`InMemoryAuthProvider::confirm_email`] before
    /// the first sign-in
    #[must_use]
    pub fn with_email_confirmation() -> Self {
        Self {
            require_confirmation: true,
            ..Self::new()
        }
    }

    /// Mark an account's email as confirmed
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownAccount`] if no account uses the email.
    pub async fn confirm_email(&self, email: &str) -> Result<(), AuthError> {
        let key = normalize_email(email)?;
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&key)
            .ok_or_else(|| AuthError::UnknownAccount(key.clone()))?;
        account.confirmed = true;
        tracing::debug!(email = %key, "Email confirmed");
        Ok(())
    }

    /// Number of registered accounts
    pub async fn account_count(&self) -> usize {
        self.accounts.lock().await.len()
    }
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(email: &str, password: &str) -> String {
    let hash = Sha256::new()
        .chain_update(email.as_bytes())
        .chain_update(b":")
        .chain_update(password.as_bytes())
        .finalize();
    hash.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl AuthProvider for InMemoryAuthProvider {
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
            let key = normalize_email(&email)?;
            check_password(&password)?;

            let mut accounts = this.accounts.lock().await;
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailTaken);
            }

            let identity = Identity::new(
                UserId::new(uuid::Uuid::new_v4().to_string()),
                key.clone(),
                display_name.as_deref(),
            );
            accounts.insert(
                key.clone(),
                Account {
                    identity: identity.clone(),
                    password_digest: digest(&key, &password),
                    confirmed: !this.require_confirmation,
                },
            );
            drop(accounts);

            if this.require_confirmation {
                tracing::info!(email = %key, "Account created, awaiting email confirmation");
                return Ok(SignUpOutcome::PendingVerification { email: key });
            }

            this.session.set(Some(identity.clone()));
            Ok(SignUpOutcome::Session(identity))
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'static, Result<Identity, AuthError>> {
        let this = self.clone();
        let email = email.to_string();
        let password = password.to_string();

        Box::pin(async move {
            let key = normalize_email(&email).map_err(|_| AuthError::InvalidCredentials)?;
            let account = this
                .accounts
                .lock()
                .await
                .get(&key)
                .cloned()
                .ok_or(AuthError::InvalidCredentials)?;

            if account.password_digest != digest(&key, &password) {
                tracing::debug!(email = %key, "Password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            if !account.confirmed {
                return Err(AuthError::EmailNotConfirmed);
            }

            this.session.set(Some(account.identity.clone()));
            Ok(account.identity)
        })
    }

    fn sign_out(&self) -> BoxFuture<'static, Result<(), AuthError>> {
        let session = self.session.clone();
        Box::pin(async move {
            session.set(None);
            Ok(())
        })
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.session.current()
    }
}
