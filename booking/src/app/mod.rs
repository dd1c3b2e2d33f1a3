//! The booking controller.
//!
//! [`AppReducer`] holds the view-state machine. [`RailConnectApp`] runs it in
//! a [`Store`] and exposes one async method per user command, waiting for the
//! collaborator replies a command triggers.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod state;


pub use actions::AppAction;
pub use environment::AppEnvironment;
pub use reducer::AppReducer;
pub use state::{AppState, AuthStatus, Checkout, PaymentProgress, View};

use crate::auth::SignUpOutcome;
use crate::error::BookingError;
use crate::payment::PaymentMethod;
use crate::ticket::{Pnr, SyncStatus, Ticket};
use crate::types::{Identity, Money, PassengerEntry, TrainOffer};
use railconnect_runtime::Store;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::task::JoinHandle;

/// Store running the booking controller
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

/// Default wait for collaborator replies
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Request/response facade over the booking store
///
/// Commands that only move between views return once the reducer has run.
/// Commands that reach a collaborator (sign-in, search, pay, cancel, history)
/// wait until every effect they started has settled.
pub struct RailConnectApp {
    store: AppStore,
    response_timeout: Duration,
    session_listener: JoinHandle<()>,
}

impl RailConnectApp {
    /// Start the controller in the `Auth` view
    ///
    /// Spawns a task forwarding the auth provider's session channel into the
    /// store, so it must be called inside a tokio runtime.
    #[must_use]
    pub fn new(environment: AppEnvironment) -> Self {
        let mut sessions = environment.auth.subscribe();
        let store = Store::new(AppState::default(), AppReducer::new(), environment);

        let listener_store = store.clone();
        let session_listener = tokio::spawn(async move {
            let initial = sessions.borrow_and_update().clone();
            if initial.is_some()
                && listener_store
                    .send(AppAction::SessionChanged { identity: initial })
                    .await
                    .is_err()
            {
                return;
            }

            while sessions.changed().await.is_ok() {
                let identity = sessions.borrow_and_update().clone();
                tracing::debug!(signed_in = identity.is_some(), "Session changed");
                if listener_store
                    .send(AppAction::SessionChanged { identity })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            store,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            session_listener,
        }
    }

    /// Override how long collaborator calls are awaited
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> AppState {
        self.store.state(AppState::clone).await
    }

    /// Active view
    pub async fn view(&self) -> View {
        self.store.state(|s| s.view).await
    }

    // ========== Session ==========

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Auth`] if the backend refuses the sign-up.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SignUpOutcome, BookingError> {
        let action = AppAction::SignUp {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.map(str::to_string),
        };
        match self.request(action, is_auth_reply).await? {
            AppAction::SignedIn { identity } => Ok(SignUpOutcome::Session(identity)),
            AppAction::VerificationPending { email } => Ok(SignUpOutcome::PendingVerification { email }),
            AppAction::AuthFailed { error } => Err(BookingError::Auth(error)),
            _ => Err(BookingError::NotApplicable),
        }
    }

    /// Sign in
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Auth`] if the credentials are refused.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BookingError> {
        let action = AppAction::SignIn {
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.request(action, is_auth_reply).await? {
            AppAction::SignedIn { identity } => Ok(identity),
            AppAction::AuthFailed { error } => Err(BookingError::Auth(error)),
            _ => Err(BookingError::NotApplicable),
        }
    }

    /// Sign out and return to the `Auth` view
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Timeout`] if the backend does not answer.
    pub async fn sign_out(&self) -> Result<(), BookingError> {
        self.request(AppAction::SignOut, |a| matches!(a, AppAction::SignedOut))
            .await
            .map(|_| ())
    }

    // ========== Search ==========

    /// Search trains and move to the results view
    ///
    /// The generator call is bounded by its own request timeout, which
    /// should stay below the response timeout. If the response timeout runs
    /// out first this returns [`BookingError::Timeout`], and the results
    /// still reach the view once the search finishes.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for empty fields or a bad date
    /// - [`BookingError::Timeout`] if the search outlives the response timeout
    pub async fn search(&self, origin: &str, destination: &str, date: &str) -> Result<Vec<TrainOffer>, BookingError> {
        let action = AppAction::Search {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date: date.to_string(),
        };
        self.request(action, |a| matches!(a, AppAction::SearchCompleted { .. }))
            .await?;
        Ok(self.store.state(|s| s.trains.clone()).await)
    }

    /// Back to the search form
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] outside the results view.
    pub async fn modify_search(&self) -> Result<(), BookingError> {
        self.command(AppAction::ModifySearch, |s| s.view == View::Search)
            .await
    }

    /// Choose a fare and open the passenger form
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for an unknown or unselectable fare.
    pub async fn select_fare(&self, train_index: usize, fare_index: usize) -> Result<(), BookingError> {
        let action = AppAction::SelectFare {
            train_index,
            fare_index,
        };
        self.command(action, |s| s.view == View::Booking).await
    }

    /// Back to the results
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] outside the passenger form.
    pub async fn back_to_results(&self) -> Result<(), BookingError> {
        self.command(AppAction::BackToResults, |s| s.view == View::Results)
            .await
    }

    // ========== Booking draft ==========

    /// Add a passenger row and return its index
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when the form is full.
    pub async fn add_passenger(&self) -> Result<usize, BookingError> {
        self.command(AppAction::AddPassenger, |s| s.view == View::Booking)
            .await?;
        self.store
            .state(|s| s.draft.as_ref().map(|d| d.passengers().len().saturating_sub(1)))
            .await
            .ok_or(BookingError::NotApplicable)
    }

    /// Remove a passenger row
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for the last row or a bad index.
    pub async fn remove_passenger(&self, index: usize) -> Result<(), BookingError> {
        self.command(AppAction::RemovePassenger { index }, |s| s.view == View::Booking)
            .await
    }

    /// Replace a passenger row
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a bad index.
    pub async fn update_passenger(&self, index: usize, entry: PassengerEntry) -> Result<(), BookingError> {
        self.command(AppAction::UpdatePassenger { index, entry }, |s| {
            s.view == View::Booking
        })
        .await
    }

    /// Set the contact mobile and email
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] outside the passenger form.
    pub async fn set_contact(&self, mobile: &str, email: &str) -> Result<(), BookingError> {
        let action = AppAction::SetContact {
            mobile: mobile.to_string(),
            email: email.to_string(),
        };
        self.command(action, |s| s.view == View::Booking).await
    }

    /// Validate the passengers and move to payment, returning the total
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] naming the first invalid field.
    pub async fn submit_booking(&self) -> Result<Money, BookingError> {
        self.command(AppAction::SubmitBooking, |s| s.view == View::Payment)
            .await?;
        self.store
            .state(|s| s.checkout.as_ref().map(|c| c.amount))
            .await
            .ok_or(BookingError::NotApplicable)
    }

    /// Back to the passenger form
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] outside payment or while it
    /// is processing.
    pub async fn back_to_booking(&self) -> Result<(), BookingError> {
        self.command(AppAction::BackToBooking, |s| s.view == View::Booking)
            .await
    }

    // ========== Payment and ticket ==========

    /// Pay with `method` and return the issued ticket
    ///
    /// Waits for the simulated processing delay and the attempt to store the
    /// ticket. A storage failure does not fail the call; it shows up as
    /// [`SyncStatus::Unsynced`] on the ticket.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] outside payment or while a
    /// payment is already processing.
    pub async fn pay(&self, method: PaymentMethod) -> Result<Ticket, BookingError> {
        self.command(AppAction::SelectPaymentMethod { method }, |s| {
            s.view == View::Payment && !s.payment.processing && s.payment.method == method
        })
        .await?;
        self.request(AppAction::Pay, |a| matches!(a, AppAction::PaymentCompleted { .. }))
            .await?;
        self.current_ticket().await
    }

    /// Retry storing an unsynced ticket, returning the new sync status
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] unless the ticket on screen is
    /// unsynced.
    pub async fn retry_sync(&self) -> Result<SyncStatus, BookingError> {
        self.request(AppAction::RetrySync, |a| {
            matches!(a, AppAction::TicketSynced { .. } | AppAction::TicketSyncFailed { .. })
        })
        .await?;
        Ok(self.current_ticket().await?.sync)
    }

    /// Cancel the ticket on screen
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] if the ticket is already cancelled
    /// - [`BookingError::CancellationFailed`] if the store refused; the
    ///   ticket stays confirmed
    pub async fn cancel_ticket(&self) -> Result<Ticket, BookingError> {
        let reply = self
            .request(AppAction::CancelTicket, |a| {
                matches!(a, AppAction::TicketCancelled { .. } | AppAction::CancellationFailed { .. })
            })
            .await?;
        if let AppAction::CancellationFailed { error, .. } = reply {
            return Err(BookingError::CancellationFailed(format!("Cancellation failed: {error}")));
        }
        self.current_ticket().await
    }

    // ========== History ==========

    /// Open the history view and return the user's tickets, newest first
    ///
    /// A failed load yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] while a payment is processing.
    pub async fn show_history(&self) -> Result<Vec<Ticket>, BookingError> {
        self.request(AppAction::ShowHistory, |a| {
            matches!(a, AppAction::HistoryLoaded { .. } | AppAction::HistoryLoadFailed { .. })
        })
        .await?;
        Ok(self.store.state(|s| s.history.clone()).await)
    }

    /// Open a ticket from history
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a PNR not in the history.
    pub async fn open_ticket(&self, pnr: &Pnr) -> Result<Ticket, BookingError> {
        self.command(AppAction::OpenTicket { pnr: pnr.clone() }, |s| s.view == View::Ticket)
            .await?;
        self.current_ticket().await
    }

    /// Back to the search form from a ticket or the history
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotApplicable`] from other views.
    pub async fn go_home(&self) -> Result<(), BookingError> {
        self.command(AppAction::GoHome, |s| s.view == View::Search).await
    }

    /// Clear visible errors
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if the store is shutting down.
    pub async fn dismiss_error(&self) -> Result<(), BookingError> {
        self.store.send(AppAction::DismissError).await?;
        Ok(())
    }

    /// Stop the session listener and wait for running effects
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if effects outlive `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), BookingError> {
        self.session_listener.abort();
        self.store.shutdown(timeout).await?;
        Ok(())
    }

    // ========== Helpers ==========

    async fn ensure_signed_in(&self) -> Result<(), BookingError> {
        if self.store.state(AppState::is_signed_in).await {
            Ok(())
        } else {
            Err(BookingError::NotSignedIn)
        }
    }

    async fn check_last_error(&self) -> Result<(), BookingError> {
        match self.store.state(|s| s.last_error.clone()).await {
            Some(error) => Err(BookingError::Validation(error)),
            None => Ok(()),
        }
    }

    async fn current_ticket(&self) -> Result<Ticket, BookingError> {
        self.store
            .state(|s| s.current_ticket.clone())
            .await
            .ok_or(BookingError::NotApplicable)
    }

    /// Send a command that completes inside the reducer
    async fn command<F>(&self, action: AppAction, applied: F) -> Result<(), BookingError>
    where
        F: FnOnce(&AppState) -> bool,
    {
        self.ensure_signed_in().await?;
        self.store.send(action).await?;
        let (last_error, applied) = self
            .store
            .state(|s| (s.last_error.clone(), applied(s)))
            .await;
        match last_error {
            Some(error) => Err(BookingError::Validation(error)),
            None if applied => Ok(()),
            None => Err(BookingError::NotApplicable),
        }
    }

    /// Send a command and wait for the reply that ends it
    async fn request<F>(&self, action: AppAction, is_reply: F) -> Result<AppAction, BookingError>
    where
        F: Fn(&AppAction) -> bool,
    {
        if !action.is_auth() {
            self.ensure_signed_in().await?;
        }
        let mut replies = self.store.subscribe_actions();
        let mut handle = self.store.send(action).await?;

        // A rejected command starts no effects, so this returns at once
        handle
            .wait_with_timeout(self.response_timeout)
            .await
            .map_err(|_| BookingError::Timeout)?;

        loop {
            match replies.try_recv() {
                Ok(reply) if is_reply(&reply) => return Ok(reply),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Reply observer lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        // No reply: the reducer refused the command
        self.check_last_error().await?;
        Err(BookingError::NotApplicable)
    }
}

fn is_auth_reply(action: &AppAction) -> bool {
    matches!(
        action,
        AppAction::SignedIn { .. } | AppAction::VerificationPending { .. } | AppAction::AuthFailed { .. }
    )
}

impl Drop for RailConnectApp {
    fn drop(&mut self) {
        self.session_listener.abort();
    }
}

impl std::fmt::Debug for RailConnectApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RailConnectApp")
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}
