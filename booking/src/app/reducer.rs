//! The booking flow state machine.

use super::actions::AppAction;
use super::environment::AppEnvironment;
use super::state::{AppState, Checkout, PaymentProgress, View};
use crate::draft::{BookingDraft, DraftError, Selection};
use crate::payment::PaymentMethod;
use crate::search::{SearchQuery, SearchResults};
use crate::ticket::{BookingStatus, Pnr, SyncStatus, Ticket};
use crate::types::{Identity, Money, UserId};
use railconnect_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;

type Effects = SmallVec<[Effect<AppAction>; 4]>;

/// Reducer for the whole booking flow
#[derive(Clone, Debug, Default)]
pub struct AppReducer;

impl AppReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========== Session ==========

    fn enter_session(state: &mut AppState, identity: Identity) {
        if let Some(current) = state.identity.as_ref().filter(|current| current.id != identity.id) {
            tracing::info!(previous = %current.id, user_id = %identity.id, "Session switched user");
            Self::clear_session(state);
        }
        if state.identity.as_ref() != Some(&identity) {
            tracing::info!(user_id = %identity.id, "Signed in");
        }
        state.identity = Some(identity);
        state.auth = Default::default();
        if state.view == View::Auth {
            state.view = View::Search;
        }
    }

    fn clear_session(state: &mut AppState) {
        *state = AppState::default();
    }

    /// Whether a reply started for `user_id` still belongs to this session
    fn owns(state: &AppState, user_id: &UserId) -> bool {
        let current = state.identity.as_ref().is_some_and(|identity| &identity.id == user_id);
        if !current {
            tracing::debug!(%user_id, "Discarded reply for an earlier session");
        }
        current
    }

    fn sign_in(state: &mut AppState, email: &str, password: &str, env: &AppEnvironment) -> Effects {
        if state.view != View::Auth || state.auth.busy {
            return SmallVec::new();
        }
        state.auth.busy = true;
        state.auth.error = None;
        state.auth.pending_verification = None;

        let attempt = env.auth.sign_in(email, password);
        smallvec![Effect::future(async move {
            Some(match attempt.await {
                Ok(identity) => AppAction::SignedIn { identity },
                Err(error) => AppAction::AuthFailed {
                    error: error.to_string(),
                },
            })
        })]
    }

    fn sign_up(
        state: &mut AppState,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        env: &AppEnvironment,
    ) -> Effects {
        if state.view != View::Auth || state.auth.busy {
            return SmallVec::new();
        }
        state.auth.busy = true;
        state.auth.error = None;
        state.auth.pending_verification = None;

        let attempt = env.auth.sign_up(email, password, display_name);
        smallvec![Effect::future(async move {
            Some(match attempt.await {
                Ok(crate::auth::SignUpOutcome::Session(identity)) => AppAction::SignedIn { identity },
                Ok(crate::auth::SignUpOutcome::PendingVerification { email }) => {
                    AppAction::VerificationPending { email }
                }
                Err(error) => AppAction::AuthFailed {
                    error: error.to_string(),
                },
            })
        })]
    }

    fn sign_out(state: &mut AppState, env: &AppEnvironment) -> Effects {
        if let Some(identity) = &state.identity {
            tracing::info!(user_id = %identity.id, "Signing out");
        }
        Self::clear_session(state);

        let attempt = env.auth.sign_out();
        smallvec![Effect::future(async move {
            if let Err(error) = attempt.await {
                tracing::warn!(%error, "Auth backend sign-out failed");
            }
            Some(AppAction::SignedOut)
        })]
    }

    // ========== Search ==========

    fn search(state: &mut AppState, origin: &str, destination: &str, date: &str, env: &AppEnvironment) -> Effects {
        if state.view != View::Search || state.searching {
            return SmallVec::new();
        }
        let query = match SearchQuery::parse(origin, destination, date) {
            Ok(query) => query,
            Err(error) => {
                state.last_error = Some(error.to_string());
                return SmallVec::new();
            }
        };

        state.trains.clear();
        state.results_source = None;
        state.query = Some(query.clone());
        state.searching = true;
        state.view = View::Results;

        let search = Arc::clone(&env.search);
        smallvec![Effect::future(async move {
            let results = search.search(&query).await;
            Some(AppAction::SearchCompleted { query, results })
        })]
    }

    fn search_completed(state: &mut AppState, query: &SearchQuery, results: SearchResults) {
        if !state.searching || state.query.as_ref() != Some(query) {
            tracing::debug!("Discarded stale search results");
            return;
        }
        tracing::info!(count = results.offers.len(), source = ?results.source, "Search completed");
        state.searching = false;
        state.trains = results.offers;
        state.results_source = Some(results.source);
    }

    fn select_fare(state: &mut AppState, train_index: usize, fare_index: usize) {
        if state.view != View::Results || state.searching {
            return;
        }
        let Some(train) = state.trains.get(train_index) else {
            state.last_error = Some(format!("No train at position {train_index}"));
            return;
        };
        let Some(fare) = train.fares.get(fare_index) else {
            state.last_error = Some(format!("Train {} has no fare at position {fare_index}", train.number));
            return;
        };

        match Selection::new(train.clone(), fare.clone()) {
            Ok(selection) => {
                state.draft = Some(BookingDraft::new(selection));
                state.checkout = None;
                state.view = View::Booking;
            }
            Err(error) => state.last_error = Some(error.to_string()),
        }
    }

    // ========== Booking draft ==========

    fn edit_draft<F>(state: &mut AppState, edit: F)
    where
        F: FnOnce(&mut BookingDraft) -> Result<(), DraftError>,
    {
        if state.view != View::Booking {
            return;
        }
        if let Some(draft) = state.draft.as_mut() {
            if let Err(error) = edit(draft) {
                state.last_error = Some(error.to_string());
            }
        }
    }

    fn submit_booking(state: &mut AppState) {
        if state.view != View::Booking {
            return;
        }
        let Some(draft) = &state.draft else {
            return;
        };
        let Some(travel_date) = state.query.as_ref().map(|query| query.date) else {
            state.last_error = Some("Search for a train before booking".to_string());
            return;
        };

        match draft.submit() {
            Ok(passengers) => {
                let selection = draft.selection().clone();
                let amount = selection.fare().price.times(passengers.len());
                state.checkout = Some(Checkout {
                    selection,
                    passengers,
                    travel_date,
                    amount,
                });
                state.payment = PaymentProgress::default();
                state.view = View::Payment;
            }
            Err(error) => state.last_error = Some(error.to_string()),
        }
    }

    // ========== Payment and ticket ==========

    fn pay(state: &mut AppState, env: &AppEnvironment) -> Effects {
        if state.view != View::Payment || state.payment.processing {
            return SmallVec::new();
        }
        let (Some(checkout), Some(identity)) = (&state.checkout, &state.identity) else {
            return SmallVec::new();
        };

        let method = state.payment.method;
        let amount = checkout.amount;
        let completion = AppAction::PaymentCompleted {
            user_id: identity.id.clone(),
            method,
            amount,
        };
        state.payment.processing = true;

        smallvec![env.payments.settle(method, amount, completion)]
    }

    fn payment_completed(state: &mut AppState, method: PaymentMethod, amount: Money, env: &AppEnvironment) -> Effects {
        if state.view != View::Payment || !state.payment.processing {
            return SmallVec::new();
        }
        let Some(identity) = state.identity.as_ref() else {
            return SmallVec::new();
        };
        let Some(checkout) = state.checkout.take() else {
            return SmallVec::new();
        };

        let (train, fare) = checkout.selection.into_parts();
        let ticket = Ticket::issue(
            env.pnr.next_pnr(),
            train,
            fare,
            checkout.passengers,
            checkout.travel_date,
            env.clock.now(),
        );
        tracing::info!(pnr = %ticket.pnr, %method, %amount, "Ticket issued");
        metrics::counter!("railconnect.tickets.issued").increment(1);

        let effect = Self::store_ticket(&identity.id, &ticket, env);
        state.payment.processing = false;
        state.draft = None;
        state.current_ticket = Some(ticket);
        state.view = View::Ticket;

        smallvec![effect]
    }

    fn store_ticket(user_id: &UserId, ticket: &Ticket, env: &AppEnvironment) -> Effect<AppAction> {
        let pnr = ticket.pnr.clone();
        let user_id = user_id.clone();
        let insert = env.bookings.insert(&user_id, ticket);
        Effect::future(async move {
            Some(match insert.await {
                Ok(()) => AppAction::TicketSynced { user_id, pnr },
                Err(error) => AppAction::TicketSyncFailed {
                    user_id,
                    pnr,
                    error: error.to_string(),
                },
            })
        })
    }

    fn set_sync(state: &mut AppState, pnr: &Pnr, sync: SyncStatus) {
        if let Some(ticket) = state.current_ticket.as_mut().filter(|t| &t.pnr == pnr) {
            ticket.sync = sync;
        }
    }

    fn retry_sync(state: &mut AppState, env: &AppEnvironment) -> Effects {
        if state.view != View::Ticket {
            return SmallVec::new();
        }
        let (Some(ticket), Some(identity)) = (state.current_ticket.as_mut(), state.identity.as_ref()) else {
            return SmallVec::new();
        };
        if !matches!(ticket.sync, SyncStatus::Unsynced { .. }) {
            return SmallVec::new();
        }

        tracing::info!(pnr = %ticket.pnr, "Retrying ticket sync");
        ticket.sync = SyncStatus::Pending;
        smallvec![Self::store_ticket(&identity.id, ticket, env)]
    }

    fn cancel_ticket(state: &mut AppState, env: &AppEnvironment) -> Effects {
        if state.view != View::Ticket || state.cancelling.is_some() {
            return SmallVec::new();
        }
        let (Some(ticket), Some(identity)) = (&state.current_ticket, &state.identity) else {
            return SmallVec::new();
        };
        if ticket.is_cancelled() {
            let error = crate::ticket::TicketError::AlreadyCancelled(ticket.pnr.clone());
            state.last_error = Some(error.to_string());
            return SmallVec::new();
        }

        let pnr = ticket.pnr.clone();
        let user_id = identity.id.clone();
        state.cancelling = Some(pnr.clone());
        let update = env.bookings.update_status(&pnr, BookingStatus::Cancelled);
        smallvec![Effect::future(async move {
            Some(match update.await {
                Ok(()) => AppAction::TicketCancelled { user_id, pnr },
                Err(error) => AppAction::CancellationFailed {
                    user_id,
                    pnr,
                    error: error.to_string(),
                },
            })
        })]
    }

    fn ticket_cancelled(state: &mut AppState, pnr: &Pnr) {
        if state.cancelling.as_ref() == Some(pnr) {
            state.cancelling = None;
        }
        if let Some(ticket) = state.current_ticket.as_mut().filter(|t| &t.pnr == pnr) {
            if let Err(error) = ticket.cancel() {
                tracing::debug!(%error, "Ticket was already cancelled");
            }
        }
        for ticket in state.history.iter_mut().filter(|t| &t.pnr == pnr) {
            ticket.status = BookingStatus::Cancelled;
        }
    }

    // ========== History ==========

    fn show_history(state: &mut AppState, env: &AppEnvironment) -> Effects {
        if state.payment.processing || state.loading_history {
            return SmallVec::new();
        }
        let Some(identity) = &state.identity else {
            return SmallVec::new();
        };

        let user_id = identity.id.clone();
        let list = env.bookings.list_for_user(&user_id);
        state.view = View::History;
        state.loading_history = true;

        smallvec![Effect::future(async move {
            Some(match list.await {
                Ok(rows) => AppAction::HistoryLoaded {
                    user_id,
                    tickets: rows.into_iter().map(crate::bookings::StoredBooking::into_ticket).collect(),
                },
                Err(error) => AppAction::HistoryLoadFailed {
                    user_id,
                    error: error.to_string(),
                },
            })
        })]
    }

    fn open_ticket(state: &mut AppState, pnr: &Pnr) {
        if state.view != View::History {
            return;
        }
        match state.history_ticket(pnr).cloned() {
            Some(ticket) => {
                state.current_ticket = Some(ticket);
                state.view = View::Ticket;
            }
            None => state.last_error = Some(format!("No booking with PNR {pnr}")),
        }
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(&self, state: &mut AppState, action: AppAction, env: &AppEnvironment) -> Effects {
        if state.identity.is_none() && !action.is_auth() {
            tracing::trace!(?action, "Ignored action without a session");
            return SmallVec::new();
        }
        if action.is_command() {
            state.last_error = None;
        }

        match action {
            // ========== Session ==========
            AppAction::SignIn { email, password } => Self::sign_in(state, &email, &password, env),
            AppAction::SignUp {
                email,
                password,
                display_name,
            } => Self::sign_up(state, &email, &password, display_name.as_deref(), env),
            AppAction::SignOut => Self::sign_out(state, env),
            AppAction::SignedIn { identity } => {
                Self::enter_session(state, identity);
                SmallVec::new()
            }
            AppAction::VerificationPending { email } => {
                tracing::info!(%email, "Sign-up awaiting email confirmation");
                state.auth.busy = false;
                state.auth.pending_verification = Some(email);
                SmallVec::new()
            }
            AppAction::AuthFailed { error } => {
                tracing::info!(%error, "Authentication failed");
                state.auth.busy = false;
                state.auth.error = Some(error);
                SmallVec::new()
            }
            AppAction::SessionChanged { identity } => {
                match identity {
                    Some(identity) => Self::enter_session(state, identity),
                    None if state.identity.is_some() => {
                        tracing::info!("Session ended by auth backend");
                        Self::clear_session(state);
                    }
                    None => {}
                }
                SmallVec::new()
            }
            AppAction::SignedOut => {
                tracing::debug!("Auth backend acknowledged sign-out");
                SmallVec::new()
            }

            // ========== Search and results ==========
            AppAction::Search {
                origin,
                destination,
                date,
            } => Self::search(state, &origin, &destination, &date, env),
            AppAction::SearchCompleted { query, results } => {
                Self::search_completed(state, &query, results);
                SmallVec::new()
            }
            AppAction::ModifySearch => {
                if state.view == View::Results {
                    state.searching = false;
                    state.view = View::Search;
                }
                SmallVec::new()
            }
            AppAction::SelectFare {
                train_index,
                fare_index,
            } => {
                Self::select_fare(state, train_index, fare_index);
                SmallVec::new()
            }

            // ========== Booking draft ==========
            AppAction::BackToResults => {
                if state.view == View::Booking {
                    state.draft = None;
                    state.view = View::Results;
                }
                SmallVec::new()
            }
            AppAction::AddPassenger => {
                Self::edit_draft(state, |draft| draft.add_passenger().map(|_| ()));
                SmallVec::new()
            }
            AppAction::RemovePassenger { index } => {
                Self::edit_draft(state, |draft| draft.remove_passenger(index));
                SmallVec::new()
            }
            AppAction::UpdatePassenger { index, entry } => {
                Self::edit_draft(state, |draft| draft.update_passenger(index, entry));
                SmallVec::new()
            }
            AppAction::SetContact { mobile, email } => {
                Self::edit_draft(state, |draft| {
                    draft.set_contact(mobile, email);
                    Ok(())
                });
                SmallVec::new()
            }
            AppAction::SubmitBooking => {
                Self::submit_booking(state);
                SmallVec::new()
            }

            // ========== Payment ==========
            AppAction::BackToBooking => {
                if state.view == View::Payment && !state.payment.processing {
                    state.checkout = None;
                    state.view = View::Booking;
                }
                SmallVec::new()
            }
            AppAction::SelectPaymentMethod { method } => {
                if state.view == View::Payment && !state.payment.processing {
                    state.payment.method = method;
                }
                SmallVec::new()
            }
            AppAction::Pay => Self::pay(state, env),
            AppAction::PaymentCompleted {
                user_id,
                method,
                amount,
            } => {
                if !Self::owns(state, &user_id) {
                    return SmallVec::new();
                }
                Self::payment_completed(state, method, amount, env)
            }

            // ========== Ticket ==========
            AppAction::TicketSynced { user_id, pnr } => {
                tracing::debug!(%pnr, "Ticket stored");
                if Self::owns(state, &user_id) {
                    Self::set_sync(state, &pnr, SyncStatus::Synced);
                }
                SmallVec::new()
            }
            AppAction::TicketSyncFailed { user_id, pnr, error } => {
                tracing::warn!(%pnr, %error, "Ticket could not be stored");
                metrics::counter!("railconnect.tickets.unsynced").increment(1);
                if Self::owns(state, &user_id) {
                    Self::set_sync(state, &pnr, SyncStatus::Unsynced { error });
                }
                SmallVec::new()
            }
            AppAction::RetrySync => Self::retry_sync(state, env),
            AppAction::CancelTicket => Self::cancel_ticket(state, env),
            AppAction::TicketCancelled { user_id, pnr } => {
                tracing::info!(%pnr, "Ticket cancelled");
                metrics::counter!("railconnect.tickets.cancelled").increment(1);
                if Self::owns(state, &user_id) {
                    Self::ticket_cancelled(state, &pnr);
                }
                SmallVec::new()
            }
            AppAction::CancellationFailed { user_id, pnr, error } => {
                tracing::warn!(%pnr, %error, "Cancellation failed");
                // Only the cancel this session is waiting on gets a visible error
                if Self::owns(state, &user_id) && state.cancelling.as_ref() == Some(&pnr) {
                    state.cancelling = None;
                    state.last_error = Some(format!("Cancellation failed: {error}"));
                }
                SmallVec::new()
            }
            AppAction::GoHome => {
                if matches!(state.view, View::Ticket | View::History) {
                    state.current_ticket = None;
                    state.view = View::Search;
                }
                SmallVec::new()
            }

            // ========== History ==========
            AppAction::ShowHistory => Self::show_history(state, env),
            AppAction::HistoryLoaded { user_id, tickets } => {
                if Self::owns(state, &user_id) && state.loading_history {
                    tracing::debug!(count = tickets.len(), "History loaded");
                    state.loading_history = false;
                    state.history = tickets;
                }
                SmallVec::new()
            }
            AppAction::HistoryLoadFailed { user_id, error } => {
                tracing::warn!(%error, "History could not be loaded");
                if Self::owns(state, &user_id) && state.loading_history {
                    state.loading_history = false;
                    state.history.clear();
                }
                SmallVec::new()
            }
            AppAction::OpenTicket { pnr } => {
                Self::open_ticket(state, &pnr);
                SmallVec::new()
            }

            AppAction::DismissError => {
                state.auth.error = None;
                SmallVec::new()
            }
        }
    }
}
