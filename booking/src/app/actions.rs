//! Controller actions.
//!
//! Commands come from the user. Events are replies from collaborators,
//! produced by effects and fed back through the store. Error payloads are
//! strings so every action stays `Clone`. Replies to work done for a signed-in
//! user carry that user's id; the reducer drops them once the session has
//! moved on.

use crate::payment::PaymentMethod;
use crate::search::{SearchQuery, SearchResults};
use crate::ticket::{Pnr, Ticket};
use crate::types::{Identity, Money, PassengerEntry, UserId};

/// Everything the reducer reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppAction {
    // ========== Commands ==========
    /// Sign in with email and password
    SignIn {
        /// Email
        email: String,
        /// Password
        password: String,
    },
    /// Create an account
    SignUp {
        /// Email
        email: String,
        /// Password
        password: String,
        /// Optional display name
        display_name: Option<String>,
    },
    /// End the session from any view
    SignOut,
    /// Run a search from the search form
    Search {
        /// Origin station
        origin: String,
        /// Destination station
        destination: String,
        /// Travel date, `YYYY-MM-DD`
        date: String,
    },
    /// Back from results to the search form
    ModifySearch,
    /// Choose a fare from the results
    SelectFare {
        /// Index into the result list
        train_index: usize,
        /// Index into the train's fares
        fare_index: usize,
    },
    /// Back from the passenger form to the results
    BackToResults,
    /// Add a blank passenger row
    AddPassenger,
    /// Remove a passenger row
    RemovePassenger {
        /// Row index
        index: usize,
    },
    /// Replace a passenger row
    UpdatePassenger {
        /// Row index
        index: usize,
        /// New contents
        entry: PassengerEntry,
    },
    /// Set contact mobile and email
    SetContact {
        /// Mobile
        mobile: String,
        /// Email
        email: String,
    },
    /// Validate passengers and go to payment
    SubmitBooking,
    /// Back from payment to the passenger form
    BackToBooking,
    /// Choose how to pay
    SelectPaymentMethod {
        /// Method
        method: PaymentMethod,
    },
    /// Start the simulated payment
    Pay,
    /// Retry storing an unsynced ticket
    RetrySync,
    /// Cancel the ticket on screen
    CancelTicket,
    /// Open booking history
    ShowHistory,
    /// Open a ticket from history
    OpenTicket {
        /// PNR of the ticket
        pnr: Pnr,
    },
    /// Back to the search form
    GoHome,
    /// Clear visible errors
    DismissError,

    // ========== Events ==========
    /// Sign-in or sign-up produced a session
    SignedIn {
        /// The user
        identity: Identity,
    },
    /// Sign-up needs email confirmation
    VerificationPending {
        /// Address the confirmation went to
        email: String,
    },
    /// Auth backend refused
    AuthFailed {
        /// Message
        error: String,
    },
    /// The session channel changed
    SessionChanged {
        /// New identity
        identity: Option<Identity>,
    },
    /// The auth backend was told about the sign-out
    SignedOut,
    /// Search finished
    SearchCompleted {
        /// The query it answers
        query: SearchQuery,
        /// Offers and their source
        results: SearchResults,
    },
    /// Simulated payment settled
    PaymentCompleted {
        /// Session that started it
        user_id: UserId,
        /// Method used
        method: PaymentMethod,
        /// Amount paid
        amount: Money,
    },
    /// Ticket stored
    TicketSynced {
        /// Session that started it
        user_id: UserId,
        /// PNR
        pnr: Pnr,
    },
    /// Ticket not stored
    TicketSyncFailed {
        /// Session that started it
        user_id: UserId,
        /// PNR
        pnr: Pnr,
        /// Store error
        error: String,
    },
    /// Store marked the ticket cancelled
    TicketCancelled {
        /// Session that started it
        user_id: UserId,
        /// PNR
        pnr: Pnr,
    },
    /// Store refused the cancellation
    CancellationFailed {
        /// Session that started it
        user_id: UserId,
        /// PNR
        pnr: Pnr,
        /// Store error
        error: String,
    },
    /// History fetched
    HistoryLoaded {
        /// Session that started it
        user_id: UserId,
        /// Tickets, newest first
        tickets: Vec<Ticket>,
    },
    /// History fetch failed
    HistoryLoadFailed {
        /// Session that started it
        user_id: UserId,
        /// Store error
        error: String,
    },
}

impl AppAction {
    /// User-initiated (as opposed to a collaborator reply)
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::SignIn { .. }
                | Self::SignUp { .. }
                | Self::SignOut
                | Self::Search { .. }
                | Self::ModifySearch
                | Self::SelectFare { .. }
                | Self::BackToResults
                | Self::AddPassenger
                | Self::RemovePassenger { .. }
                | Self::UpdatePassenger { .. }
                | Self::SetContact { .. }
                | Self::SubmitBooking
                | Self::BackToBooking
                | Self::SelectPaymentMethod { .. }
                | Self::Pay
                | Self::RetrySync
                | Self::CancelTicket
                | Self::ShowHistory
                | Self::OpenTicket { .. }
                | Self::GoHome
                | Self::DismissError
        )
    }

    /// Accepted without a signed-in identity
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::SignIn { .. }
                | Self::SignUp { .. }
                | Self::SignOut
                | Self::SignedIn { .. }
                | Self::VerificationPending { .. }
                | Self::AuthFailed { .. }
                | Self::SessionChanged { .. }
                | Self::SignedOut
                | Self::DismissError
        )
    }
}
