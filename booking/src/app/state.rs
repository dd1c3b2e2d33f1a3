//! Controller state: the active view plus the data each view shows.

use crate::draft::{BookingDraft, Selection};
use crate::payment::PaymentMethod;
use crate::search::{ResultSource, SearchQuery};
use crate::ticket::{Pnr, Ticket};
use crate::types::{Identity, Money, Passenger, TrainOffer};
use chrono::NaiveDate;

/// The screen being shown. Exactly one is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum View {
    /// Sign in / sign up
    #[default]
    Auth,
    /// Search form
    Search,
    /// Train list
    Results,
    /// Passenger form
    Booking,
    /// Payment method and pay button
    Payment,
    /// E-ticket
    Ticket,
    /// Past bookings
    History,
}

/// Auth form status
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthStatus {
    /// A sign-in or sign-up is in flight
    pub busy: bool,
    /// Last auth failure message
    pub error: Option<String>,
    /// Email awaiting confirmation after sign-up
    pub pending_verification: Option<String>,
}

/// A submitted booking waiting for payment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkout {
    /// Train and fare
    pub selection: Selection,
    /// Validated passengers
    pub passengers: Vec<Passenger>,
    /// Date of travel
    pub travel_date: NaiveDate,
    /// Fare price times passenger count
    pub amount: Money,
}

/// Payment form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentProgress {
    /// Chosen method
    pub method: PaymentMethod,
    /// Simulated processing under way
    pub processing: bool,
}

/// Everything the views render
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppState {
    /// Active view
    pub view: View,
    /// Signed-in user; `None` gates every non-auth action
    pub identity: Option<Identity>,
    /// Auth form
    pub auth: AuthStatus,
    /// Last accepted search
    pub query: Option<SearchQuery>,
    /// Results of the last search, in returned order
    pub trains: Vec<TrainOffer>,
    /// Where `trains` came from
    pub results_source: Option<ResultSource>,
    /// A search is in flight
    pub searching: bool,
    /// Passenger form for the selected fare
    pub draft: Option<BookingDraft>,
    /// Submitted booking awaiting payment
    pub checkout: Option<Checkout>,
    /// Payment form
    pub payment: PaymentProgress,
    /// Ticket on the ticket view
    pub current_ticket: Option<Ticket>,
    /// Past tickets, newest first
    pub history: Vec<Ticket>,
    /// History is being fetched
    pub loading_history: bool,
    /// Cancellation in flight
    pub cancelling: Option<Pnr>,
    /// Visible error from the last command
    pub last_error: Option<String>,
}

impl AppState {
    /// Whether a user is signed in
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// History entry by PNR
    #[must_use]
    pub fn history_ticket(&self, pnr: &Pnr) -> Option<&Ticket> {
        self.history.iter().find(|ticket| &ticket.pnr == pnr)
    }
}
