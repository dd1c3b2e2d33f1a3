//! Collaborators the reducer reaches through effects.

use crate::auth::{AuthProvider, InMemoryAuthProvider};
use crate::bookings::{BookingStore, InMemoryBookingStore};
use crate::payment::PaymentSimulator;
use crate::search::TrainSearch;
use crate::ticket::{PnrGenerator, RandomPnrGenerator};
use railconnect_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Injected dependencies of [`super::AppReducer`]
#[derive(Clone)]
pub struct AppEnvironment {
    /// Timestamps for issued tickets
    pub clock: Arc<dyn Clock>,
    /// Sessions
    pub auth: Arc<dyn AuthProvider>,
    /// Train search
    pub search: Arc<TrainSearch>,
    /// Ticket persistence
    pub bookings: Arc<dyn BookingStore>,
    /// PNR source
    pub pnr: Arc<dyn PnrGenerator>,
    /// Payment simulator
    pub payments: PaymentSimulator,
}

impl AppEnvironment {
    /// Environment with a system clock, random PNRs and the default
    /// payment delay
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        search: TrainSearch,
        bookings: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            auth,
            search: Arc::new(search),
            bookings,
            pnr: Arc::new(RandomPnrGenerator),
            payments: PaymentSimulator::default(),
        }
    }

    /// In-memory auth and bookings with fallback-only search
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryAuthProvider::new()),
            TrainSearch::fallback_only(),
            Arc::new(InMemoryBookingStore::new()),
        )
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the PNR generator
    #[must_use]
    pub fn with_pnr_generator(mut self, pnr: Arc<dyn PnrGenerator>) -> Self {
        self.pnr = pnr;
        self
    }

    /// Replace the payment simulator
    #[must_use]
    pub fn with_payments(mut self, payments: PaymentSimulator) -> Self {
        self.payments = payments;
        self
    }
}

impl std::fmt::Debug for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppEnvironment")
            .field("search", &self.search)
            .field("payments", &self.payments)
            .finish_non_exhaustive()
    }
}
