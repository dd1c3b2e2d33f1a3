//! Booking persistence.
//!
//! The store is written to on ticket issue and cancellation and read for the
//! history view. It is never read back after a write.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;

use crate::ticket::{BookingStatus, Pnr, SyncStatus, Ticket};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;

/// Booking store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingStoreError {
    /// No booking with the PNR
    #[error("No booking with PNR {0}")]
    NotFound(Pnr),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store is not reachable
    #[error("Booking store unavailable: {0}")]
    Unavailable(String),
}

/// A row of the bookings table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBooking {
    /// Owner
    pub user_id: UserId,
    /// PNR
    pub pnr: Pnr,
    /// Status column, authoritative over the snapshot
    pub status: BookingStatus,
    /// Ticket snapshot taken at issue
    pub ticket: Ticket,
    /// Insert time
    pub created_at: DateTime<Utc>,
}

impl StoredBooking {
    /// The ticket as shown in history, with the row's status applied
    #[must_use]
    pub fn into_ticket(self) -> Ticket {
        let mut ticket = self.ticket;
        ticket.status = self.status;
        ticket.sync = SyncStatus::Synced;
        ticket
    }
}

/// Booking store collaborator
pub trait BookingStore: Send + Sync {
    /// Insert a newly issued ticket
    ///
    /// # Errors
    ///
    /// Returns a [`BookingStoreError`] if the row was not written.
    fn insert(&self, user_id: &UserId, ticket: &Ticket) -> BoxFuture<'static, Result<(), BookingStoreError>>;

    /// Set the status column for a PNR
    ///
    /// # Errors
    ///
    /// Returns [`BookingStoreError::NotFound`] for an unknown PNR, or another
    /// error if the update failed.
    fn update_status(
        &self,
        pnr: &Pnr,
        status: BookingStatus,
    ) -> BoxFuture<'static, Result<(), BookingStoreError>>;

    /// All bookings of a user, newest first
    ///
    /// # Errors
    ///
    /// Returns a [`BookingStoreError`] if the rows could not be read.
    fn list_for_user(&self, user_id: &UserId) -> BoxFuture<'static, Result<Vec<StoredBooking>, BookingStoreError>>;
}
