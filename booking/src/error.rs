//! Errors returned by the [`crate::RailConnectApp`] facade.

use crate::bookings::BookingStoreError;
use railconnect_runtime::error::StoreError;
use thiserror::Error;

/// Facade error
#[derive(Error, Debug)]
pub enum BookingError {
    /// The command was refused with a visible message (`last_error`)
    #[error("{0}")]
    Validation(String),

    /// Sign-in or sign-up was refused (`auth.error`)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The store refused a cancellation
    #[error("{0}")]
    CancellationFailed(String),

    /// No user is signed in
    #[error("Not signed in")]
    NotSignedIn,

    /// The command does not apply to the active view
    #[error("Action not applicable in the current view")]
    NotApplicable,

    /// A collaborator did not answer within the response timeout
    #[error("Timed out waiting for a response")]
    Timeout,

    /// Store runtime error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Booking persistence error
    #[error("Booking store error: {0}")]
    BookingStore(#[from] BookingStoreError),
}
