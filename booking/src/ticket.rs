//! Tickets, PNRs and the confirmed → cancelled lifecycle.

use crate::types::{FareClass, Money, Passenger, TrainOffer};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Charge shown on the cancellation confirmation. Never deducted.
pub const CANCELLATION_CHARGE: Money = Money::from_rupees(240);

const PNR_MIN: u64 = 1_000_000_000;
const PNR_MAX: u64 = 9_999_999_999;

/// Ticket errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// Not a 10-digit PNR
    #[error("Invalid PNR: {0}")]
    InvalidPnr(String),

    /// Cancel requested for a ticket that is already cancelled
    #[error("Ticket {0} is already cancelled")]
    AlreadyCancelled(Pnr),

    /// Unknown booking status string
    #[error("Unknown booking status: {0}")]
    UnknownStatus(String),
}

// ============================================================================
// PNR
// ============================================================================

/// Passenger Name Record: ten digits, first digit non-zero
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pnr(String);

impl Pnr {
    /// Parses a PNR
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidPnr`] unless the input is exactly ten
    /// ASCII digits with a non-zero first digit.
    pub fn parse(raw: &str) -> Result<Self, TicketError> {
        let raw = raw.trim();
        let valid = raw.len() == 10
            && raw.bytes().all(|b| b.is_ascii_digit())
            && !raw.starts_with('0');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(TicketError::InvalidPnr(raw.to_string()))
        }
    }

    /// Builds a PNR from a number in the ten-digit range
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidPnr`] outside `1_000_000_000..=9_999_999_999`.
    pub fn from_number(number: u64) -> Result<Self, TicketError> {
        if (PNR_MIN..=PNR_MAX).contains(&number) {
            Ok(Self(number.to_string()))
        } else {
            Err(TicketError::InvalidPnr(number.to_string()))
        }
    }

    /// Returns the digits
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pnr {
    type Error = TicketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pnr> for String {
    fn from(pnr: Pnr) -> Self {
        pnr.0
    }
}

/// Issues PNRs for new tickets
pub trait PnrGenerator: Send + Sync {
    /// Returns the next PNR
    fn next_pnr(&self) -> Pnr;
}

/// Uniformly random PNRs. Collisions are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPnrGenerator;

impl PnrGenerator for RandomPnrGenerator {
    fn next_pnr(&self) -> Pnr {
        let number = rand::thread_rng().gen_range(PNR_MIN..=PNR_MAX);
        Pnr(number.to_string())
    }
}

/// Consecutive PNRs for deterministic tests and demos
#[derive(Debug)]
pub struct SequentialPnrGenerator {
    next: AtomicU64,
}

impl SequentialPnrGenerator {
    /// Starts at `first`, clamped into the ten-digit range
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.clamp(PNR_MIN, PNR_MAX)),
        }
    }
}

impl Default for SequentialPnrGenerator {
    fn default() -> Self {
        Self::starting_at(PNR_MIN)
    }
}

impl PnrGenerator for SequentialPnrGenerator {
    fn next_pnr(&self) -> Pnr {
        let number = self.next.fetch_add(1, Ordering::Relaxed);
        // Wraps back to the start of the range once exhausted.
        let number = if number > PNR_MAX { PNR_MIN } else { number };
        Pnr(number.to_string())
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Booking status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    /// Ticket is valid
    Confirmed,
    /// Ticket was cancelled
    Cancelled,
}

impl BookingStatus {
    /// Column value in the booking store
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(TicketError::UnknownStatus(other.to_string())),
        }
    }
}

/// Whether a ticket has reached the booking store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Insert in flight
    #[default]
    Pending,
    /// Stored
    Synced,
    /// Insert failed; the ticket is still shown
    Unsynced {
        /// Store error message
        error: String,
    },
}

/// An issued e-ticket
///
/// Train, fare and passengers are snapshots taken at booking time. The total
/// is fixed at issue and never recomputed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// PNR
    pub pnr: Pnr,
    /// Train snapshot
    pub train: TrainOffer,
    /// Booked class snapshot
    #[serde(rename = "selectedClass")]
    pub fare: FareClass,
    /// Passengers with contact details
    pub passengers: Vec<Passenger>,
    /// Date of travel
    pub travel_date: NaiveDate,
    /// Confirmed or cancelled
    #[serde(rename = "bookingStatus")]
    pub status: BookingStatus,
    /// When the ticket was issued
    #[serde(rename = "bookingDate")]
    pub booked_at: DateTime<Utc>,
    /// Fare price times passenger count
    pub total_amount: Money,
    /// Local persistence state
    #[serde(skip)]
    pub sync: SyncStatus,
}

impl Ticket {
    /// Issues a confirmed ticket
    #[must_use]
    pub fn issue(
        pnr: Pnr,
        train: TrainOffer,
        fare: FareClass,
        passengers: Vec<Passenger>,
        travel_date: NaiveDate,
        booked_at: DateTime<Utc>,
    ) -> Self {
        let total_amount = fare.price.times(passengers.len());
        Self {
            pnr,
            train,
            fare,
            passengers,
            travel_date,
            status: BookingStatus::Confirmed,
            booked_at,
            total_amount,
            sync: SyncStatus::Pending,
        }
    }

    /// Whether the ticket has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Moves a confirmed ticket to cancelled
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::AlreadyCancelled`] if it is already cancelled.
    pub fn cancel(&mut self) -> Result<(), TicketError> {
        if self.is_cancelled() {
            return Err(TicketError::AlreadyCancelled(self.pnr.clone()));
        }
        self.status = BookingStatus::Cancelled;
        Ok(())
    }
}
