//! Simulated payment.
//!
//! No gateway is contacted: every payment settles successfully after a fixed
//! processing delay. The method is recorded but does not affect the outcome.

use crate::types::Money;
use railconnect_core::effect::Effect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default time a payment spends "processing"
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(2500);

/// How the user chose to pay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Scan a QR code
    #[default]
    Qr,
    /// UPI id
    Upi,
    /// Credit or debit card
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Qr => "QR",
            Self::Upi => "UPI",
            Self::Card => "CARD",
        })
    }
}

/// Always-succeeding payment simulator
#[derive(Clone, Debug)]
pub struct PaymentSimulator {
    processing_delay: Duration,
}

impl PaymentSimulator {
    /// Creates a simulator with the given processing delay
    #[must_use]
    pub const fn new(processing_delay: Duration) -> Self {
        Self { processing_delay }
    }

    /// Settles instantly; for tests
    #[must_use]
    pub const fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Configured processing delay
    #[must_use]
    pub const fn processing_delay(&self) -> Duration {
        self.processing_delay
    }

    /// Starts a payment and returns the effect that reports its success
    pub fn settle<A>(&self, method: PaymentMethod, amount: Money, on_success: A) -> Effect<A> {
        tracing::info!(%method, %amount, delay = ?self.processing_delay, "Processing simulated payment");
        Effect::Delay {
            duration: self.processing_delay,
            action: Box::new(on_success),
        }
    }
}

impl Default for PaymentSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSING_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_schedules_success_after_delay() {
        let simulator = PaymentSimulator::default();
        let effect = simulator.settle(PaymentMethod::Card, Money::from_rupees(3800), "paid");

        match effect {
            Effect::Delay { duration, action } => {
                assert_eq!(duration, Duration::from_millis(2500));
                assert_eq!(*action, "paid");
            }
            other => unreachable!("expected a delay, got {other:?}"),
        }
    }

    #[test]
    fn qr_is_the_preselected_method() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Qr);
    }

    #[test]
    fn method_wire_names() {
        assert_eq!(PaymentMethod::Qr.to_string(), "QR");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Upi).ok().as_deref(),
            Some("\"UPI\"")
        );
    }
}
