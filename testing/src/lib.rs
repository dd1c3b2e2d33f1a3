//! # RailConnect Testing
//!
//! Helpers shared by the reducer and integration tests:
//! - [`mocks::FixedClock`] for reproducible booking timestamps
//! - [`ReducerTest`] for Given-When-Then reducer tests
//! - [`assertions`] over returned effects
//!
//! ## Example
//!
//! ```ignore
//! use railconnect_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(AppReducer::new())
//!     .with_env(test_environment())
//!     .given_state(signed_in_state())
//!     .when_action(AppAction::Search { origin, destination, date })
//!     .then_state(|s| assert!(s.searching))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use railconnect_core::environment::Clock;

pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeZone;

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use railconnect_testing::mocks::FixedClock;
    /// use railconnect_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
        )
    }
}

/// Install a test-writer `tracing` subscriber honouring `RUST_LOG`
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_new_year_2025() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn tracing_init_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
