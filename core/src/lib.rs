//! # RailConnect Core
//!
//! The primitives the booking controller is built from.
//!
//! A screen of the booking flow is modelled as plain data (**State**). Every
//! user gesture and every collaborator reply is an **Action**. A **Reducer**
//! folds an action into the state and returns **Effects**: descriptions of
//! work (a call to the booking store, a payment delay) that the runtime
//! executes and whose results come back as new actions. Collaborators are
//! reached only through the **Environment**, so a reducer can be exercised
//! with fixed clocks and in-memory stores.
//!
//! ## Example
//!
//! ```
//! use railconnect_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct SeatCounter {
//!     passengers: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum SeatAction {
//!     AddPassenger,
//! }
//!
//! struct SeatReducer;
//!
//! impl Reducer for SeatReducer {
//!     type State = SeatCounter;
//!     type Action = SeatAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut SeatCounter,
//!         action: SeatAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<SeatAction>; 4]> {
//!         match action {
//!             SeatAction::AddPassenger => state.passengers += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = SeatCounter::default();
//! let effects = SeatReducer.reduce(&mut state, SeatAction::AddPassenger, &());
//! assert_eq!(state.passengers, 1);
//! assert_eq!(effects.len(), 1);
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the trait holding all booking-flow decisions
pub mod reducer {
    use super::{effect::Effect, SmallVec};

    /// The Reducer trait
    ///
    /// `reduce` must be deterministic for a given state, action and
    /// environment: all I/O is expressed as returned [`Effect`]s.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Describes a side effect to be executed by the runtime
    ///
    /// Effects are values returned from reducers. Nothing happens until a
    /// `Store` executes them.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Dispatch `action` after `duration` has elapsed
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// If the future resolves to `Some(action)`, the action is fed back
        /// into the reducer.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block into an [`Effect::Future`]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(fut))
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }
    }

    // Futures are opaque, so Debug is written by hand.
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Self::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }
}

/// Environment module - dependency injection traits shared by every feature
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Abstracts time so booking timestamps are reproducible in tests
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};
    use std::time::Duration;

    #[test]
    fn delay_effect_debug_shows_action() {
        let effect = Effect::Delay {
            duration: Duration::from_millis(2500),
            action: Box::new("PaymentCompleted"),
        };
        let rendered = format!("{effect:?}");
        assert!(rendered.contains("Effect::Delay"));
        assert!(rendered.contains("PaymentCompleted"));
    }

    #[test]
    fn future_effect_is_not_none() {
        let effect: Effect<u8> = Effect::future(async { Some(1) });
        assert!(!effect.is_none());
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
        assert!(Effect::<u8>::None.is_none());
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
