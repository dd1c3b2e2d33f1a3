//! Given-When-Then harness for reducers

#![allow(clippy::module_name_repetitions)]

use railconnect_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;

type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test
///
/// Several actions may be queued with [`ReducerTest::when_action`]; they are
/// reduced in order and the effect assertions see the effects of the last one.
///
/// ```ignore
/// ReducerTest::new(AppReducer::new())
///     .with_env(test_environment())
///     .given_state(AppState::default())
///     .when_action(AppAction::SignOut)
///     .then_state(|s| assert_eq!(s.view, View::Auth))
///     .then_effects(assertions::assert_has_future_effect)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the reducer and every assertion
    ///
    /// # Panics
    ///
    /// Panics if the state, environment or an action is missing, or if any
    /// assertion fails.
    #[allow(clippy::panic, clippy::expect_used)]
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use railconnect_core::effect::Effect;

    /// Assert that there are no effects (an empty list or a lone `Effect::None`)
    ///
    /// # Panics
    ///
    /// Panics if any effect does real work.
    #[allow(clippy::panic)]
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)]
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)]
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain a Delay and return its scheduled action
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    #[allow(clippy::panic)]
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) -> &A {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Delay { action, .. } => Some(action.as_ref()),
                _ => None,
            })
            .unwrap_or_else(|| panic!("Expected a Delay effect, but none found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railconnect_core::effect::Effect;
    use railconnect_core::reducer::Reducer;
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct SeatState {
        held: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SeatAction {
        Hold,
        Release,
        Expire,
    }

    struct SeatReducer;

    struct NoEnv;

    impl Reducer for SeatReducer {
        type State = SeatState;
        type Action = SeatAction;
        type Environment = NoEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                SeatAction::Hold => {
                    state.held += 1;
                    smallvec::smallvec![Effect::Delay {
                        duration: Duration::from_secs(60),
                        action: Box::new(SeatAction::Expire),
                    }]
                }
                SeatAction::Release | SeatAction::Expire => {
                    state.held = state.held.saturating_sub(1);
                    smallvec::smallvec![Effect::None]
                }
            }
        }
    }

    #[test]
    fn hold_schedules_expiry() {
        ReducerTest::new(SeatReducer)
            .with_env(NoEnv)
            .given_state(SeatState::default())
            .when_action(SeatAction::Hold)
            .then_state(|state| assert_eq!(state.held, 1))
            .then_effects(|effects| {
                assert_eq!(assertions::assert_has_delay_effect(effects), &SeatAction::Expire);
            })
            .run();
    }

    #[test]
    fn actions_are_reduced_in_order() {
        ReducerTest::new(SeatReducer)
            .with_env(NoEnv)
            .given_state(SeatState::default())
            .when_action(SeatAction::Hold)
            .when_action(SeatAction::Hold)
            .when_action(SeatAction::Release)
            .then_state(|state| assert_eq!(state.held, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn count_assertions() {
        assertions::assert_effects_count(&[Effect::<SeatAction>::None], 1);
        assertions::assert_effects_count::<SeatAction>(&[], 0);
        assertions::assert_no_effects::<SeatAction>(&[]);
    }

    #[test]
    #[should_panic(expected = "Future effect")]
    fn missing_future_effect_panics() {
        assertions::assert_has_future_effect::<SeatAction>(&[Effect::None]);
    }
}
