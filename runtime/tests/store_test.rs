//! Store behaviour: feedback ordering, cascading effect tracking, shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use railconnect_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use railconnect_runtime::{Store, StoreError};
use std::time::Duration;

// ============================================================================
// Fixture: a checkout that settles a payment and then persists it
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum CheckoutAction {
    Pay { amount: u64 },
    PaymentSettled { amount: u64 },
    Persisted { amount: u64 },
    PersistFailed { reason: String },
    Note,
}

#[derive(Clone, Debug, Default)]
struct CheckoutState {
    processing: bool,
    settled: Option<u64>,
    persisted: bool,
    failure: Option<String>,
    notes: u32,
}

#[derive(Clone)]
struct CheckoutEnvironment {
    settle_after: Duration,
    persist_ok: bool,
}

struct CheckoutReducer;

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckoutAction::Pay { amount } => {
                state.processing = true;
                smallvec![Effect::Delay {
                    duration: env.settle_after,
                    action: Box::new(CheckoutAction::PaymentSettled { amount }),
                }]
            }
            CheckoutAction::PaymentSettled { amount } => {
                state.processing = false;
                state.settled = Some(amount);
                let persist_ok = env.persist_ok;
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    if persist_ok {
                        Some(CheckoutAction::Persisted { amount })
                    } else {
                        Some(CheckoutAction::PersistFailed {
                            reason: "store unavailable".to_string(),
                        })
                    }
                })]
            }
            CheckoutAction::Persisted { .. } => {
                state.persisted = true;
                smallvec![Effect::None]
            }
            CheckoutAction::PersistFailed { reason } => {
                state.failure = Some(reason);
                smallvec![Effect::None]
            }
            CheckoutAction::Note => {
                state.notes += 1;
                smallvec![Effect::future(async { None })]
            }
        }
    }
}

fn checkout_store(persist_ok: bool) -> Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer> {
    Store::new(
        CheckoutState::default(),
        CheckoutReducer,
        CheckoutEnvironment {
            settle_after: Duration::from_millis(20),
            persist_ok,
        },
    )
}

fn is_terminal(action: &CheckoutAction) -> bool {
    matches!(
        action,
        CheckoutAction::Persisted { .. } | CheckoutAction::PersistFailed { .. }
    )
}

// ============================================================================
// send_and_wait_for
// ============================================================================

#[tokio::test]
async fn send_and_wait_for_returns_terminal_action() {
    let store = checkout_store(true);

    let result = store
        .send_and_wait_for(
            CheckoutAction::Pay { amount: 4500 },
            is_terminal,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    assert_eq!(result, CheckoutAction::Persisted { amount: 4500 });
}

#[tokio::test]
async fn state_reflects_action_once_it_is_broadcast() {
    let store = checkout_store(false);

    let result = store
        .send_and_wait_for(
            CheckoutAction::Pay { amount: 1900 },
            is_terminal,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    assert!(matches!(result, CheckoutAction::PersistFailed { .. }));
    let (settled, failure) = store
        .state(|s| (s.settled, s.failure.clone()))
        .await;
    assert_eq!(settled, Some(1900));
    assert_eq!(failure.as_deref(), Some("store unavailable"));
}

#[tokio::test]
async fn send_and_wait_for_times_out_without_match() {
    let store = checkout_store(true);

    let result = store
        .send_and_wait_for(
            CheckoutAction::Note,
            is_terminal,
            Duration::from_millis(50),
        )
        .await;

    assert_eq!(result, Err(StoreError::Timeout));
}

// ============================================================================
// Effect tracking
// ============================================================================

#[tokio::test]
async fn effect_handle_waits_for_cascading_effects() {
    let store = checkout_store(true);

    let mut handle = store.send(CheckoutAction::Pay { amount: 2800 }).await.unwrap();
    assert!(store.state(|s| s.processing).await);

    tokio_test::assert_ok!(handle.wait_with_timeout(Duration::from_secs(2)).await);

    assert_eq!(handle.pending(), 0);
    let (processing, persisted) = store.state(|s| (s.processing, s.persisted)).await;
    assert!(!processing);
    assert!(persisted);
}

#[tokio::test]
async fn directly_sent_actions_are_not_broadcast() {
    let store = checkout_store(true);
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(CheckoutAction::Note).await.unwrap();
    handle.wait().await;

    assert_eq!(store.state(|s| s.notes).await, 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn every_observer_sees_feedback_actions() {
    let store = checkout_store(true);
    let mut first = store.subscribe_actions();
    let mut second = store.subscribe_actions();

    let mut handle = store.send(CheckoutAction::Pay { amount: 650 }).await.unwrap();
    handle.wait().await;

    for rx in [&mut first, &mut second] {
        assert_eq!(
            rx.recv().await.unwrap(),
            CheckoutAction::PaymentSettled { amount: 650 }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            CheckoutAction::Persisted { amount: 650 }
        );
    }
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn shutdown_drains_effects_then_rejects_actions() {
    let store = checkout_store(true);
    let _handle = store.send(CheckoutAction::Pay { amount: 1500 }).await.unwrap();

    // The pending payment settles, but its feedback is refused after shutdown.
    tokio_test::assert_ok!(store.shutdown(Duration::from_secs(2)).await);

    let rejected = store.send(CheckoutAction::Note).await;
    assert_eq!(rejected.err(), Some(StoreError::ShutdownInProgress));
    assert!(!store.state(|s| s.persisted).await);
}

#[tokio::test]
async fn shutdown_times_out_with_slow_effects() {
    let store = Store::new(
        CheckoutState::default(),
        CheckoutReducer,
        CheckoutEnvironment {
            settle_after: Duration::from_secs(5),
            persist_ok: true,
        },
    );
    let _handle = store.send(CheckoutAction::Pay { amount: 900 }).await.unwrap();

    let result = store.shutdown(Duration::from_millis(20)).await;
    assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
}
