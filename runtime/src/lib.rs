//! # RailConnect Runtime
//!
//! The [`Store`] owns the booking controller's state, runs the reducer for
//! every action, and executes the effects it returns. Actions produced by
//! effects (a booking-store reply, the end of the payment delay) are fed back
//! into the reducer and broadcast to observers.
//!
//! ## Example
//!
//! ```ignore
//! use railconnect_runtime::Store;
//!
//! let store = Store::new(AppState::default(), AppReducer::new(), environment);
//!
//! let mut handle = store.send(AppAction::Pay).await?;
//! handle.wait().await; // payment delay, ticket issue and persistence done
//!
//! let view = store.state(|s| s.view).await;
//! ```

use railconnect_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, RwLock};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// No matching action arrived before the deadline
        #[error("Timed out waiting for a result action")]
        Timeout,

        /// The action broadcast channel closed while waiting
        #[error("Action channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Counter of running effects that notifies waiters on every change
type PendingCounter = Arc<watch::Sender<usize>>;

fn new_counter() -> PendingCounter {
    let (tx, _rx) = watch::channel(0);
    Arc::new(tx)
}

/// Increments a counter for as long as it is alive
struct PendingGuard(PendingCounter);

impl PendingGuard {
    fn track(counter: &PendingCounter) -> Self {
        counter.send_modify(|pending| *pending += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|pending| *pending = pending.saturating_sub(1));
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send`]. Tracking cascades: effects spawned by
/// feedback actions count toward the same handle, so [`EffectHandle::wait`]
/// returns once the whole chain started by the action has settled.
#[derive(Debug, Clone)]
pub struct EffectHandle {
    completion: watch::Receiver<usize>,
}

impl EffectHandle {
    fn new() -> (Self, PendingCounter) {
        let counter = new_counter();
        let completion = counter.subscribe();
        (Self { completion }, counter)
    }

    /// Number of effects still running for this action
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.completion.borrow()
    }

    /// Wait until every effect started by the action has finished
    pub async fn wait(&mut self) {
        // The sender is only dropped once the count is back to zero.
        let _ = self.completion.wait_for(|pending| *pending == 0).await;
    }

    /// Wait with an upper bound
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

/// The Store - runtime coordinator for a reducer
///
/// - state lives behind an `RwLock`; the reducer runs under the write lock,
///   one action at a time
/// - effects run in spawned tasks; their actions are reduced first and then
///   broadcast, so an observer that sees an action also sees its state change
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: Arc<R>,
    environment: Arc<E>,
    shutdown: Arc<AtomicBool>,
    pending_effects: PendingCounter,
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// The action broadcast buffers 64 actions per observer.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 64)
    }

    /// Create a new store with a custom action broadcast capacity
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: Arc::new(reducer),
            environment: Arc::new(environment),
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: new_counter(),
            action_broadcast,
        }
    }

    /// Send an action to the store
    ///
    /// Runs the reducer, starts the returned effects and returns without
    /// waiting for them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        let (handle, tracking) = EffectHandle::new();
        self.send_tracked(action, &tracking).await?;
        Ok(handle)
    }

    /// Send an action and wait for a matching feedback action
    ///
    /// Subscribes before sending, so a reply produced immediately is not lost.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// - [`StoreError::Timeout`] if no matching action arrives in time
    /// - [`StoreError::ChannelClosed`] if the broadcast channel closes
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();
        self.send(action).await?;
        wait_for_action(&mut rx, predicate, timeout).await
    }

    /// Subscribe to every action produced by effects
    ///
    /// Actions sent directly through [`Store::send`] are not broadcast.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Read current state via a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Stop accepting actions and wait for running effects
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating store shutdown");
        self.shutdown.store(true, Ordering::Release);

        let mut pending = self.pending_effects.subscribe();
        let drained = tokio::time::timeout(timeout, async {
            let _ = pending.wait_for(|count| *count == 0).await;
        })
        .await;

        match drained {
            Ok(()) => {
                tracing::info!("All effects completed, shutdown successful");
                Ok(())
            }
            Err(_) => {
                let remaining = *self.pending_effects.borrow();
                tracing::error!(pending_effects = remaining, "Shutdown timed out");
                Err(StoreError::ShutdownTimeout(remaining))
            }
        }
    }

    async fn send_tracked(&self, action: A, tracking: &PendingCounter) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions.total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            let start = Instant::now();
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());
            effects
        };

        tracing::trace!("Reducer returned {} effects", effects.len());
        for effect in effects {
            self.execute_effect(effect, tracking);
        }

        Ok(())
    }

    fn execute_effect(&self, effect: Effect<A>, tracking: &PendingCounter) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            }
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                let guard = PendingGuard::track(tracking);
                let global = PendingGuard::track(&self.pending_effects);
                let tracking = Arc::clone(tracking);
                let store = self.clone();

                tokio::spawn(async move {
                    let _guards = (guard, global);
                    if let Some(action) = fut.await {
                        store.feed_back(action, &tracking).await;
                    } else {
                        tracing::trace!("Effect::Future completed with no action");
                    }
                });
            }
            Effect::Delay { duration, action } => {
                metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                let guard = PendingGuard::track(tracking);
                let global = PendingGuard::track(&self.pending_effects);
                let tracking = Arc::clone(tracking);
                let store = self.clone();

                tokio::spawn(async move {
                    let _guards = (guard, global);
                    tokio::time::sleep(duration).await;
                    tracing::trace!(?duration, "Effect::Delay elapsed");
                    store.feed_back(*action, &tracking).await;
                });
            }
        }
    }

    /// Reduce an effect's action, then announce it to observers
    async fn feed_back(&self, action: A, tracking: &PendingCounter) {
        if let Err(error) = self.send_tracked(action.clone(), tracking).await {
            tracing::warn!(%error, "Dropped feedback action");
            return;
        }
        let _ = self.action_broadcast.send(action);
    }
}

async fn wait_for_action<A, F>(
    rx: &mut broadcast::Receiver<A>,
    predicate: F,
    timeout: Duration,
) -> Result<A, StoreError>
where
    A: Clone,
    F: Fn(&A) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            match rx.recv().await {
                Ok(action) if predicate(&action) => return Ok(action),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Action observer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::ChannelClosed);
                }
            }
        }
    })
    .await
    .map_err(|_| StoreError::Timeout)?
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            environment: Arc::clone(&self.environment),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}
