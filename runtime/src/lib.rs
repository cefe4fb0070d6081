//! # Ticket Integrity Runtime
//!
//! The [`Store`] drives a [`Reducer`]: it serializes actions through the
//! reducer, executes the returned effects on tokio, and feeds actions produced
//! by effects back into the reducer.
//!
//! Cancellable effects are tracked by [`EffectId`]. Registering a new effect
//! under an id that is still pending aborts the older one, and
//! [`Effect::Cancel`] aborts whatever is registered under the id.
//!
//! ## Example
//!
//! ```ignore
//! use ticket_integrity_runtime::Store;
//!
//! let store = Store::new(ScanState::default(), ScanReducer::new(), environment);
//!
//! store.send(ScanAction::Scan { raw: "abc123".into() }).await?;
//! let phase = store.state(|s| s.phase).await;
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use ticket_integrity_core::effect::{Effect, EffectId};
use ticket_integrity_core::reducer::Reducer;
use tokio::sync::{broadcast, RwLock};
use tokio::task::AbortHandle;

pub use error::StoreError;

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

        /// Timeout waiting for a matching action
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Decrements the pending effect counter when dropped, including on abort.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Inner<S, A, E, R> {
    state: RwLock<S>,
    reducer: R,
    environment: E,
    cancellable: Mutex<HashMap<EffectId, (u64, AbortHandle)>>,
    next_registration: AtomicU64,
    shutdown: AtomicBool,
    pending_effects: Arc<AtomicUsize>,
    /// Actions produced by effects, for observers such as CLIs and HTTP handlers.
    action_broadcast: broadcast::Sender<A>,
}

/// The Store - runtime coordinator for a reducer
///
/// Cloning a store is cheap; clones share state, environment and the
/// registry of cancellable effects.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    inner: Arc<Inner<S, A, E, R>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
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
    /// The action broadcast channel holds 16 actions; use
    /// [`Store::with_broadcast_capacity`] for chattier reducers.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
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
            inner: Arc::new(Inner {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                cancellable: Mutex::new(HashMap::new()),
                next_registration: AtomicU64::new(0),
                shutdown: AtomicBool::new(false),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }),
        }
    }

    /// Send an action through the reducer and start its effects
    ///
    /// Actions are reduced one at a time. Effects are started before this
    /// returns but are not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once [`Store::shutdown`] has
    /// been called.
    #[tracing::instrument(skip_all, name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(StoreError::ShutdownInProgress);
        }

        let effects = {
            let mut state = self.inner.state.write().await;
            self.inner
                .reducer
                .reduce(&mut *state, action, &self.inner.environment)
        };

        for effect in effects {
            self.execute(effect);
        }

        Ok(())
    }

    /// Read from the current state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Subscribe to actions produced by effects
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<A> {
        self.inner.action_broadcast.subscribe()
    }

    /// Number of effects currently running or waiting on a timer
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.inner.pending_effects.load(Ordering::SeqCst)
    }

    /// Stop accepting actions and wait for running effects to finish
    ///
    /// Pending cancellable effects (timers) are aborted immediately. Other
    /// effects run to completion, but any action they produce is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when `timeout` elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.inner.shutdown.store(true, Ordering::SeqCst);

        let registered: Vec<(EffectId, (u64, AbortHandle))> = self
            .inner
            .cancellable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (id, (_, handle)) in registered {
            tracing::debug!(effect_id = %id, "Aborting cancellable effect on shutdown");
            handle.abort();
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let pending = self.pending_effects();
            if pending == 0 {
                tracing::info!("Store shut down cleanly");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(pending, "Store shutdown timed out");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn track(&self) -> PendingGuard {
        self.inner.pending_effects.fetch_add(1, Ordering::SeqCst);
        PendingGuard(Arc::clone(&self.inner.pending_effects))
    }

    /// Start an effect without waiting for it
    fn execute(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Cancel(id) => {
                metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                self.cancel(id);
            },
            Effect::Cancellable { id, effect } => {
                metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);
                let registration = self.inner.next_registration.fetch_add(1, Ordering::SeqCst);
                let guard = self.track();
                let store = self.clone();

                // Hold the registry lock across spawn so the task cannot release
                // its slot before it has been registered.
                let mut registry = self
                    .inner
                    .cancellable
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    store.run(*effect).await;
                    store.release(id, registration);
                });
                if let Some((_, previous)) =
                    registry.insert(id, (registration, handle.abort_handle()))
                {
                    tracing::trace!(effect_id = %id, "Replacing pending cancellable effect");
                    previous.abort();
                }
            },
            other => {
                let guard = self.track();
                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    store.run(other).await;
                });
            },
        }
    }

    /// Run an effect to completion on the current task
    fn run(&self, effect: Effect<A>) -> BoxFuture<'static, ()> {
        let store = self.clone();
        async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    if let Some(action) = fut.await {
                        store.feedback(action).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tracing::trace!(?duration, "Executing Effect::Delay");
                    tokio::time::sleep(duration).await;
                    store.feedback(*action).await;
                },
                nested @ (Effect::Cancellable { .. } | Effect::Cancel(_)) => store.execute(nested),
            }
        }
        .boxed()
    }

    async fn feedback(&self, action: A) {
        let _ = self.inner.action_broadcast.send(action.clone());
        if let Err(error) = self.send(action).await {
            tracing::debug!(%error, "Dropped action produced by effect");
        }
    }

    fn cancel(&self, id: EffectId) {
        let removed = self
            .inner
            .cancellable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some((_, handle)) = removed {
            tracing::debug!(effect_id = %id, "Cancelled pending effect");
            handle.abort();
        }
    }

    fn release(&self, id: EffectId, registration: u64) {
        let mut registry = self
            .inner
            .cancellable
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if registry.get(&id).is_some_and(|(current, _)| *current == registration) {
            registry.remove(&id);
        }
    }
}
