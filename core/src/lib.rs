//! # Ticket Integrity Core
//!
//! Small functional core shared by the ticket integrity crates.
//!
//! Long-lived client state machines (the gate scanner) are written as reducers:
//! a pure function `(State, Action, Environment) → Effects`. Timers and
//! asynchronous calls are returned as [`effect::Effect`] values instead of being
//! started inline, which keeps the state machine deterministic under test and
//! lets the runtime own scheduling and cancellation.
//!
//! - **State**: owned, cloneable domain state
//! - **Action**: every input to the reducer, including feedback from effects
//! - **Reducer**: validates the action, mutates state, describes effects
//! - **Effect**: description of a side effect, executed by the runtime `Store`
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//!
//! ## Example
//!
//! ```ignore
//! impl Reducer for GateReducer {
//!     type State = GateState;
//!     type Action = GateAction;
//!     type Environment = GateEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut GateState,
//!         action: GateAction,
//!         env: &GateEnvironment,
//!     ) -> SmallVec<[Effect<GateAction>; 4]> {
//!         match action {
//!             GateAction::Open => {
//!                 state.open = true;
//!                 smallvec![Effect::Delay {
//!                     duration: Duration::from_secs(5),
//!                     action: Box::new(GateAction::Close),
//!                 }]
//!             }
//!             GateAction::Close => {
//!                 state.open = false;
//!                 SmallVec::new()
//!             }
//!         }
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for state machine logic
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state machine logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must not perform I/O. Anything asynchronous or
        /// time-based is returned as an effect for the runtime to execute.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier for a cancellable effect.
    ///
    /// Scheduling a second cancellable effect under the same id replaces the
    /// first one, so an id names a slot rather than a single execution.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EffectId(&'static str);

    impl EffectId {
        /// Create an effect id from a static name
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(name)
        }

        /// The name this id was created with
        #[must_use]
        pub const fn name(&self) -> &'static str {
            self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed by the reducer. They are descriptions returned
    /// from `reduce` and executed by the runtime `Store`.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Dispatch an action after a delay (timeouts, cooldowns)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// If the future resolves to `Some`, the action is fed back into the reducer.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run an effect that can later be cancelled with [`Effect::Cancel`]
        Cancellable {
            /// Slot the effect is registered under
            id: EffectId,
            /// The effect to run
            effect: Box<Effect<Action>>,
        },

        /// Cancel the effect registered under `id`, if it is still pending
        Cancel(EffectId),
    }

    impl<Action> fmt::Debug for Effect<Action>
    where
        Action: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Register this effect under `id` so it can be cancelled
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }
    }
}

/// Environment module - Dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use ticket_integrity_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
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
    use super::effect::{Effect, EffectId};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Tick,
    }

    #[test]
    fn cancellable_wraps_effect_under_id() {
        let id = EffectId::new("cooldown");
        let effect = Effect::Delay {
            duration: Duration::from_millis(10),
            action: Box::new(TestAction::Tick),
        }
        .cancellable(id);

        match effect {
            Effect::Cancellable { id: got, effect } => {
                assert_eq!(got, id);
                assert!(matches!(*effect, Effect::Delay { .. }));
            },
            other => unreachable!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn debug_output_names_variants() {
        let effect: Effect<TestAction> = Effect::Cancel(EffectId::new("cooldown"));
        assert_eq!(format!("{effect:?}"), "Effect::Cancel(EffectId(\"cooldown\"))");

        let future: Effect<TestAction> = Effect::Future(Box::pin(async { None }));
        assert_eq!(format!("{future:?}"), "Effect::Future(<future>)");
    }

    #[tokio::test]
    async fn future_effect_resolves_to_action() {
        let effect: Effect<TestAction> = Effect::Future(Box::pin(async { Some(TestAction::Tick) }));
        let Effect::Future(fut) = effect else {
            unreachable!("constructed as Future");
        };
        assert_eq!(fut.await, Some(TestAction::Tick));
    }
}
