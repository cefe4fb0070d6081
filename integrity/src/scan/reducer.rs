//! The gate scanner state machine.
//!
//! ```text
//!            scan / manual entry           check-in returned
//! SCANNING ───────────────────► PROCESSING ─────────────────► SHOWING_RESULT
//!    ▲                              │                               │
//!    │          check-in failed     │                               │
//!    ├──────────────────────────────┘                               │
//!    │                         cooldown elapsed                     │
//!    └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reset` returns to SCANNING from any phase and cancels the cooldown.
//!
//! Two guards keep one scan in flight per device. `in_flight` is set when a
//! check-in starts and cleared only when it finishes, whatever the phase
//! says in between; a `reset` during a call therefore does not admit a second
//! scan until the first call returns. `generation` is bumped by every
//! accepted scan and every reset, and feedback carrying an older generation
//! is dropped, so a result that arrives after a reset is never displayed.

use super::parse::parse_ticket_id;
use crate::checkin::CheckInResult;
use crate::config::ScanConfig;
use crate::providers::CheckInHandler;
use crate::types::TicketId;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use ticket_integrity_core::effect::{Effect, EffectId};
use ticket_integrity_core::environment::Clock;
use ticket_integrity_core::reducer::Reducer;
use ticket_integrity_core::{SmallVec, smallvec};

/// Registration of the result cooldown timer.
pub const COOLDOWN: EffectId = EffectId::new("scan-cooldown");

/// What the scanner is doing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanPhase {
    /// Ready for the next code
    #[default]
    Scanning,
    /// Waiting for a check-in to return
    Processing,
    /// Displaying a check-in result
    ShowingResult,
}

/// The last code accepted for check-in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastScan {
    /// Ticket scanned
    pub ticket_id: TicketId,
    /// When it was accepted
    pub at: DateTime<Utc>,
}

/// A result on screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Ticket the result is for
    pub ticket_id: TicketId,
    /// Check-in result
    pub result: CheckInResult,
}

/// Scanner state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Current phase
    pub phase: ScanPhase,
    /// Whether a check-in call is running
    pub in_flight: bool,
    /// Last accepted scan, for duplicate suppression
    pub last_scan: Option<LastScan>,
    /// Result on screen, only while `phase` is `ShowingResult`
    pub outcome: Option<ScanOutcome>,
    /// Bumped by every accepted scan and reset
    pub generation: u64,
}

impl ScanState {
    /// Whether a new code would be considered at all
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase == ScanPhase::Scanning && !self.in_flight
    }
}

/// Scanner inputs, including feedback from the check-in call and cooldown
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanAction {
    /// The camera decoded a payload
    Scan {
        /// Raw decoded text
        raw: String,
    },
    /// Staff typed a ticket code
    ManualEntry {
        /// Typed text
        code: String,
    },
    /// Operator reset or scanner teardown
    Reset,
    /// The check-in call returned
    CheckInCompleted {
        /// Generation the call was started in
        generation: u64,
        /// Ticket checked in
        ticket_id: TicketId,
        /// Result
        result: CheckInResult,
    },
    /// The check-in call failed
    CheckInFailed {
        /// Generation the call was started in
        generation: u64,
        /// Ticket being checked in
        ticket_id: TicketId,
        /// Error description
        error: String,
    },
    /// The result cooldown ran out
    CooldownElapsed {
        /// Generation of the result being displayed
        generation: u64,
    },
}

/// Scanner dependencies
#[derive(Clone)]
pub struct ScanEnvironment {
    /// Time source for duplicate suppression
    pub clock: Arc<dyn Clock>,
    /// Performs check-ins
    pub handler: Arc<dyn CheckInHandler>,
    /// Timing
    pub config: ScanConfig,
}

impl ScanEnvironment {
    /// Bundle scanner dependencies
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, handler: Arc<dyn CheckInHandler>, config: ScanConfig) -> Self {
        Self {
            clock,
            handler,
            config,
        }
    }
}

/// Reducer for [`ScanState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanReducer;

impl ScanReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Typed codes are taken as identifiers verbatim, only trimmed.
    fn typed_ticket_id(code: &str) -> Option<TicketId> {
        let code = code.trim();
        (!code.is_empty()).then(|| TicketId::new(code))
    }

    fn accept(
        state: &mut ScanState,
        ticket_id: Option<TicketId>,
        env: &ScanEnvironment,
    ) -> SmallVec<[Effect<ScanAction>; 4]> {
        if !state.is_ready() {
            tracing::debug!(phase = ?state.phase, in_flight = state.in_flight, "Scan ignored, scanner busy");
            return SmallVec::new();
        }
        let Some(ticket_id) = ticket_id else {
            tracing::debug!("Unrecognised scan payload ignored");
            return SmallVec::new();
        };

        let now = env.clock.now();
        if let Some(last) = &state.last_scan {
            // A clock that moved backwards counts as within the window
            let within_window = !matches!(
                (now - last.at).to_std(),
                Ok(elapsed) if elapsed >= env.config.duplicate_window()
            );
            if last.ticket_id == ticket_id && within_window {
                tracing::debug!(ticket_id = %ticket_id, "Repeat read of the same code ignored");
                return SmallVec::new();
            }
        }

        state.last_scan = Some(LastScan {
            ticket_id: ticket_id.clone(),
            at: now,
        });
        state.phase = ScanPhase::Processing;
        state.in_flight = true;
        state.outcome = None;
        state.generation += 1;

        tracing::info!(ticket_id = %ticket_id, "Checking in scanned ticket");
        let generation = state.generation;
        let call = env.handler.check_in(ticket_id.clone());
        smallvec![Effect::Future(Box::pin(async move {
            // A panicking handler must still release the lock
            Some(match AssertUnwindSafe(call).catch_unwind().await {
                Ok(Ok(result)) => ScanAction::CheckInCompleted {
                    generation,
                    ticket_id,
                    result,
                },
                Ok(Err(error)) => ScanAction::CheckInFailed {
                    generation,
                    ticket_id,
                    error: error.to_string(),
                },
                Err(_) => ScanAction::CheckInFailed {
                    generation,
                    ticket_id,
                    error: "check-in handler panicked".to_string(),
                },
            })
        }))]
    }
}

impl Reducer for ScanReducer {
    type State = ScanState;
    type Action = ScanAction;
    type Environment = ScanEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ScanAction::Scan { raw } => Self::accept(state, parse_ticket_id(&raw), env),
            ScanAction::ManualEntry { code } => Self::accept(state, Self::typed_ticket_id(&code), env),

            ScanAction::CheckInCompleted {
                generation,
                ticket_id,
                result,
            } => {
                state.in_flight = false;
                if generation != state.generation {
                    tracing::debug!(ticket_id = %ticket_id, "Result of a reset scan discarded");
                    return SmallVec::new();
                }
                tracing::info!(ticket_id = %ticket_id, outcome = result.outcome(), "Showing check-in result");
                state.phase = ScanPhase::ShowingResult;
                state.outcome = Some(ScanOutcome { ticket_id, result });
                smallvec![
                    Effect::Delay {
                        duration: env.config.cooldown(),
                        action: Box::new(ScanAction::CooldownElapsed { generation }),
                    }
                    .cancellable(COOLDOWN)
                ]
            },

            ScanAction::CheckInFailed {
                generation,
                ticket_id,
                error,
            } => {
                state.in_flight = false;
                tracing::warn!(ticket_id = %ticket_id, %error, "Check-in call failed, resuming scanning");
                if generation == state.generation {
                    state.phase = ScanPhase::Scanning;
                    state.outcome = None;
                }
                SmallVec::new()
            },

            ScanAction::CooldownElapsed { generation } => {
                if generation == state.generation && state.phase == ScanPhase::ShowingResult {
                    state.phase = ScanPhase::Scanning;
                    state.outcome = None;
                }
                SmallVec::new()
            },

            ScanAction::Reset => {
                tracing::debug!(in_flight = state.in_flight, "Scanner reset");
                state.generation += 1;
                state.phase = ScanPhase::Scanning;
                state.outcome = None;
                smallvec![Effect::Cancel(COOLDOWN)]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::checkin::InvalidReason;
    use crate::error::ScanError;
    use futures::future::BoxFuture;
    use std::time::Duration;
    use ticket_integrity_testing::{ManualClock, ReducerTest, assertions};

    struct FixedHandler;

    impl CheckInHandler for FixedHandler {
        fn check_in(&self, _ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>> {
            Box::pin(async {
                Ok(CheckInResult::Invalid {
                    reason: InvalidReason::NotFound,
                })
            })
        }
    }

    fn env(clock: &ManualClock) -> ScanEnvironment {
        ScanEnvironment::new(Arc::new(clock.clone()), Arc::new(FixedHandler), ScanConfig::default())
    }

    fn result() -> CheckInResult {
        CheckInResult::Invalid {
            reason: InvalidReason::Refunded,
        }
    }

    fn scan(raw: &str) -> ScanAction {
        ScanAction::Scan { raw: raw.into() }
    }

    #[test]
    fn test_scan_starts_check_in() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .when_action(scan("abc123"))
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Processing);
                assert!(state.in_flight);
                assert_eq!(state.generation, 1);
                assert_eq!(state.last_scan.as_ref().unwrap().ticket_id, TicketId::new("abc123"));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_garbage_is_ignored() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .when_action(scan("not a ticket!"))
            .then_state(|state| assert_eq!(*state, ScanState::default()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_scan_ignored_while_processing() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .given_actions(vec![scan("abc123")])
            .when_action(scan("other-ticket"))
            .then_state(|state| {
                assert_eq!(state.generation, 1);
                assert_eq!(state.last_scan.as_ref().unwrap().ticket_id, TicketId::new("abc123"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_completion_shows_result_and_arms_cooldown() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .given_actions(vec![scan("abc123")])
            .when_action(ScanAction::CheckInCompleted {
                generation: 1,
                ticket_id: TicketId::new("abc123"),
                result: result(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::ShowingResult);
                assert!(!state.in_flight);
                assert_eq!(state.outcome.as_ref().unwrap().result, result());
            })
            .then_effects(|effects| {
                let (duration, action) = assertions::expect_cancellable_delay(effects, COOLDOWN);
                assert_eq!(duration, Duration::from_millis(1200));
                assert_eq!(*action, ScanAction::CooldownElapsed { generation: 1 });
            })
            .run();
    }

    #[test]
    fn test_failure_returns_to_scanning_without_result() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .given_actions(vec![scan("abc123")])
            .when_action(ScanAction::CheckInFailed {
                generation: 1,
                ticket_id: TicketId::new("abc123"),
                error: "connection refused".into(),
            })
            .then_state(|state| {
                assert!(state.is_ready());
                assert!(state.outcome.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_reset_cancels_cooldown() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .given_actions(vec![
                scan("abc123"),
                ScanAction::CheckInCompleted {
                    generation: 1,
                    ticket_id: TicketId::new("abc123"),
                    result: result(),
                },
            ])
            .when_action(ScanAction::Reset)
            .then_state(|state| {
                assert!(state.is_ready());
                assert!(state.outcome.is_none());
                assert_eq!(state.generation, 2);
            })
            .then_effects(|effects| assertions::assert_cancels(effects, COOLDOWN))
            .run();
    }

    #[test]
    fn test_reset_during_call_keeps_lock_and_drops_late_result() {
        let clock = ManualClock::starting_at_epoch();
        let reducer = ScanReducer::new();
        let env = env(&clock);
        let mut state = ScanState::default();

        let _ = reducer.reduce(&mut state, scan("abc123"), &env);
        let _ = reducer.reduce(&mut state, ScanAction::Reset, &env);

        assert_eq!(state.phase, ScanPhase::Scanning);
        assert!(state.in_flight);
        assert!(reducer.reduce(&mut state, scan("other-ticket"), &env).is_empty());

        let effects = reducer.reduce(
            &mut state,
            ScanAction::CheckInCompleted {
                generation: 1,
                ticket_id: TicketId::new("abc123"),
                result: result(),
            },
            &env,
        );
        assert!(effects.is_empty());
        assert!(state.is_ready());
        assert!(state.outcome.is_none());
    }

    #[test]
    fn test_stale_cooldown_is_ignored() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .given_actions(vec![
                scan("abc123"),
                ScanAction::CheckInCompleted {
                    generation: 1,
                    ticket_id: TicketId::new("abc123"),
                    result: result(),
                },
                ScanAction::Reset,
                scan("def456"),
                ScanAction::CheckInCompleted {
                    generation: 3,
                    ticket_id: TicketId::new("def456"),
                    result: result(),
                },
            ])
            .when_action(ScanAction::CooldownElapsed { generation: 1 })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::ShowingResult);
                assert_eq!(state.outcome.as_ref().unwrap().ticket_id, TicketId::new("def456"));
            })
            .run();
    }

    #[test]
    fn test_duplicate_window() {
        let clock = ManualClock::starting_at_epoch();
        let reducer = ScanReducer::new();
        let env = env(&clock);
        let mut state = ScanState::default();

        let complete = |generation| ScanAction::CheckInCompleted {
            generation,
            ticket_id: TicketId::new("abc123"),
            result: result(),
        };

        let _ = reducer.reduce(&mut state, scan("abc123"), &env);
        let _ = reducer.reduce(&mut state, complete(1), &env);
        let _ = reducer.reduce(&mut state, ScanAction::CooldownElapsed { generation: 1 }, &env);

        clock.advance(chrono::Duration::milliseconds(2999));
        assert!(reducer.reduce(&mut state, scan("abc123"), &env).is_empty());
        assert_eq!(state.phase, ScanPhase::Scanning);

        clock.advance(chrono::Duration::milliseconds(1));
        assert_eq!(reducer.reduce(&mut state, scan("abc123"), &env).len(), 1);
        assert_eq!(state.phase, ScanPhase::Processing);
    }

    #[test]
    fn test_manual_entry_takes_the_scan_path() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .when_action(ScanAction::ManualEntry {
                code: " abc123 ".into(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Processing);
                assert_eq!(state.last_scan.as_ref().unwrap().ticket_id, TicketId::new("abc123"));
            })
            .run();
    }

    #[test]
    fn test_manual_entry_is_not_parsed() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .when_action(ScanAction::ManualEntry {
                code: "TKT.2024.0001".into(),
            })
            .then_state(|state| {
                assert_eq!(state.phase, ScanPhase::Processing);
                assert_eq!(state.last_scan.as_ref().unwrap().ticket_id, TicketId::new("TKT.2024.0001"));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();

        // A typed URL is kept as typed, not decoded
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .when_action(ScanAction::ManualEntry {
                code: "https://tix.example.com/tickets/abc123".into(),
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_scan.as_ref().unwrap().ticket_id,
                    TicketId::new("https://tix.example.com/tickets/abc123")
                );
            })
            .run();
    }

    #[test]
    fn test_blank_manual_entry_is_ignored() {
        let clock = ManualClock::starting_at_epoch();
        ReducerTest::new(ScanReducer::new())
            .with_env(env(&clock))
            .given_state(ScanState::default())
            .when_action(ScanAction::ManualEntry { code: "   ".into() })
            .then_state(|state| assert_eq!(*state, ScanState::default()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
