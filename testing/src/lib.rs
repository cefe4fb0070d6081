//! # Ticket Integrity Testing
//!
//! Testing utilities for the ticket integrity crates:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use ticket_integrity_testing::{ReducerTest, ManualClock};
//!
//! ReducerTest::new(ScanReducer::new())
//!     .with_env(environment_with(ManualClock::starting_at_epoch()))
//!     .given_state(ScanState::default())
//!     .when_action(ScanAction::Scan { raw: "abc123".into() })
//!     .then_state(|state| assert_eq!(state.phase, ScanPhase::Processing))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use ticket_integrity_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_integrity_testing::mocks::FixedClock;
    /// use ticket_integrity_core::environment::Clock;
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

    /// Clock that only moves when told to
    ///
    /// Clones share the same underlying time, so a test can keep one handle
    /// and pass another into an environment.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_integrity_testing::mocks::ManualClock;
    /// use ticket_integrity_core::environment::Clock;
    /// use chrono::Duration;
    ///
    /// let clock = ManualClock::starting_at_epoch();
    /// let start = clock.now();
    /// clock.advance(Duration::milliseconds(1500));
    /// assert_eq!(clock.now() - start, Duration::milliseconds(1500));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Create a clock starting at the default test instant
        #[must_use]
        pub fn starting_at_epoch() -> Self {
            Self::new(super::test_epoch())
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(super::test_epoch())
    }
}

/// The instant every default test clock starts at: 2025-01-01 00:00:00 UTC.
#[must_use]
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}

pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
