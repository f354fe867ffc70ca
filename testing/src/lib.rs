//! # Marquee Testing
//!
//! Testing utilities for Marquee reducers.
//!
//! This crate provides:
//! - `FixedClock` for deterministic time
//! - `ReducerTest`, a Given/When/Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use marquee_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(BookingReducer::new())
//!     .with_env(test_environment())
//!     .given_state(BookingState::default())
//!     .when_action(BookingAction::Submit)
//!     .then_state(|s| assert!(s.last_error.is_some()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use marquee_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use marquee_testing::mocks::FixedClock;
    /// use marquee_core::environment::Clock;
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

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
