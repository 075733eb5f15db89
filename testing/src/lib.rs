//! # Flightdeck Testing
//!
//! Testing utilities for the Flightdeck crates:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - An in-memory journal ([`InMemoryEventStore`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Test-friendly tracing initialization
//!
//! ## Example
//!
//! ```ignore
//! use flightdeck_testing::{ManualClock, test_clock};
//!
//! let clock = ManualClock::starting_at(test_clock().now());
//! let env = AirlineEnvironment::new(Arc::new(clock.clone()), journal, policy);
//! clock.advance(chrono::Duration::hours(48));
//! ```

use chrono::{DateTime, Utc};
use flightdeck_core::environment::Clock;

/// In-memory event store
pub mod event_store;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// ```
    /// use flightdeck_testing::mocks::FixedClock;
    /// use flightdeck_core::environment::Clock;
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

    /// A clock tests can move forward while a store is running
    ///
    /// Clones share the same instant, so a test can keep one handle and give
    /// another to the environment.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to an absolute instant
        pub fn set(&self, time: DateTime<Utc>) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = time;
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: chrono::Duration) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
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

/// Install a test-writer tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use event_store::InMemoryEventStore;
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
