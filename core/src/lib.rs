//! # Flightdeck Core
//!
//! Core traits and types shared by the Flightdeck crates.
//!
//! Business logic is written as reducers: a reducer receives the current
//! state, one action, and an environment of injected dependencies, mutates the
//! state in place, and returns a list of [`Effect`] descriptions. The runtime
//! (`flightdeck-runtime`) executes those effects and feeds any resulting actions
//! back into the reducer.
//!
//! ## Core Concepts
//!
//! - **State**: Everything the reducer owns (catalog, rosters, flights, orders)
//! - **Action**: Commands from collaborators and outcomes produced by effects
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: A description of I/O, never the I/O itself
//! - **Environment**: Clock, journal, and other injected dependencies
//!
//! ## Example
//!
//! ```
//! use flightdeck_core::{smallvec, Effect, Reducer, SmallVec};
//!
//! #[derive(Default)]
//! struct GateState {
//!     boarded: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum GateAction {
//!     Board,
//! }
//!
//! struct GateReducer;
//!
//! impl Reducer for GateReducer {
//!     type State = GateState;
//!     type Action = GateAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut GateState,
//!         action: GateAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<GateAction>; 4]> {
//!         match action {
//!             GateAction::Board => state.boarded += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = GateState::default();
//! let _ = GateReducer.reduce(&mut state, GateAction::Board, &());
//! assert_eq!(state.boarded, 1);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub use effect::Effect;
pub use reducer::Reducer;

/// Event trait and serialized event envelope
pub mod event;

/// Event store (journal) abstraction
pub mod event_store;

/// Stream identifiers and versions
pub mod stream;

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - the core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all business logic and are deterministic given the environment.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
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
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce zero to four effects, so the return type keeps
        /// them inline without a heap allocation.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values returned by reducers and executed by the Store runtime.
pub mod effect {
    use crate::event::SerializedEvent;
    use crate::event_store::{EventStore, EventStoreError};
    use crate::stream::{StreamId, Version};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    /// Callback invoked when an append succeeds
    pub type OnAppended<Action> = Box<dyn FnOnce(Version) -> Option<Action> + Send>;

    /// Callback invoked when an append fails after retries
    pub type OnAppendFailed<Action> = Box<dyn FnOnce(EventStoreError) -> Option<Action> + Send>;

    /// Journal operations the runtime knows how to execute
    pub enum EventStoreOperation<Action> {
        /// Append events to a stream
        AppendEvents {
            /// Journal to write to
            event_store: Arc<dyn EventStore>,
            /// Target stream
            stream_id: StreamId,
            /// Optimistic concurrency check (`None` appends unconditionally)
            expected_version: Option<Version>,
            /// Events to append
            events: Vec<SerializedEvent>,
            /// Produces an action from the new stream version
            on_success: OnAppended<Action>,
            /// Produces an action from the failure
            on_error: OnAppendFailed<Action>,
        },
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should
    /// happen, returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is broadcast to
        /// observers and fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Journal operation
        EventStore(EventStoreOperation<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::EventStore(EventStoreOperation::AppendEvents {
                    stream_id, events, ..
                }) => f
                    .debug_struct("Effect::EventStore::AppendEvents")
                    .field("stream_id", stream_id)
                    .field("events", &events.len())
                    .finish_non_exhaustive(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Whether this effect writes to the journal
        #[must_use]
        pub const fn is_journal_write(&self) -> bool {
            matches!(self, Effect::EventStore(EventStoreOperation::AppendEvents { .. }))
        }
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected via
/// the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time for deterministic scheduling decisions
    ///
    /// Every time-window rule (cancellation cutoffs, departure-in-the-past
    /// checks, status reconciliation) reads the current instant through this
    /// trait, never through `Utc::now()` directly.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
