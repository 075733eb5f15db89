//! The airline reducer.
//!
//! One reducer owns the whole [`AirlineState`]. Every command is handled in a
//! single pass under the store's write lock:
//!
//! 1. Flight statuses are reconciled against the clock
//! 2. The command is validated by the domain module that owns it
//! 3. Resulting events are applied to state and appended to the journal
//! 4. The caller is answered with [`AirlineAction::RequestSettled`]
//!
//! Because steps 1 to 3 happen in one reducer call, a booking's seat re-check
//! and its insert, a flight's availability re-check and its creation, and a
//! cancellation's cascade are each one atomic unit.

use crate::availability::{self, Availability, CandidateFlight, Resource};
use crate::catalog;
use crate::composition;
use crate::config::PolicyConfig;
use crate::error::EngineError;
use crate::journal::{self, FlightOpsEvent};
use crate::ledger::{self, BookingRequest, CancellationQuote, OrderCodeGenerator};
use crate::lifecycle::{self, NewFlight};
use crate::registry;
use crate::state::AirlineState;
use crate::types::{
    Aircraft, AircraftId, AirportCode, CrewMember, EmployeeId, FlightKey, Money, OrderCode,
    RequestId,
};
use chrono::{DateTime, Utc};
use flightdeck_core::append_events;
use flightdeck_core::effect::Effect;
use flightdeck_core::environment::Clock;
use flightdeck_core::event_store::EventStore;
use flightdeck_core::reducer::Reducer;
use flightdeck_core::stream::{StreamId, Version};
use flightdeck_core::{SmallVec, smallvec};
use std::sync::Arc;
use std::time::Duration;

/// Answer to commands sent while the state is rebuilt from the journal
pub const JOURNAL_RESYNCING: &str = "The journal is being resynchronized. Please try again.";

/// Pause before retrying a journal reload that failed
const RESYNC_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Operations collaborators can ask of the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Add an airport to the catalog
    RegisterAirport {
        /// Airport code
        code: AirportCode,
        /// Display name
        name: String,
    },
    /// Add a directional route to the catalog
    RegisterRoute {
        /// Departure airport
        source: AirportCode,
        /// Arrival airport
        dest: AirportCode,
        /// Block time in minutes
        duration_minutes: u32,
    },
    /// Add an aircraft and its seat inventory
    RegisterAircraft {
        /// The aircraft
        aircraft: Aircraft,
    },
    /// Add a crew member to the roster
    HireCrewMember {
        /// The crew member
        member: CrewMember,
    },
    /// Schedule a flight with its crew
    CreateFlight {
        /// Flight and roster
        flight: NewFlight,
    },
    /// Operator cancellation with a full refund cascade
    CancelFlight {
        /// Flight
        key: FlightKey,
    },
    /// Bring every flight status up to date
    ReconcileStatuses,
    /// Book seats for a customer
    BookSeats {
        /// Booking
        booking: BookingRequest,
    },
    /// Customer cancellation of an order
    CancelOrder {
        /// Order code
        code: OrderCode,
        /// Email the order was placed with
        customer_email: String,
    },
    /// Can a resource take a candidate flight?
    CheckAvailability {
        /// Crew member or aircraft
        resource: Resource,
        /// Proposed flight
        candidate: CandidateFlight,
    },
    /// Does a roster satisfy the composition rules?
    ValidateComposition {
        /// Aircraft
        aircraft: AircraftId,
        /// Route block time in minutes
        route_minutes: u32,
        /// Proposed roster
        crew: Vec<EmployeeId>,
    },
}

impl Command {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegisterAirport { .. } => "register_airport",
            Self::RegisterRoute { .. } => "register_route",
            Self::RegisterAircraft { .. } => "register_aircraft",
            Self::HireCrewMember { .. } => "hire_crew_member",
            Self::CreateFlight { .. } => "create_flight",
            Self::CancelFlight { .. } => "cancel_flight",
            Self::ReconcileStatuses => "reconcile_statuses",
            Self::BookSeats { .. } => "book_seats",
            Self::CancelOrder { .. } => "cancel_order",
            Self::CheckAvailability { .. } => "check_availability",
            Self::ValidateComposition { .. } => "validate_composition",
        }
    }
}

/// What an accepted command produced
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A catalog, roster, or flight record was written
    Recorded,
    /// A flight was cancelled and these orders refunded in full
    FlightCancelled {
        /// Orders moved to System Cancellation
        refunded_orders: Vec<OrderCode>,
    },
    /// Reconciliation ran
    Reconciled {
        /// Status transitions it applied
        transitions: usize,
    },
    /// Seats were booked
    Booked {
        /// New order code
        code: OrderCode,
        /// Amount charged
        total: Money,
    },
    /// An order was cancelled by its customer
    OrderCancelled(CancellationQuote),
    /// Availability verdict
    Availability(Availability),
    /// The roster is valid
    CompositionValid,
}

/// Actions processed by [`AirlineReducer`]
#[derive(Clone, Debug, PartialEq)]
pub enum AirlineAction {
    // ========== Commands ==========
    /// A command from a collaborator
    Request {
        /// Correlates the answer with the caller
        request_id: RequestId,
        /// What to do
        command: Command,
    },

    // ========== Journal ==========
    /// The events of a request reached the journal
    Appended {
        /// Request whose events were appended
        request_id: RequestId,
        /// Result to hand the caller
        outcome: Result<Outcome, EngineError>,
    },
    /// The events of a request could not be journaled
    AppendFailed {
        /// Request whose append failed
        request_id: RequestId,
        /// Why the journal refused
        error: String,
    },
    /// Rebuild the state from the journal stream
    ResyncJournal,
    /// The journal stream was read back for a rebuild
    JournalReloaded {
        /// Every event in the stream, or why it could not be read
        result: Result<Vec<FlightOpsEvent>, String>,
    },

    // ========== Outcomes ==========
    /// The answer to a [`AirlineAction::Request`]
    RequestSettled {
        /// Correlation id of the request
        request_id: RequestId,
        /// Result rendered for the caller
        outcome: Result<Outcome, EngineError>,
    },
    /// The request was decided but its events never reached the journal, so
    /// nothing it changed was kept
    RequestFailed {
        /// Correlation id of the request
        request_id: RequestId,
        /// Journal failure
        error: String,
    },
}

impl AirlineAction {
    /// Wrap a command with a fresh request id
    #[must_use]
    pub fn request(command: Command) -> Self {
        Self::Request {
            request_id: RequestId::new(),
            command,
        }
    }

    /// Whether this action answers `request_id`
    #[must_use]
    pub fn settles(&self, request_id: RequestId) -> bool {
        matches!(
            self,
            Self::RequestSettled { request_id: id, .. } | Self::RequestFailed { request_id: id, .. }
                if *id == request_id
        )
    }
}

/// Dependencies of the airline reducer
#[derive(Clone)]
pub struct AirlineEnvironment {
    /// Source of "now" for every time rule
    pub clock: Arc<dyn Clock>,
    /// Journal the events are appended to
    pub journal: Arc<dyn EventStore>,
    /// Stream inside the journal
    pub stream_id: StreamId,
    /// Order code source
    pub order_codes: Arc<dyn OrderCodeGenerator>,
    /// Business rules
    pub policy: PolicyConfig,
}

impl AirlineEnvironment {
    /// Creates a new airline environment
    pub fn new(
        clock: Arc<dyn Clock>,
        journal: Arc<dyn EventStore>,
        stream_id: StreamId,
        order_codes: Arc<dyn OrderCodeGenerator>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            clock,
            journal,
            stream_id,
            order_codes,
            policy,
        }
    }
}

/// Reducer for the whole airline
#[derive(Clone, Debug, Default)]
pub struct AirlineReducer;

impl AirlineReducer {
    /// Creates a new airline reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply_all(state: &mut AirlineState, events: &[FlightOpsEvent]) {
        for event in events {
            state.apply(event);
        }
    }

    fn reconcile(
        state: &mut AirlineState,
        now: DateTime<Utc>,
        policy: &PolicyConfig,
    ) -> Vec<FlightOpsEvent> {
        let transitions = lifecycle::reconcile(state, now, policy);
        if !transitions.is_empty() {
            Self::apply_all(state, &transitions);
            tracing::debug!(count = transitions.len(), "Reconciled flight statuses");
            metrics::counter!("flightdeck.reconcile.transitions")
                .increment(transitions.len() as u64);
        }
        transitions
    }

    /// Run one command, applying and collecting the events it produces
    fn execute(
        state: &mut AirlineState,
        command: Command,
        env: &AirlineEnvironment,
        now: DateTime<Utc>,
        recorded: &mut Vec<FlightOpsEvent>,
    ) -> Result<Outcome, EngineError> {
        let policy = &env.policy;
        let reconciled = recorded.len();
        let mut record = |state: &mut AirlineState, event: FlightOpsEvent| {
            state.apply(&event);
            recorded.push(event);
        };

        match command {
            Command::RegisterAirport { code, name } => {
                let event = catalog::register_airport(state, code, &name)?;
                record(state, event);
                Ok(Outcome::Recorded)
            },
            Command::RegisterRoute {
                source,
                dest,
                duration_minutes,
            } => {
                let event = catalog::register_route(state, source, dest, duration_minutes)?;
                record(state, event);
                Ok(Outcome::Recorded)
            },
            Command::RegisterAircraft { aircraft } => {
                let event = catalog::register_aircraft(state, aircraft)?;
                record(state, event);
                Ok(Outcome::Recorded)
            },
            Command::HireCrewMember { member } => {
                let event = registry::hire_crew_member(state, member)?;
                record(state, event);
                Ok(Outcome::Recorded)
            },
            Command::CreateFlight { flight } => {
                let event = lifecycle::create_flight(state, flight, now, policy)?;
                record(state, event);
                Ok(Outcome::Recorded)
            },
            Command::CancelFlight { key } => {
                let event = lifecycle::cancel_flight(state, &key, now, policy)?;
                let refunded_orders = match &event {
                    FlightOpsEvent::FlightCancelled {
                        cascaded_orders, ..
                    } => cascaded_orders.clone(),
                    _ => Vec::new(),
                };
                record(state, event);
                Ok(Outcome::FlightCancelled { refunded_orders })
            },
            Command::ReconcileStatuses => Ok(Outcome::Reconciled {
                transitions: reconciled,
            }),
            Command::BookSeats { booking } => {
                let code = ledger::allocate_order_code(state, env.order_codes.as_ref())?;
                let event = ledger::book_seats(state, booking, code, now)?;
                record(state, event);
                let total = state
                    .orders
                    .get(&code)
                    .map_or(Money::ZERO, |order| order.total_payment);
                Ok(Outcome::Booked { code, total })
            },
            Command::CancelOrder {
                code,
                customer_email,
            } => {
                let (event, quote) =
                    ledger::cancel_order(state, code, &customer_email, now, policy)?;
                record(state, event);
                Ok(Outcome::OrderCancelled(quote))
            },
            Command::CheckAvailability {
                resource,
                candidate,
            } => availability::check_availability(state, resource, &candidate, policy)
                .map(Outcome::Availability),
            Command::ValidateComposition {
                aircraft,
                route_minutes,
                crew,
            } => composition::validate_composition(state, aircraft, route_minutes, &crew, policy)
                .map(|()| Outcome::CompositionValid),
        }
    }

    fn answer(action: AirlineAction) -> Effect<AirlineAction> {
        Effect::Future(Box::pin(async move { Some(action) }))
    }

    /// Answer the caller, journaling first when anything changed
    ///
    /// Appends expect the stream to be exactly where the state left it, so
    /// journal entries land in the order the reducer produced them even when
    /// their effects run concurrently.
    fn settle(
        state: &mut AirlineState,
        env: &AirlineEnvironment,
        request_id: RequestId,
        outcome: Result<Outcome, EngineError>,
        recorded: &[FlightOpsEvent],
        now: DateTime<Utc>,
    ) -> SmallVec<[Effect<AirlineAction>; 4]> {
        if recorded.is_empty() {
            return smallvec![Self::answer(AirlineAction::RequestSettled {
                request_id,
                outcome,
            })];
        }

        let events = match journal::encode(recorded, Some(request_id), now) {
            Ok(events) => events,
            Err(error) => {
                tracing::error!(%request_id, error = %error, "Failed to encode journal entries");
                return Self::append_failed(state, env, request_id, error.to_string());
            },
        };

        let expected_version = Version::new(state.journal_len);
        state.journal_len += events.len() as u64;
        state.journal_sync.in_flight += 1;

        smallvec![append_events! {
            store: env.journal,
            stream: env.stream_id.clone(),
            expected_version: Some(expected_version),
            events: events,
            on_success: |_version| Some(AirlineAction::Appended { request_id, outcome }),
            on_error: |error| Some(AirlineAction::AppendFailed {
                request_id,
                error: error.to_string(),
            })
        }]
    }

    /// Mark the state as ahead of the stream and park the caller until the
    /// rebuild
    fn append_failed(
        state: &mut AirlineState,
        env: &AirlineEnvironment,
        request_id: RequestId,
        error: String,
    ) -> SmallVec<[Effect<AirlineAction>; 4]> {
        tracing::error!(%request_id, error = %error, "Journal append failed, discarding the change");
        metrics::counter!("flightdeck.journal.append_failed").increment(1);
        state.journal_sync.stale = true;
        state.journal_sync.failed.push((request_id, error));
        Self::resync_when_idle(state, env)
    }

    /// Start the rebuild once no append is outstanding
    fn resync_when_idle(
        state: &mut AirlineState,
        env: &AirlineEnvironment,
    ) -> SmallVec<[Effect<AirlineAction>; 4]> {
        let sync = &mut state.journal_sync;
        if !sync.stale || sync.reloading || sync.in_flight > 0 {
            return SmallVec::new();
        }
        sync.reloading = true;

        let store = Arc::clone(&env.journal);
        let stream_id = env.stream_id.clone();
        smallvec![Effect::Future(Box::pin(async move {
            let result = match store.load_events(stream_id, None).await {
                Ok(entries) => journal::decode(&entries).map_err(|e| e.to_string()),
                Err(error) => Err(error.to_string()),
            };
            Some(AirlineAction::JournalReloaded { result })
        }))]
    }

    /// Replace the state with the stream and answer every parked caller
    fn reloaded(
        state: &mut AirlineState,
        result: Result<Vec<FlightOpsEvent>, String>,
    ) -> SmallVec<[Effect<AirlineAction>; 4]> {
        let failed = std::mem::take(&mut state.journal_sync.failed);
        let mut effects: SmallVec<[Effect<AirlineAction>; 4]> = SmallVec::new();

        match result {
            Ok(events) => {
                let mut rebuilt = AirlineState::replay(&events);
                rebuilt.journal_len = events.len() as u64;
                *state = rebuilt;
                tracing::info!(events = events.len(), "Rebuilt state from journal");
            },
            Err(error) => {
                state.journal_sync.reloading = false;
                tracing::error!(error = %error, "Could not reload journal, retrying");
                effects.push(Effect::Delay {
                    duration: RESYNC_RETRY_DELAY,
                    action: Box::new(AirlineAction::ResyncJournal),
                });
            },
        }

        effects.extend(failed.into_iter().map(|(request_id, error)| {
            Self::answer(AirlineAction::RequestFailed { request_id, error })
        }));
        if effects.is_empty() {
            effects.push(Effect::None);
        }
        effects
    }
}

impl Reducer for AirlineReducer {
    type State = AirlineState;
    type Action = AirlineAction;
    type Environment = AirlineEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AirlineAction::Request {
                request_id,
                command,
            } => {
                let now = env.clock.now();
                let name = command.name();

                if state.journal_sync.stale {
                    tracing::warn!(%request_id, command = name, "Refused while the journal resyncs");
                    return smallvec![Self::answer(AirlineAction::RequestFailed {
                        request_id,
                        error: JOURNAL_RESYNCING.to_string(),
                    })];
                }

                let mut recorded = Self::reconcile(state, now, &env.policy);
                let outcome = Self::execute(state, command, env, now, &mut recorded);
                // Bookings and cancellations can fill or free a flight.
                recorded.extend(Self::reconcile(state, now, &env.policy));

                match &outcome {
                    Ok(_) => {
                        tracing::info!(%request_id, command = name, "Command accepted");
                        state.last_error = None;
                    },
                    Err(error) => {
                        tracing::warn!(
                            %request_id,
                            command = name,
                            kind = error.kind().as_str(),
                            "Command rejected: {error}"
                        );
                        state.last_error = Some(error.clone());
                    },
                }

                Self::settle(state, env, request_id, outcome, &recorded, now)
            },

            AirlineAction::Appended {
                request_id,
                outcome,
            } => {
                let sync = &mut state.journal_sync;
                sync.in_flight = sync.in_flight.saturating_sub(1);
                let mut effects = Self::resync_when_idle(state, env);
                effects.push(Self::answer(AirlineAction::RequestSettled {
                    request_id,
                    outcome,
                }));
                effects
            },

            AirlineAction::AppendFailed { request_id, error } => {
                let sync = &mut state.journal_sync;
                sync.in_flight = sync.in_flight.saturating_sub(1);
                Self::append_failed(state, env, request_id, error)
            },

            AirlineAction::ResyncJournal => Self::resync_when_idle(state, env),

            AirlineAction::JournalReloaded { result } => Self::reloaded(state, result),

            AirlineAction::RequestSettled { request_id, .. }
            | AirlineAction::RequestFailed { request_id, .. } => {
                tracing::trace!(%request_id, "Request settled");
                smallvec![Effect::None]
            },
        }
    }
}
