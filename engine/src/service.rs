//! The `FlightOps` facade.
//!
//! Collaborators talk to the engine through [`FlightOps`]. Commands travel
//! through the store as [`AirlineAction::Request`]s and are answered with
//! [`AirlineAction::RequestSettled`]; reads reconcile flight statuses first
//! and then look at the state directly.

use crate::availability::{
    self, AircraftAvailability, Availability, CandidateFlight, CrewAvailabilityListing, Resource,
};
use crate::catalog;
use crate::composition::{self, CREW_COUNT_VALID, CompositionViolation};
use crate::config::{Config, PolicyConfig};
use crate::error::{EngineError, ServiceError};
use crate::journal::{self, FlightOpsEvent};
use crate::ledger::{self, BookingRequest, OrderCodeGenerator};
use crate::lifecycle::NewFlight;
use crate::queries::{
    self, CustomerOrders, FlightDetails, FlightFilter, FlightOffer, FlightSearch, SeatState,
};
use crate::reducer::{AirlineAction, AirlineEnvironment, AirlineReducer, Command, Outcome};
use crate::registry;
use crate::reports::{
    self, AircraftActivity, CrewHours, MonthlyCancellations, OccupancyReport, RevenueLine,
};
use crate::state::AirlineState;
use crate::types::{
    Aircraft, AircraftId, Airport, AirportCode, CrewMember, CrewRole, EmployeeId, Flight,
    FlightKey, Money, Order, OrderCode, OrderStatus, RequestId, Route, Seat,
};
use chrono::{DateTime, Utc};
use flightdeck_core::environment::Clock;
use flightdeck_core::event_store::EventStore;
use flightdeck_core::stream::StreamId;
use flightdeck_runtime::{RetryPolicy, Store, StoreConfig, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

type AirlineStore = Store<AirlineState, AirlineAction, AirlineEnvironment, AirlineReducer>;

/// Appends from concurrent commands wait for each other through version
/// conflicts, so they need more, shorter retries than the store default.
fn journal_retry_policy() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(32)
        .with_initial_delay(Duration::from_millis(2))
        .with_max_delay(Duration::from_millis(50))
}

/// `{success, message}` as shown to a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the operation went through
    pub success: bool,
    /// Human-readable explanation
    pub message: String,
}

impl ApiResponse {
    /// Successful response
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed response
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Render any facade result
    ///
    /// Rejections carry their own message; `success_message` is used otherwise.
    pub fn from_result<T>(result: &Result<T, ServiceError>, success_message: impl Into<String>) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(error) => Self::failed(error.to_string()),
        }
    }
}

/// Answer to a successful booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    /// Order code the customer tracks the booking with
    pub order_code: OrderCode,
    /// Amount charged
    pub total_payment: Money,
    /// Confirmation text
    pub message: String,
}

/// Answer to a successful customer cancellation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    /// Cancelled order
    pub order_code: OrderCode,
    /// Fee retained
    pub fee_charged: Money,
    /// Amount refunded
    pub refund: Money,
    /// Confirmation text
    pub message: String,
}

fn unexpected(outcome: &Outcome) -> ServiceError {
    ServiceError::Runtime(StoreError::EffectFailed(format!(
        "unexpected outcome: {outcome:?}"
    )))
}

/// Entry point of the engine
///
/// Cheap to clone; every clone drives the same store.
#[derive(Clone)]
pub struct FlightOps {
    store: Arc<AirlineStore>,
    journal: Arc<dyn EventStore>,
    stream_id: StreamId,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    timeout: Duration,
}

impl FlightOps {
    /// Start an engine with no history on a fresh journal stream
    pub fn new(
        config: &Config,
        clock: Arc<dyn Clock>,
        journal: Arc<dyn EventStore>,
        order_codes: Arc<dyn OrderCodeGenerator>,
    ) -> Self {
        Self::with_state(config, clock, journal, order_codes, AirlineState::new())
    }

    /// Start an engine from whatever its journal stream already holds
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Journal`] if the stream cannot be loaded or
    /// holds entries this engine does not understand.
    pub async fn recover(
        config: &Config,
        clock: Arc<dyn Clock>,
        journal: Arc<dyn EventStore>,
        order_codes: Arc<dyn OrderCodeGenerator>,
    ) -> Result<Self, ServiceError> {
        let stream_id = StreamId::new(config.runtime.journal_stream.clone());
        let entries = journal
            .load_events(stream_id.clone(), None)
            .await
            .map_err(|e| ServiceError::Journal(e.to_string()))?;
        let events = journal::decode(&entries).map_err(|e| ServiceError::Journal(e.to_string()))?;

        let mut state = AirlineState::replay(&events);
        state.journal_len = entries.len() as u64;
        tracing::info!(
            stream = %stream_id,
            events = events.len(),
            flights = state.flights.len(),
            orders = state.orders.len(),
            "Recovered state from journal"
        );

        Ok(Self::with_state(config, clock, journal, order_codes, state))
    }

    fn with_state(
        config: &Config,
        clock: Arc<dyn Clock>,
        journal: Arc<dyn EventStore>,
        order_codes: Arc<dyn OrderCodeGenerator>,
        state: AirlineState,
    ) -> Self {
        let stream_id = StreamId::new(config.runtime.journal_stream.clone());
        let env = AirlineEnvironment::new(
            Arc::clone(&clock),
            Arc::clone(&journal),
            stream_id.clone(),
            order_codes,
            config.policy.clone(),
        );
        let store = Store::with_config(
            state,
            AirlineReducer::new(),
            env,
            StoreConfig::default()
                .with_broadcast_capacity(config.runtime.broadcast_capacity)
                .with_retry_policy(journal_retry_policy()),
        );

        Self {
            store: Arc::new(store),
            journal,
            stream_id,
            clock,
            policy: config.policy.clone(),
            timeout: config.runtime.request_timeout(),
        }
    }

    /// Send a command and wait for its answer
    async fn dispatch(&self, command: Command) -> Result<Outcome, ServiceError> {
        let request_id = RequestId::new();
        let settled = self
            .store
            .send_and_wait_for(
                AirlineAction::Request {
                    request_id,
                    command,
                },
                |action| action.settles(request_id),
                self.timeout,
            )
            .await?;

        match settled {
            AirlineAction::RequestSettled { outcome, .. } => outcome.map_err(ServiceError::from),
            AirlineAction::RequestFailed { error, .. } => Err(ServiceError::Journal(error)),
            other => Err(ServiceError::Runtime(StoreError::EffectFailed(format!(
                "request answered with {other:?}"
            )))),
        }
    }

    async fn dispatch_recorded(&self, command: Command) -> Result<(), ServiceError> {
        match self.dispatch(command).await? {
            Outcome::Recorded => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Reconcile, then read the state
    async fn read<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&AirlineState, DateTime<Utc>, &PolicyConfig) -> T,
    {
        self.reconcile_statuses().await?;
        let now = self.clock.now();
        let policy = &self.policy;
        Ok(self.store.state(|state| f(state, now, policy)).await)
    }

    /// Read the state without reconciling
    async fn peek<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&AirlineState) -> T,
    {
        self.store.state(f).await
    }

    // ========== Catalog ==========

    /// Add an airport
    ///
    /// # Errors
    ///
    /// Rejects blank input and duplicate codes.
    pub async fn register_airport(&self, code: &str, name: &str) -> Result<(), ServiceError> {
        self.dispatch_recorded(Command::RegisterAirport {
            code: AirportCode::new(code),
            name: name.to_string(),
        })
        .await
    }

    /// Add a directional route
    ///
    /// # Errors
    ///
    /// Rejects unknown airports, loops, zero durations, and duplicates.
    pub async fn register_route(
        &self,
        source: &str,
        dest: &str,
        duration_minutes: u32,
    ) -> Result<(), ServiceError> {
        self.dispatch_recorded(Command::RegisterRoute {
            source: AirportCode::new(source),
            dest: AirportCode::new(dest),
            duration_minutes,
        })
        .await
    }

    /// Add an aircraft with its seat inventory
    ///
    /// # Errors
    ///
    /// Rejects duplicate ids and cabin layouts that do not fit the size class.
    pub async fn register_aircraft(&self, aircraft: Aircraft) -> Result<(), ServiceError> {
        self.dispatch_recorded(Command::RegisterAircraft { aircraft })
            .await
    }

    /// Name of an airport
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown code.
    pub async fn lookup_airport(&self, code: &str) -> Result<Airport, ServiceError> {
        let code = AirportCode::new(code);
        self.peek(|state| catalog::lookup_airport(state, &code).cloned())
            .await
            .map_err(ServiceError::from)
    }

    /// Duration of a route
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if no route connects the airports.
    pub async fn lookup_route(&self, source: &str, dest: &str) -> Result<Route, ServiceError> {
        let (source, dest) = (AirportCode::new(source), AirportCode::new(dest));
        self.peek(|state| catalog::lookup_route(state, &source, &dest).cloned())
            .await
            .map_err(ServiceError::from)
    }

    /// Every airport, by name
    pub async fn list_airports(&self) -> Vec<Airport> {
        self.peek(catalog::list_airports).await
    }

    /// Every aircraft, by tail id
    pub async fn list_aircraft(&self) -> Vec<Aircraft> {
        self.peek(catalog::list_aircraft).await
    }

    /// Physical seats of an aircraft
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown tail id.
    pub async fn aircraft_seats(&self, aircraft: AircraftId) -> Result<Vec<Seat>, ServiceError> {
        self.peek(|state| catalog::seat_inventory(state, aircraft))
            .await
            .map_err(ServiceError::from)
    }

    // ========== Crew ==========

    /// Add a crew member
    ///
    /// # Errors
    ///
    /// Rejects duplicate ids and blank names.
    pub async fn hire_crew_member(&self, member: CrewMember) -> Result<(), ServiceError> {
        self.dispatch_recorded(Command::HireCrewMember { member })
            .await
    }

    /// Crew of one role, by employee id
    pub async fn list_crew(&self, role: CrewRole) -> Vec<CrewMember> {
        self.peek(|state| registry::list_crew(state, role).cloned().collect())
            .await
    }

    // ========== Availability & composition ==========

    /// Can `resource` take `candidate`?
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown resource.
    pub async fn check_availability(
        &self,
        resource: Resource,
        candidate: CandidateFlight,
    ) -> Result<Availability, ServiceError> {
        match self
            .dispatch(Command::CheckAvailability {
                resource,
                candidate,
            })
            .await?
        {
            Outcome::Availability(availability) => Ok(availability),
            other => Err(unexpected(&other)),
        }
    }

    /// Candidate flight whose duration comes from the catalog route
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if no route connects the airports.
    pub async fn candidate_on_route(
        &self,
        source: &str,
        dest: &str,
        departure: DateTime<Utc>,
    ) -> Result<CandidateFlight, ServiceError> {
        let (source, dest) = (AirportCode::new(source), AirportCode::new(dest));
        self.peek(|state| CandidateFlight::on_route(state, source, dest, departure))
            .await
            .map_err(ServiceError::from)
    }

    /// Availability of the whole roster for `candidate`
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn crew_availability(
        &self,
        candidate: &CandidateFlight,
    ) -> Result<CrewAvailabilityListing, ServiceError> {
        self.read(|state, _, policy| availability::crew_availability(state, candidate, policy))
            .await
    }

    /// Availability of every aircraft for `candidate`
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn aircraft_availability(
        &self,
        candidate: &CandidateFlight,
    ) -> Result<Vec<AircraftAvailability>, ServiceError> {
        self.read(|state, _, policy| availability::aircraft_availability(state, candidate, policy))
            .await
    }

    /// Check a roster against the composition rules
    ///
    /// Success means [`CREW_COUNT_VALID`].
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub async fn validate_composition(
        &self,
        aircraft: AircraftId,
        route_minutes: u32,
        crew: Vec<EmployeeId>,
    ) -> Result<(), ServiceError> {
        match self
            .dispatch(Command::ValidateComposition {
                aircraft,
                route_minutes,
                crew,
            })
            .await?
        {
            Outcome::CompositionValid => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// [`validate_composition`](Self::validate_composition) as `{valid, message}`
    pub async fn composition_verdict(
        &self,
        aircraft: AircraftId,
        route_minutes: u32,
        crew: Vec<EmployeeId>,
    ) -> ApiResponse {
        let result = self.validate_composition(aircraft, route_minutes, crew).await;
        ApiResponse::from_result(&result, CREW_COUNT_VALID)
    }

    // ========== Flight lifecycle ==========

    /// Schedule a flight with its crew
    ///
    /// # Errors
    ///
    /// The first failed check; nothing is written on failure.
    pub async fn create_flight(&self, flight: NewFlight) -> Result<(), ServiceError> {
        self.dispatch_recorded(Command::CreateFlight { flight }).await
    }

    /// Cancel a flight and refund every order on it
    ///
    /// Returns the refunded order codes.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown flight, [`EngineError::State`]
    /// inside the operator window or for a terminal flight.
    pub async fn cancel_flight(&self, key: &FlightKey) -> Result<Vec<OrderCode>, ServiceError> {
        match self.dispatch(Command::CancelFlight { key: key.clone() }).await? {
            Outcome::FlightCancelled { refunded_orders } => {
                metrics::counter!("flightdeck.flights.cancelled").increment(1);
                Ok(refunded_orders)
            },
            other => Err(unexpected(&other)),
        }
    }

    /// Bring every flight status up to date
    ///
    /// Returns the number of transitions applied.
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn reconcile_statuses(&self) -> Result<usize, ServiceError> {
        match self.dispatch(Command::ReconcileStatuses).await? {
            Outcome::Reconciled { transitions } => Ok(transitions),
            other => Err(unexpected(&other)),
        }
    }

    // ========== Booking ==========

    /// Book seats for a customer
    ///
    /// # Errors
    ///
    /// The whole selection is rejected if any seat is unavailable.
    pub async fn book_seats(&self, booking: BookingRequest) -> Result<BookingReceipt, ServiceError> {
        match self.dispatch(Command::BookSeats { booking }).await {
            Ok(Outcome::Booked { code, total }) => {
                metrics::counter!("flightdeck.bookings.accepted").increment(1);
                Ok(BookingReceipt {
                    order_code: code,
                    total_payment: total,
                    message: format!("Booking confirmed. Your order code is {code}."),
                })
            },
            Ok(other) => Err(unexpected(&other)),
            Err(error) => {
                if let Some(kind) = error.kind() {
                    metrics::counter!("flightdeck.bookings.rejected", "kind" => kind.as_str())
                        .increment(1);
                }
                Err(error)
            },
        }
    }

    /// Cancel an order on behalf of its customer
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown code or mismatched email,
    /// [`EngineError::State`] for a cancelled or completed order or one inside
    /// the customer window.
    pub async fn cancel_order(
        &self,
        code: OrderCode,
        customer_email: &str,
    ) -> Result<CancellationReceipt, ServiceError> {
        let command = Command::CancelOrder {
            code,
            customer_email: customer_email.to_string(),
        };
        match self.dispatch(command).await? {
            Outcome::OrderCancelled(quote) => Ok(CancellationReceipt {
                order_code: code,
                fee_charged: quote.fee,
                refund: quote.refund,
                message: format!(
                    "Order cancelled. A {} cancellation fee of {} was charged.",
                    self.policy.fee_percent_label(),
                    quote.fee
                ),
            }),
            other => Err(unexpected(&other)),
        }
    }

    /// Seats sold over seats on the aircraft, for a departed flight
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown flight, [`EngineError::State`]
    /// before departure.
    pub async fn occupancy(&self, key: &FlightKey) -> Result<f64, ServiceError> {
        self.read(|state, now, _| ledger::occupancy(state, key, now))
            .await?
            .map_err(ServiceError::from)
    }

    // ========== Queries ==========

    /// Flights matching `filter`, by departure
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn list_flights(&self, filter: &FlightFilter) -> Result<Vec<Flight>, ServiceError> {
        self.read(|state, _, _| queries::list_flights(state, filter))
            .await
    }

    /// Bookable flights matching `search`
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn search_flights(
        &self,
        search: &FlightSearch,
    ) -> Result<Vec<FlightOffer>, ServiceError> {
        self.read(|state, now, _| queries::search_flights(state, search, now))
            .await
    }

    /// A flight with its aircraft and crew
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown flight.
    pub async fn flight_details(&self, key: &FlightKey) -> Result<FlightDetails, ServiceError> {
        self.read(|state, _, _| queries::flight_details(state, key))
            .await?
            .map_err(ServiceError::from)
    }

    /// Every seat of a flight with its taken flag
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown flight.
    pub async fn seat_map(&self, key: &FlightKey) -> Result<Vec<SeatState>, ServiceError> {
        self.read(|state, _, _| queries::seat_map(state, key))
            .await?
            .map_err(ServiceError::from)
    }

    /// An order, for the customer who placed it
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] unless both code and email match.
    pub async fn track_order(&self, code: OrderCode, email: &str) -> Result<Order, ServiceError> {
        self.read(|state, _, _| queries::track_order(state, code, email))
            .await?
            .map_err(ServiceError::from)
    }

    /// A customer's orders, newest first, with their total spending
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn customer_orders(
        &self,
        email: &str,
        status: Option<OrderStatus>,
    ) -> Result<CustomerOrders, ServiceError> {
        self.read(|state, _, _| queries::customer_orders(state, email, status))
            .await
    }

    // ========== Reports ==========

    /// Occupancy of departed flights and their average
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn occupancy_report(&self) -> Result<OccupancyReport, ServiceError> {
        self.read(|state, now, _| reports::occupancy_report(state, now))
            .await
    }

    /// Revenue by aircraft type and cabin
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn revenue_by_aircraft(&self) -> Result<Vec<RevenueLine>, ServiceError> {
        self.read(|state, _, _| reports::revenue_by_aircraft(state))
            .await
    }

    /// Hours flown per crew member
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn crew_hours(&self) -> Result<Vec<CrewHours>, ServiceError> {
        self.read(|state, _, policy| reports::crew_hours(state, policy))
            .await
    }

    /// Customer cancellation rate by order month
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn cancellation_rate_by_month(
        &self,
    ) -> Result<Vec<MonthlyCancellations>, ServiceError> {
        self.read(|state, _, _| reports::cancellation_rate_by_month(state))
            .await
    }

    /// Activity per aircraft and departure month
    ///
    /// # Errors
    ///
    /// Fails only if the runtime does.
    pub async fn aircraft_activity_by_month(
        &self,
    ) -> Result<Vec<AircraftActivity>, ServiceError> {
        self.read(|state, _, _| reports::aircraft_activity_by_month(state))
            .await
    }

    /// Scheduled flights that break a composition rule
    ///
    /// Empty unless flights were written around the validator.
    pub async fn composition_audit(&self) -> Vec<CompositionViolation> {
        let policy = &self.policy;
        self.peek(|state| composition::audit(state, policy)).await
    }

    // ========== Operations ==========

    /// Every event in the journal stream, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Journal`] if the stream cannot be read or decoded.
    pub async fn journal(&self) -> Result<Vec<FlightOpsEvent>, ServiceError> {
        let entries = self
            .journal
            .load_events(self.stream_id.clone(), None)
            .await
            .map_err(|e| ServiceError::Journal(e.to_string()))?;
        journal::decode(&entries).map_err(|e| ServiceError::Journal(e.to_string()))
    }

    /// The most recent rejection, if the last command failed
    pub async fn last_error(&self) -> Option<EngineError> {
        self.peek(|state| state.last_error.clone()).await
    }

    /// Stop accepting commands and wait for pending journal writes
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] if writes are still pending at `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ServiceError> {
        self.store.shutdown(timeout).await.map_err(ServiceError::from)
    }
}
