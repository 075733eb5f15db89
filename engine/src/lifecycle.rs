//! Flight lifecycle: creation, operator cancellation, and status
//! reconciliation.
//!
//! ```text
//! Active ⇄ FullyBooked        seat-driven, reversible
//! Active | FullyBooked → Completed   departure has passed
//! Active | FullyBooked → Cancelled   operator, terminal
//! ```

use crate::availability::{self, CandidateFlight, Resource};
use crate::catalog;
use crate::composition;
use crate::config::PolicyConfig;
use crate::error::EngineError;
use crate::journal::FlightOpsEvent;
use crate::registry;
use crate::state::AirlineState;
use crate::types::{
    AircraftId, AirportCode, EmployeeId, Flight, FlightKey, FlightStatus, Money,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Request to schedule a flight
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlight {
    /// Departure airport
    pub source: AirportCode,
    /// Arrival airport
    pub dest: AirportCode,
    /// Scheduled departure
    pub departure: DateTime<Utc>,
    /// Aircraft to operate the flight
    pub aircraft: AircraftId,
    /// Price per economy seat
    pub economy_price: Money,
    /// Price per business seat, required iff the aircraft has a business cabin
    pub business_price: Option<Money>,
    /// Crew roster
    pub crew: Vec<EmployeeId>,
}

impl NewFlight {
    /// Key the flight will be stored under
    #[must_use]
    pub fn key(&self) -> FlightKey {
        FlightKey::new(self.source.clone(), self.dest.clone(), self.departure)
    }
}

/// Validate a new flight and its roster in one unit
///
/// Every resource is re-checked for availability here, against the state the
/// flight would be committed to, so a conflicting assignment accepted earlier
/// can never be overwritten.
///
/// # Errors
///
/// - [`EngineError::Validation`] for negative or oversized prices, a loop route, a past
///   departure, a price/cabin mismatch, or a broken composition rule
/// - [`EngineError::NotFound`] for an unknown route, aircraft, or employee
/// - [`EngineError::Conflict`] if the key is taken or a resource is busy
pub fn create_flight(
    state: &AirlineState,
    request: NewFlight,
    now: DateTime<Utc>,
    policy: &PolicyConfig,
) -> Result<FlightOpsEvent, EngineError> {
    if request.economy_price.is_negative()
        || request.business_price.is_some_and(Money::is_negative)
    {
        return Err(EngineError::validation("Flight prices cannot be negative."));
    }
    if request.economy_price > Money::MAX_PRICE
        || request.business_price.is_some_and(|p| p > Money::MAX_PRICE)
    {
        return Err(EngineError::validation(format!(
            "Flight prices cannot exceed {}.",
            Money::MAX_PRICE
        )));
    }
    if request.source == request.dest {
        return Err(EngineError::validation(
            "Source and Destination airports cannot be the same.",
        ));
    }
    if request.departure < now {
        return Err(EngineError::validation("Departure time cannot be in the past."));
    }
    if request.crew.is_empty() {
        return Err(EngineError::validation("No crew members selected."));
    }

    let route = catalog::lookup_route(state, &request.source, &request.dest)?;
    let aircraft = catalog::lookup_aircraft(state, request.aircraft)?;
    for id in &request.crew {
        registry::lookup_crew_member(state, *id)?;
    }

    let key = request.key();
    if state.flights.contains_key(&key) {
        return Err(EngineError::conflict("Flight already exists."));
    }

    match (aircraft.business.is_some(), request.business_price.is_some()) {
        (true, false) => {
            return Err(EngineError::validation(
                "Business price is required for aircraft with a business cabin.",
            ));
        },
        (false, true) => {
            return Err(EngineError::validation(
                "Aircraft has no business cabin; business price must be empty.",
            ));
        },
        _ => {},
    }

    composition::validate_composition(
        state,
        aircraft.id,
        route.duration_minutes,
        &request.crew,
        policy,
    )?;

    let candidate = CandidateFlight::new(
        request.source.clone(),
        request.dest.clone(),
        request.departure,
        route.duration_minutes,
    );
    let resources = std::iter::once(Resource::Aircraft(aircraft.id))
        .chain(request.crew.iter().copied().map(Resource::Crew));
    for resource in resources {
        availability::check_availability(state, resource, &candidate, policy)?
            .into_result(resource)?;
    }

    Ok(FlightOpsEvent::FlightScheduled {
        flight: Flight {
            key,
            aircraft: aircraft.id,
            duration_minutes: route.duration_minutes,
            status: FlightStatus::Active,
            economy_price: request.economy_price,
            business_price: request.business_price,
            crew: request.crew,
        },
    })
}

/// Validate an operator cancellation and collect the orders it refunds
///
/// # Errors
///
/// - [`EngineError::NotFound`] for an unknown flight
/// - [`EngineError::State`] for a terminal flight or one departing inside the
///   operator window
pub fn cancel_flight(
    state: &AirlineState,
    key: &FlightKey,
    now: DateTime<Utc>,
    policy: &PolicyConfig,
) -> Result<FlightOpsEvent, EngineError> {
    let flight = state
        .flights
        .get(key)
        .ok_or_else(|| EngineError::not_found("Flight not found"))?;

    let window = Duration::hours(i64::from(policy.operator_cancellation_window_hours));
    if flight.status.is_terminal() || flight.key.departure - now < window {
        return Err(EngineError::state(format!(
            "Could not cancel flight (less than {} hours before departure or already cancelled)",
            policy.operator_cancellation_window_hours
        )));
    }

    let cascaded_orders = state
        .orders_for(key)
        .filter(|order| !order.status.is_cancelled())
        .map(|order| order.code)
        .collect();

    Ok(FlightOpsEvent::FlightCancelled {
        key: key.clone(),
        from: flight.status,
        cascaded_orders,
    })
}

/// Status changes that bring every flight up to date with `now`
///
/// Applying the result and reconciling again yields no further changes.
#[must_use]
pub fn reconcile(
    state: &AirlineState,
    now: DateTime<Utc>,
    policy: &PolicyConfig,
) -> Vec<FlightOpsEvent> {
    state
        .flights
        .values()
        .filter(|flight| !flight.status.is_terminal())
        .filter_map(|flight| {
            let to = if flight.key.departure < now {
                FlightStatus::Completed
            } else {
                let remaining = state
                    .remaining_seats(&flight.key, policy.fully_booked_basis)
                    .unwrap_or(0);
                match flight.status {
                    FlightStatus::Active if remaining == 0 => FlightStatus::FullyBooked,
                    FlightStatus::FullyBooked if remaining > 0 => FlightStatus::Active,
                    _ => return None,
                }
            };
            Some(FlightOpsEvent::FlightStatusChanged {
                key: flight.key.clone(),
                from: flight.status,
                to,
            })
        })
        .collect()
}
