//! Engine state and event application.
//!
//! [`AirlineState`] is owned by the store and mutated only by applying
//! [`FlightOpsEvent`]s, both live (inside the reducer) and on recovery.

use crate::config::FullyBookedBasis;
use crate::error::EngineError;
use crate::journal::FlightOpsEvent;
use crate::types::{
    Aircraft, AircraftId, Airport, AirportCode, CrewMember, EmployeeId, Flight, FlightKey,
    FlightStatus, Money, Order, OrderCode, OrderStatus, RequestId, Route, Seat,
};
use std::collections::{BTreeMap, BTreeSet};

/// Everything the engine knows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AirlineState {
    /// Airports by code
    pub airports: BTreeMap<AirportCode, Airport>,
    /// Routes by (source, dest)
    pub routes: BTreeMap<(AirportCode, AirportCode), Route>,
    /// Aircraft by tail id
    pub aircraft: BTreeMap<AircraftId, Aircraft>,
    /// Crew roster by employee id
    pub crew: BTreeMap<EmployeeId, CrewMember>,
    /// Flights, chronological
    pub flights: BTreeMap<FlightKey, Flight>,
    /// Orders by code
    pub orders: BTreeMap<OrderCode, Order>,
    /// Last rejection, for observers of the store
    pub last_error: Option<EngineError>,
    /// Entries the journal stream holds once every issued append lands
    pub journal_len: u64,
    /// Progress of journal appends issued by the reducer
    pub journal_sync: JournalSync,
}

/// Bookkeeping for appends that have not answered yet
///
/// When an append fails the in-memory state is ahead of the stream. New
/// commands are refused until every outstanding append has answered and the
/// state has been rebuilt from the stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournalSync {
    /// Appends issued and not yet answered
    pub in_flight: usize,
    /// An append failed and the state must be rebuilt from the stream
    pub stale: bool,
    /// A rebuild is under way
    pub reloading: bool,
    /// Requests whose append failed, answered once the rebuild finishes
    pub failed: Vec<(RequestId, String)>,
}

impl AirlineState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from journal events, oldest first
    #[must_use]
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a FlightOpsEvent>) -> Self {
        let mut state = Self::new();
        for event in events {
            state.apply(event);
        }
        state
    }

    /// Route between two airports
    #[must_use]
    pub fn route(&self, source: &AirportCode, dest: &AirportCode) -> Option<&Route> {
        self.routes.get(&(source.clone(), dest.clone()))
    }

    /// Orders placed on `key`, in code order
    pub fn orders_for<'a>(&'a self, key: &'a FlightKey) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.values().filter(move |order| &order.flight == key)
    }

    /// Seats held by non-cancelled orders on `key`
    #[must_use]
    pub fn occupied_seats(&self, key: &FlightKey) -> BTreeSet<Seat> {
        self.orders_for(key)
            .filter(|order| !order.status.is_cancelled())
            .flat_map(|order| order.seats.iter().copied())
            .collect()
    }

    /// Seats counted as sold under `basis`
    #[must_use]
    pub fn sold_seats(&self, key: &FlightKey, basis: FullyBookedBasis) -> usize {
        match basis {
            FullyBookedBasis::ActiveOrders => self.occupied_seats(key).len(),
            FullyBookedBasis::AllOrders => self
                .orders_for(key)
                .flat_map(|order| order.seats.iter().copied())
                .collect::<BTreeSet<_>>()
                .len(),
        }
    }

    /// Unsold seats on `key` under `basis`, `None` for unknown flights
    #[must_use]
    pub fn remaining_seats(&self, key: &FlightKey, basis: FullyBookedBasis) -> Option<usize> {
        let flight = self.flights.get(key)?;
        let capacity = self.aircraft.get(&flight.aircraft)?.seat_count();
        Some(capacity.saturating_sub(self.sold_seats(key, basis)))
    }

    /// Non-cancelled flights operated by `aircraft`, chronological
    pub fn aircraft_timeline(&self, aircraft: AircraftId) -> impl Iterator<Item = &Flight> + '_ {
        self.flights
            .values()
            .filter(move |f| f.status != FlightStatus::Cancelled && f.aircraft == aircraft)
    }

    /// Non-cancelled flights `employee` is rostered on, chronological
    pub fn crew_timeline(&self, employee: EmployeeId) -> impl Iterator<Item = &Flight> + '_ {
        self.flights
            .values()
            .filter(move |f| f.status != FlightStatus::Cancelled && f.crew.contains(&employee))
    }

    /// Apply one event
    ///
    /// Status changes are compare-and-set: a change whose `from` no longer
    /// matches, or which the state machine forbids, is ignored.
    pub fn apply(&mut self, event: &FlightOpsEvent) {
        match event {
            FlightOpsEvent::AirportRegistered { airport } => {
                self.airports.insert(airport.code.clone(), airport.clone());
            },
            FlightOpsEvent::RouteRegistered { route } => {
                self.routes
                    .insert((route.source.clone(), route.dest.clone()), route.clone());
            },
            FlightOpsEvent::AircraftRegistered { aircraft } => {
                self.aircraft.insert(aircraft.id, aircraft.clone());
            },
            FlightOpsEvent::CrewMemberHired { member } => {
                self.crew.insert(member.id, member.clone());
            },
            FlightOpsEvent::FlightScheduled { flight } => {
                self.flights.insert(flight.key.clone(), flight.clone());
            },
            FlightOpsEvent::FlightStatusChanged { key, from, to } => {
                self.compare_and_set(key, *from, *to);
            },
            FlightOpsEvent::FlightCancelled {
                key,
                from,
                cascaded_orders,
            } => {
                if self.compare_and_set(key, *from, FlightStatus::Cancelled) {
                    for code in cascaded_orders {
                        if let Some(order) = self.orders.get_mut(code) {
                            order.status = OrderStatus::SystemCancellation;
                            order.total_payment = Money::ZERO;
                        }
                    }
                }
            },
            FlightOpsEvent::SeatsBooked { order } => {
                self.orders.insert(order.code, order.clone());
            },
            FlightOpsEvent::OrderCancelled { code, fee } => {
                if let Some(order) = self.orders.get_mut(code) {
                    order.status = OrderStatus::ClientCancellation;
                    order.total_payment = *fee;
                }
            },
        }
    }

    fn compare_and_set(&mut self, key: &FlightKey, from: FlightStatus, to: FlightStatus) -> bool {
        match self.flights.get_mut(key) {
            Some(flight) if flight.status == from && from.can_transition_to(to) => {
                flight.status = to;
                true
            },
            _ => false,
        }
    }
}
