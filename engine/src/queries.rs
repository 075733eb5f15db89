//! Read-side queries over flights and orders.
//!
//! Callers reconcile statuses before querying; these functions only read.

use crate::catalog;
use crate::error::EngineError;
use crate::ledger;
use crate::state::AirlineState;
use crate::types::{
    Aircraft, AirportCode, Cabin, CrewMember, Flight, FlightKey, FlightStatus, Money, Order,
    OrderCode, OrderStatus, Seat,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Filter for [`list_flights`]; unset fields match everything
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightFilter {
    /// Exact status
    pub status: Option<FlightStatus>,
    /// Departure airport
    pub source: Option<AirportCode>,
    /// Arrival airport
    pub dest: Option<AirportCode>,
    /// Departing at or after
    pub from: Option<DateTime<Utc>>,
    /// Departing before
    pub to: Option<DateTime<Utc>>,
}

impl FlightFilter {
    fn matches(&self, flight: &Flight) -> bool {
        self.status.is_none_or(|s| s == flight.status)
            && self.source.as_ref().is_none_or(|s| s == &flight.key.source)
            && self.dest.as_ref().is_none_or(|d| d == &flight.key.dest)
            && self.from.is_none_or(|t| flight.key.departure >= t)
            && self.to.is_none_or(|t| flight.key.departure < t)
    }
}

/// Flights matching `filter`, by departure
#[must_use]
pub fn list_flights(state: &AirlineState, filter: &FlightFilter) -> Vec<Flight> {
    state
        .flights
        .values()
        .filter(|flight| filter.matches(flight))
        .cloned()
        .collect()
}

/// Customer flight search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSearch {
    /// Departure airport
    pub source: Option<AirportCode>,
    /// Arrival airport
    pub dest: Option<AirportCode>,
    /// Departure date (UTC)
    pub date: Option<NaiveDate>,
    /// Cabin the price range applies to
    pub cabin: Cabin,
    /// Lowest acceptable price
    pub min_price: Option<Money>,
    /// Highest acceptable price
    pub max_price: Option<Money>,
}

impl Default for FlightSearch {
    fn default() -> Self {
        Self {
            source: None,
            dest: None,
            date: None,
            cabin: Cabin::Economy,
            min_price: None,
            max_price: None,
        }
    }
}

/// A bookable flight offered to customers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOffer {
    /// Flight
    pub key: FlightKey,
    /// Scheduled arrival
    pub arrival: DateTime<Utc>,
    /// Price in the searched cabin
    pub price: Money,
    /// Unsold seats in the searched cabin
    pub seats_left: usize,
}

/// Active future flights matching `search`, by departure
///
/// Flights without the searched cabin are skipped.
#[must_use]
pub fn search_flights(
    state: &AirlineState,
    search: &FlightSearch,
    now: DateTime<Utc>,
) -> Vec<FlightOffer> {
    state
        .flights
        .values()
        .filter(|f| f.status == FlightStatus::Active && f.key.departure > now)
        .filter(|f| search.source.as_ref().is_none_or(|s| s == &f.key.source))
        .filter(|f| search.dest.as_ref().is_none_or(|d| d == &f.key.dest))
        .filter(|f| search.date.is_none_or(|d| f.key.departure.date_naive() == d))
        .filter_map(|f| {
            let price = f.price(search.cabin)?;
            if search.min_price.is_some_and(|min| price < min)
                || search.max_price.is_some_and(|max| price > max)
            {
                return None;
            }
            let capacity = state.aircraft.get(&f.aircraft)?.cabin_capacity(search.cabin);
            let taken = state
                .occupied_seats(&f.key)
                .iter()
                .filter(|seat| seat.cabin == search.cabin)
                .count();
            Some(FlightOffer {
                key: f.key.clone(),
                arrival: f.arrival(),
                price,
                seats_left: capacity.saturating_sub(taken),
            })
        })
        .collect()
}

/// A flight with its aircraft and crew resolved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetails {
    /// The flight
    pub flight: Flight,
    /// Scheduled arrival
    pub arrival: DateTime<Utc>,
    /// Operating aircraft
    pub aircraft: Aircraft,
    /// Rostered crew
    pub crew: Vec<CrewMember>,
    /// Seats held by non-cancelled orders
    pub seats_sold: usize,
}

fn lookup_flight<'a>(state: &'a AirlineState, key: &FlightKey) -> Result<&'a Flight, EngineError> {
    state
        .flights
        .get(key)
        .ok_or_else(|| EngineError::not_found("Flight not found."))
}

/// Resolve a flight's aircraft and crew
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown flight.
pub fn flight_details(state: &AirlineState, key: &FlightKey) -> Result<FlightDetails, EngineError> {
    let flight = lookup_flight(state, key)?;
    let aircraft = catalog::lookup_aircraft(state, flight.aircraft)?.clone();
    let crew = flight
        .crew
        .iter()
        .filter_map(|id| state.crew.get(id).cloned())
        .collect();

    Ok(FlightDetails {
        flight: flight.clone(),
        arrival: flight.arrival(),
        aircraft,
        crew,
        seats_sold: state.occupied_seats(key).len(),
    })
}

/// One seat on a seat map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatState {
    /// Seat coordinate
    pub seat: Seat,
    /// Price in its cabin
    pub price: Money,
    /// Held by a non-cancelled order
    pub taken: bool,
}

/// Every seat of a flight with its taken flag
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown flight.
pub fn seat_map(state: &AirlineState, key: &FlightKey) -> Result<Vec<SeatState>, EngineError> {
    let flight = lookup_flight(state, key)?;
    let aircraft = catalog::lookup_aircraft(state, flight.aircraft)?;
    let occupied = state.occupied_seats(key);

    Ok(aircraft
        .seats()
        .map(|seat| SeatState {
            seat,
            price: flight.price(seat.cabin).unwrap_or(Money::ZERO),
            taken: occupied.contains(&seat),
        })
        .collect())
}

/// Look up an order by code and email
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] unless both match.
pub fn track_order(state: &AirlineState, code: OrderCode, email: &str) -> Result<Order, EngineError> {
    ledger::owned_order(state, code, email, "Order not found. Please check your details.").cloned()
}

/// A customer's order history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrders {
    /// Orders, newest first
    pub orders: Vec<Order>,
    /// What the customer has actually paid across all their orders
    pub total_spending: Money,
}

/// Amount an order contributes to customer spending
#[must_use]
pub const fn spending(order: &Order) -> Money {
    match order.status {
        // Client cancellations already hold only the retained fee.
        OrderStatus::Active | OrderStatus::Completed | OrderStatus::ClientCancellation => {
            order.total_payment
        },
        OrderStatus::SystemCancellation => Money::ZERO,
    }
}

/// Orders placed with `email`, optionally filtered by status
///
/// Total spending covers every order of the customer, independent of the
/// status filter.
#[must_use]
pub fn customer_orders(
    state: &AirlineState,
    email: &str,
    status: Option<OrderStatus>,
) -> CustomerOrders {
    let email = email.trim();
    let mine: Vec<&Order> = state
        .orders
        .values()
        .filter(|order| order.customer_email.eq_ignore_ascii_case(email))
        .collect();

    let total_spending = mine.iter().map(|order| spending(order)).sum();
    let mut orders: Vec<Order> = mine
        .into_iter()
        .filter(|order| status.is_none_or(|s| s == order.status))
        .cloned()
        .collect();
    orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.code.cmp(&a.code)));

    CustomerOrders {
        orders,
        total_spending,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::journal::FlightOpsEvent;
    use crate::types::{AircraftId, CabinGrid, CrewRole, EmployeeId, SizeClass};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn key(dest: &str, days: i64) -> FlightKey {
        FlightKey::new(AirportCode::new("TLV"), AirportCode::new(dest), now() + Duration::days(days))
    }

    fn order(code: u32, flight: FlightKey, email: &str, total: i64, status: OrderStatus, day: i64) -> Order {
        Order {
            code: OrderCode(code),
            customer_email: email.to_string(),
            flight,
            total_payment: Money::new(total),
            status,
            placed_at: now() - Duration::days(day),
            seats: vec![Seat::economy(1, u16::try_from(code % 3 + 1).unwrap())],
        }
    }

    fn airline() -> AirlineState {
        let mut events = vec![
            FlightOpsEvent::AircraftRegistered {
                aircraft: Aircraft {
                    id: AircraftId(1),
                    manufacturer: "Boeing".to_string(),
                    purchase_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
                    size: SizeClass::Large,
                    economy: CabinGrid::new(1, 3),
                    business: Some(CabinGrid::new(1, 1)),
                },
            },
            FlightOpsEvent::CrewMemberHired {
                member: CrewMember {
                    id: EmployeeId(1),
                    name: "Noa Levi".to_string(),
                    role: CrewRole::Pilot,
                    trained_for_long_flights: true,
                },
            },
        ];
        for (dest, days, price) in [("ATH", 3, 120), ("LHR", 5, 300), ("ATH", 9, 90)] {
            events.push(FlightOpsEvent::FlightScheduled {
                flight: Flight {
                    key: key(dest, days),
                    aircraft: AircraftId(1),
                    duration_minutes: 240,
                    status: FlightStatus::Active,
                    economy_price: Money::new(price),
                    business_price: Some(Money::new(price * 3)),
                    crew: vec![EmployeeId(1)],
                },
            });
        }
        events.push(FlightOpsEvent::SeatsBooked {
            order: order(100_001, key("ATH", 3), "dana@example.com", 120, OrderStatus::Active, 3),
        });
        events.push(FlightOpsEvent::SeatsBooked {
            order: order(100_002, key("LHR", 5), "dana@example.com", 300, OrderStatus::Active, 1),
        });
        events.push(FlightOpsEvent::SeatsBooked {
            order: order(100_003, key("ATH", 9), "omer@example.com", 90, OrderStatus::Active, 2),
        });
        AirlineState::replay(&events)
    }

    #[test]
    fn list_flights_applies_filter() {
        let state = airline();
        let filter = FlightFilter {
            dest: Some(AirportCode::new("ATH")),
            from: Some(now() + Duration::days(4)),
            ..FlightFilter::default()
        };
        let flights = list_flights(&state, &filter);
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].key, key("ATH", 9));
        assert_eq!(list_flights(&state, &FlightFilter::default()).len(), 3);
    }

    #[test]
    fn search_respects_cabin_price_range() {
        let state = airline();
        let search = FlightSearch {
            cabin: Cabin::Business,
            max_price: Some(Money::new(400)),
            ..FlightSearch::default()
        };
        let offers = search_flights(&state, &search, now());
        let keys: Vec<_> = offers.iter().map(|o| o.key.clone()).collect();
        assert_eq!(keys, vec![key("ATH", 3), key("ATH", 9)]);
        assert_eq!(offers[0].price, Money::new(360));
        assert_eq!(offers[0].seats_left, 1);

        let economy = search_flights(&state, &FlightSearch::default(), now());
        assert_eq!(economy[0].seats_left, 2);

        let dated = FlightSearch {
            date: Some((now() + Duration::days(5)).date_naive()),
            ..FlightSearch::default()
        };
        assert_eq!(search_flights(&state, &dated, now()).len(), 1);
        assert!(search_flights(&state, &FlightSearch::default(), now() + Duration::days(10)).is_empty());
    }

    #[test]
    fn details_and_seat_map() {
        let state = airline();
        let details = flight_details(&state, &key("ATH", 3)).unwrap();
        assert_eq!(details.crew[0].name, "Noa Levi");
        assert_eq!(details.seats_sold, 1);
        assert_eq!(details.arrival, now() + Duration::days(3) + Duration::hours(4));

        let map = seat_map(&state, &key("ATH", 3)).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.iter().filter(|s| s.taken).count(), 1);
        assert_eq!(map[0].seat, Seat::business(1, 1));
        assert_eq!(map[0].price, Money::new(360));

        assert!(seat_map(&state, &key("JFK", 1)).is_err());
    }

    #[test]
    fn tracking_requires_matching_email() {
        let state = airline();
        assert_eq!(
            track_order(&state, OrderCode(100_001), "dana@example.com").unwrap().code,
            OrderCode(100_001)
        );
        let err = track_order(&state, OrderCode(100_001), "omer@example.com").unwrap_err();
        assert_eq!(err.to_string(), "Order not found. Please check your details.");
    }

    #[test]
    fn customer_history_newest_first_with_spending() {
        let mut state = airline();
        state.apply(&FlightOpsEvent::OrderCancelled {
            code: OrderCode(100_002),
            fee: Money::new(15),
        });

        let history = customer_orders(&state, "dana@example.com", None);
        let codes: Vec<_> = history.orders.iter().map(|o| o.code).collect();
        assert_eq!(codes, vec![OrderCode(100_002), OrderCode(100_001)]);
        assert_eq!(history.total_spending, Money::new(135));

        let active = customer_orders(&state, "dana@example.com", Some(OrderStatus::Active));
        assert_eq!(active.orders.len(), 1);
        assert_eq!(active.total_spending, Money::new(135));
    }
}
