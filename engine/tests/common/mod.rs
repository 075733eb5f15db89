//! Shared fixture for engine integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use flightdeck_engine::{
    Aircraft, AircraftId, AirportCode, BookingRequest, BookingReceipt, Cabin, CabinGrid, Config,
    CrewMember, CrewRole, EmployeeId, FlightKey, FlightOps, Money, NewFlight, PolicyConfig, Seat,
    SequentialOrderCodes, ServiceError, SizeClass,
};
use flightdeck_core::event_store::EventStore;
use flightdeck_testing::{InMemoryEventStore, ManualClock, test_clock};
use std::sync::Arc;

/// Boeing, 30x6 economy, 4x4 business
pub const LARGE: AircraftId = AircraftId(1);
/// Airbus, 3x2 economy
pub const SMALL: AircraftId = AircraftId(2);
/// Embraer, a single economy seat
pub const TINY: AircraftId = AircraftId(3);

/// Untrained pilot
pub const ROOKIE_PILOT: EmployeeId = EmployeeId(7);
/// Untrained attendant
pub const ROOKIE_ATTENDANT: EmployeeId = EmployeeId(23);

pub struct Fixture {
    pub ops: FlightOps,
    pub clock: ManualClock,
    pub journal: Arc<InMemoryEventStore>,
    pub config: Config,
}

/// 2025-01-01 00:00 UTC
pub fn now() -> DateTime<Utc> {
    use flightdeck_core::environment::Clock;
    test_clock().now()
}

pub fn ids(raw: impl IntoIterator<Item = u64>) -> Vec<EmployeeId> {
    raw.into_iter().map(EmployeeId).collect()
}

/// Pilots 1..=3, attendants 11..=16
pub fn large_crew() -> Vec<EmployeeId> {
    ids([1, 2, 3, 11, 12, 13, 14, 15, 16])
}

/// Pilots 4 and 5, attendants 17..=19
pub fn small_crew() -> Vec<EmployeeId> {
    ids([4, 5, 17, 18, 19])
}

/// Pilot 6 and 8, attendants 20..=22
pub fn spare_small_crew() -> Vec<EmployeeId> {
    ids([6, 8, 20, 21, 22])
}

impl Fixture {
    /// Engine with airports, routes, fleet, and roster registered
    pub async fn new(policy: PolicyConfig) -> Self {
        let journal = Arc::new(InMemoryEventStore::new());
        Self::writing_through(policy, journal.clone(), journal).await
    }

    /// Engine that appends through `store`; `journal` is the stream it ends up in
    pub async fn writing_through(
        policy: PolicyConfig,
        store: Arc<dyn EventStore>,
        journal: Arc<InMemoryEventStore>,
    ) -> Self {
        let config = Config {
            policy,
            ..Config::default()
        };
        let clock = ManualClock::starting_at(now());
        let ops = FlightOps::new(
            &config,
            Arc::new(clock.clone()),
            store,
            Arc::new(SequentialOrderCodes::new()),
        );

        let fixture = Self {
            ops,
            clock,
            journal,
            config,
        };
        fixture.seed().await.expect("seed data is valid");
        fixture
    }

    async fn seed(&self) -> Result<(), ServiceError> {
        for (code, name) in [
            ("TLV", "Ben Gurion"),
            ("JFK", "John F. Kennedy"),
            ("ATH", "Athens"),
        ] {
            self.ops.register_airport(code, name).await?;
        }
        for (source, dest, minutes) in [
            ("TLV", "JFK", 660),
            ("JFK", "TLV", 600),
            ("TLV", "ATH", 120),
            ("ATH", "TLV", 120),
        ] {
            self.ops.register_route(source, dest, minutes).await?;
        }

        let purchased = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
        for aircraft in [
            Aircraft {
                id: LARGE,
                manufacturer: "Boeing".to_string(),
                purchase_date: purchased,
                size: SizeClass::Large,
                economy: CabinGrid::new(30, 6),
                business: Some(CabinGrid::new(4, 4)),
            },
            Aircraft {
                id: SMALL,
                manufacturer: "Airbus".to_string(),
                purchase_date: purchased,
                size: SizeClass::Small,
                economy: CabinGrid::new(3, 2),
                business: None,
            },
            Aircraft {
                id: TINY,
                manufacturer: "Embraer".to_string(),
                purchase_date: purchased,
                size: SizeClass::Small,
                economy: CabinGrid::new(1, 1),
                business: None,
            },
        ] {
            self.ops.register_aircraft(aircraft).await?;
        }

        for id in (1..=8).chain(11..=23) {
            let role = if id <= 8 {
                CrewRole::Pilot
            } else {
                CrewRole::Attendant
            };
            self.ops
                .hire_crew_member(CrewMember {
                    id: EmployeeId(id),
                    name: format!("Crew {id}"),
                    role,
                    trained_for_long_flights: EmployeeId(id) != ROOKIE_PILOT
                        && EmployeeId(id) != ROOKIE_ATTENDANT,
                })
                .await?;
        }
        Ok(())
    }

    /// TLV→ATH on `aircraft` with `crew`, economy at $150
    pub async fn short_flight(
        &self,
        aircraft: AircraftId,
        departure: DateTime<Utc>,
        crew: Vec<EmployeeId>,
    ) -> FlightKey {
        let flight = NewFlight {
            source: AirportCode::new("TLV"),
            dest: AirportCode::new("ATH"),
            departure,
            aircraft,
            economy_price: Money::new(150),
            business_price: None,
            crew,
        };
        let key = flight.key();
        self.ops.create_flight(flight).await.expect("flight is valid");
        key
    }

    pub async fn book(
        &self,
        key: &FlightKey,
        email: &str,
        seats: Vec<Seat>,
    ) -> Result<BookingReceipt, ServiceError> {
        self.ops
            .book_seats(BookingRequest {
                flight: key.clone(),
                customer_email: email.to_string(),
                seats,
            })
            .await
    }
}

pub fn economy(row: u16, column: u16) -> Seat {
    Seat::new(Cabin::Economy, row, column)
}

pub fn days(n: i64) -> Duration {
    Duration::days(n)
}
