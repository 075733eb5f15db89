//! Flight scheduling through the facade: composition, availability, creation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use chrono::{DateTime, Utc};
use common::{
    Fixture, LARGE, ROOKIE_ATTENDANT, SMALL, TINY, days, ids, large_crew, now, small_crew,
};
use flightdeck_engine::{
    AircraftId, AirportCode, ApiResponse, CandidateFlight, EmployeeId, EngineError, ErrorKind,
    FlightKey, FlightStatus, Money, NewFlight, PolicyConfig, Resource,
};

fn long_haul(crew: Vec<EmployeeId>) -> NewFlight {
    NewFlight {
        source: AirportCode::new("TLV"),
        dest: AirportCode::new("JFK"),
        departure: now() + days(10),
        aircraft: LARGE,
        economy_price: Money::new(400),
        business_price: Some(Money::new(1_500)),
        crew,
    }
}

#[tokio::test]
async fn long_haul_with_full_trained_crew() -> anyhow::Result<()> {
    let fx = Fixture::new(PolicyConfig::default()).await;

    fx.ops.validate_composition(LARGE, 660, large_crew()).await?;
    let flight = long_haul(large_crew());
    let key = flight.key();
    fx.ops.create_flight(flight).await?;

    let details = fx.ops.flight_details(&key).await?;
    assert_eq!(details.flight.status, FlightStatus::Active);
    assert_eq!(details.crew.len(), 9);
    assert_eq!(details.flight.duration_minutes, 660);
    assert_eq!(details.arrival, key.departure + chrono::Duration::minutes(660));
    Ok(())
}

#[tokio::test]
async fn two_pilots_on_a_large_aircraft_are_rejected() {
    let fx = Fixture::new(PolicyConfig::default()).await;
    let crew = ids([1, 2, 11, 12, 13, 14, 15, 16]);

    let err = fx
        .ops
        .validate_composition(LARGE, 660, crew.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));
    assert_eq!(err.to_string(), "Invalid number of pilots. Required: 3, Selected: 2");

    assert_eq!(
        fx.ops.composition_verdict(LARGE, 660, crew.clone()).await,
        ApiResponse::failed("Invalid number of pilots. Required: 3, Selected: 2")
    );
    assert_eq!(
        fx.ops.composition_verdict(LARGE, 660, large_crew()).await,
        ApiResponse::ok("Crew count is valid")
    );

    // No flight is created with the wrong headcount.
    assert!(fx.ops.create_flight(long_haul(crew)).await.is_err());
    assert!(fx.ops.list_flights(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn untrained_crew_cannot_fly_long_haul() {
    let fx = Fixture::new(PolicyConfig::default()).await;
    let mut crew = large_crew();
    crew[8] = ROOKIE_ATTENDANT;

    let err = fx.ops.create_flight(long_haul(crew)).await.unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&EngineError::validation(format!(
            "Crew member {ROOKIE_ATTENDANT} is not trained for long flights."
        )))
    );

    let candidate = fx
        .ops
        .candidate_on_route("TLV", "JFK", now() + days(10))
        .await
        .unwrap();
    let verdict = fx
        .ops
        .check_availability(Resource::Crew(ROOKIE_ATTENDANT), candidate)
        .await
        .unwrap();
    assert!(!verdict.available);
    assert_eq!(verdict.reason, "not trained for long flights");
}

#[tokio::test]
async fn long_haul_needs_a_large_aircraft() {
    let fx = Fixture::new(PolicyConfig::default()).await;
    let mut flight = long_haul(small_crew());
    flight.aircraft = SMALL;
    flight.business_price = None;

    let err = fx.ops.create_flight(flight).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    let candidate = fx
        .ops
        .candidate_on_route("TLV", "JFK", now() + days(10))
        .await
        .unwrap();
    let fleet = fx.ops.aircraft_availability(&candidate).await.unwrap();
    let small = fleet.iter().find(|a| a.id == SMALL).unwrap();
    assert_eq!(small.availability.reason, "long flights require a large aircraft");
    let large = fleet.iter().find(|a| a.id == LARGE).unwrap();
    assert!(large.availability.available);
}

#[tokio::test]
async fn assigned_crew_follow_their_aircraft() {
    let fx = Fixture::new(PolicyConfig::default()).await;
    let flight = long_haul(large_crew());
    let outbound = flight.key();
    fx.ops.create_flight(flight).await.unwrap();
    let arrival = outbound.departure + chrono::Duration::minutes(660);

    // Overlapping departure from the origin
    let overlapping = CandidateFlight::new(
        AirportCode::new("TLV"),
        AirportCode::new("ATH"),
        outbound.departure + chrono::Duration::hours(2),
        120,
    );
    let verdict = fx
        .ops
        .check_availability(Resource::Crew(large_crew()[0]), overlapping)
        .await
        .unwrap();
    assert!(!verdict.available);

    // After landing, only a departure from JFK keeps continuity
    let wrong_airport = CandidateFlight::new(
        AirportCode::new("TLV"),
        AirportCode::new("ATH"),
        arrival + chrono::Duration::hours(1),
        120,
    );
    let verdict = fx
        .ops
        .check_availability(Resource::Aircraft(LARGE), wrong_airport)
        .await
        .unwrap();
    assert!(!verdict.available);

    let homebound = CandidateFlight::new(
        AirportCode::new("JFK"),
        AirportCode::new("TLV"),
        arrival + chrono::Duration::hours(1),
        600,
    );
    let listing = fx.ops.crew_availability(&homebound).await.unwrap();
    let free_pilots: Vec<_> = listing
        .pilots
        .iter()
        .filter(|p| p.availability.available)
        .map(|p| p.id)
        .collect();
    assert!(free_pilots.contains(&large_crew()[0]));

    // Homebound leg reuses the same crew and aircraft
    fx.ops
        .create_flight(NewFlight {
            source: AirportCode::new("JFK"),
            dest: AirportCode::new("TLV"),
            departure: homebound.departure,
            aircraft: LARGE,
            economy_price: Money::new(380),
            business_price: Some(Money::new(1_400)),
            crew: large_crew(),
        })
        .await
        .unwrap();

    // A second outbound at the same time is refused inside the creation unit
    let err = fx
        .ops
        .create_flight(NewFlight {
            departure: outbound.departure + chrono::Duration::hours(1),
            ..long_haul(large_crew())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Conflict));
    assert!(fx.ops.composition_audit().await.is_empty());
}

#[tokio::test]
async fn creation_input_is_validated() {
    let fx = Fixture::new(PolicyConfig::default()).await;

    let mut past = long_haul(large_crew());
    past.departure = now() - days(1);
    let err = fx.ops.create_flight(past).await.unwrap_err();
    assert_eq!(err.to_string(), "Departure time cannot be in the past.");

    let mut negative = long_haul(large_crew());
    negative.economy_price = Money::new(-1);
    let err = fx.ops.create_flight(negative).await.unwrap_err();
    assert_eq!(err.to_string(), "Flight prices cannot be negative.");

    let mut unknown_route = long_haul(large_crew());
    unknown_route.dest = AirportCode::new("ATH");
    unknown_route.source = AirportCode::new("JFK");
    let err = fx.ops.create_flight(unknown_route).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));

    fx.ops.create_flight(long_haul(large_crew())).await.unwrap();
    let err = fx
        .ops
        .create_flight(long_haul(large_crew()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Flight already exists.");
}

#[tokio::test]
async fn cancelled_flight_releases_its_resources() {
    let fx = Fixture::new(PolicyConfig::default()).await;
    let departure = now() + days(5);
    let key = fx.short_flight(SMALL, departure, small_crew()).await;

    fx.ops.cancel_flight(&key).await.unwrap();

    let again = fx
        .ops
        .create_flight(NewFlight {
            source: AirportCode::new("TLV"),
            dest: AirportCode::new("ATH"),
            departure: departure + chrono::Duration::minutes(30),
            aircraft: SMALL,
            economy_price: Money::new(150),
            business_price: None,
            crew: small_crew(),
        })
        .await;
    assert!(again.is_ok());

    let err = fx.ops.cancel_flight(&key).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::State));

    let missing = FlightKey::new(AirportCode::new("TLV"), AirportCode::new("ATH"), now());
    let err = fx.ops.cancel_flight(&missing).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_flights_race_for_a_shared_pilot() {
    let fx = Fixture::new(PolicyConfig::default()).await;
    let departure = now() + days(4);
    let hop = |aircraft: AircraftId, departure: DateTime<Utc>, crew: Vec<EmployeeId>| NewFlight {
        source: AirportCode::new("TLV"),
        dest: AirportCode::new("ATH"),
        departure,
        aircraft,
        economy_price: Money::new(150),
        business_price: None,
        crew,
    };
    // Different aircraft; pilot 4 is on both crews.
    let requests = [
        hop(SMALL, departure, small_crew()),
        hop(TINY, departure + chrono::Duration::minutes(30), ids([4, 6, 20, 21, 22])),
    ];
    let keys: Vec<FlightKey> = requests.iter().map(NewFlight::key).collect();

    let attempts: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let ops = fx.ops.clone();
            tokio::spawn(async move { ops.create_flight(request).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.expect("scheduling task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), Some(ErrorKind::Conflict));

    let mut scheduled = 0;
    for key in &keys {
        if fx.ops.flight_details(key).await.is_ok() {
            scheduled += 1;
        }
    }
    assert_eq!(scheduled, 1);
}
