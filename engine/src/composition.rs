//! Crew and aircraft composition rules.
//!
//! | Aircraft | Pilots | Attendants |
//! |----------|--------|------------|
//! | Large    | 3      | 6          |
//! | Small    | 2      | 3          |
//!
//! Long flights need a Large aircraft and a fully trained crew.

use crate::catalog;
use crate::config::PolicyConfig;
use crate::error::EngineError;
use crate::registry;
use crate::state::AirlineState;
use crate::types::{Aircraft, AircraftId, CrewRole, EmployeeId, FlightKey, FlightStatus, SizeClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Message returned for a valid roster
pub const CREW_COUNT_VALID: &str = "Crew count is valid";

/// Required headcount per role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewRequirement {
    /// Pilots
    pub pilots: usize,
    /// Attendants
    pub attendants: usize,
}

/// Headcount an aircraft of `size` must fly with
#[must_use]
pub const fn required_crew(size: SizeClass) -> CrewRequirement {
    match size {
        SizeClass::Large => CrewRequirement {
            pilots: 3,
            attendants: 6,
        },
        SizeClass::Small => CrewRequirement {
            pilots: 2,
            attendants: 3,
        },
    }
}

/// Validate a proposed roster for an aircraft on a route of `route_minutes`
///
/// # Errors
///
/// - [`EngineError::Validation`] for an empty or duplicated selection, a
///   wrong headcount, a long flight on a Small aircraft, or untrained crew on
///   a long flight
/// - [`EngineError::NotFound`] for an unknown aircraft or employee
pub fn validate_composition(
    state: &AirlineState,
    aircraft: AircraftId,
    route_minutes: u32,
    crew: &[EmployeeId],
    policy: &PolicyConfig,
) -> Result<(), EngineError> {
    if crew.is_empty() {
        return Err(EngineError::validation("No crew members selected."));
    }
    let aircraft = catalog::lookup_aircraft(state, aircraft)?;
    check_roster(state, aircraft, route_minutes, crew, policy)
}

fn check_roster(
    state: &AirlineState,
    aircraft: &Aircraft,
    route_minutes: u32,
    crew: &[EmployeeId],
    policy: &PolicyConfig,
) -> Result<(), EngineError> {
    let mut seen = BTreeSet::new();
    let mut members = Vec::with_capacity(crew.len());
    for id in crew {
        if !seen.insert(*id) {
            return Err(EngineError::validation(format!(
                "Crew member {id} is selected more than once."
            )));
        }
        members.push(registry::lookup_crew_member(state, *id)?);
    }

    let long = policy.is_long(route_minutes);
    if long && aircraft.size != SizeClass::Large {
        return Err(EngineError::validation(format!(
            "Long flights ({} minutes or more) require a large aircraft.",
            policy.long_flight_minutes
        )));
    }

    let required = required_crew(aircraft.size);
    let pilots = members.iter().filter(|m| m.role == CrewRole::Pilot).count();
    let attendants = members.len() - pilots;

    if pilots != required.pilots {
        return Err(EngineError::validation(format!(
            "Invalid number of pilots. Required: {}, Selected: {pilots}",
            required.pilots
        )));
    }
    if attendants != required.attendants {
        return Err(EngineError::validation(format!(
            "Invalid number of attendants. Required: {}, Selected: {attendants}",
            required.attendants
        )));
    }

    if long {
        if let Some(untrained) = members.iter().find(|m| !m.trained_for_long_flights) {
            return Err(EngineError::validation(format!(
                "Crew member {} is not trained for long flights.",
                untrained.id
            )));
        }
    }

    Ok(())
}

/// A scheduled flight that breaks a composition rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionViolation {
    /// Offending flight
    pub flight: FlightKey,
    /// Broken rule
    pub message: String,
}

/// Re-check every non-cancelled flight against the composition rules
#[must_use]
pub fn audit(state: &AirlineState, policy: &PolicyConfig) -> Vec<CompositionViolation> {
    state
        .flights
        .values()
        .filter(|flight| flight.status != FlightStatus::Cancelled)
        .filter_map(|flight| {
            let result = catalog::lookup_aircraft(state, flight.aircraft).and_then(|aircraft| {
                check_roster(state, aircraft, flight.duration_minutes, &flight.crew, policy)
            });
            result.err().map(|error| CompositionViolation {
                flight: flight.key.clone(),
                message: error.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::journal::FlightOpsEvent;
    use crate::types::{AirportCode, CabinGrid, CrewMember, Flight, Money};
    use chrono::{NaiveDate, TimeZone, Utc};

    const LARGE: AircraftId = AircraftId(1);
    const SMALL: AircraftId = AircraftId(2);

    fn fleet_and_crew() -> AirlineState {
        let mut events = vec![
            FlightOpsEvent::AircraftRegistered {
                aircraft: Aircraft {
                    id: LARGE,
                    manufacturer: "Boeing".to_string(),
                    purchase_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
                    size: SizeClass::Large,
                    economy: CabinGrid::new(30, 6),
                    business: Some(CabinGrid::new(4, 4)),
                },
            },
            FlightOpsEvent::AircraftRegistered {
                aircraft: Aircraft {
                    id: SMALL,
                    manufacturer: "Airbus".to_string(),
                    purchase_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                    size: SizeClass::Small,
                    economy: CabinGrid::new(20, 6),
                    business: None,
                },
            },
        ];
        // 1..=4 trained pilots, 5 untrained pilot, 11..=17 trained attendants, 18 untrained
        for id in 1..=5 {
            events.push(hire(id, CrewRole::Pilot, id != 5));
        }
        for id in 11..=18 {
            events.push(hire(id, CrewRole::Attendant, id != 18));
        }
        AirlineState::replay(&events)
    }

    fn hire(id: u64, role: CrewRole, trained: bool) -> FlightOpsEvent {
        FlightOpsEvent::CrewMemberHired {
            member: CrewMember {
                id: EmployeeId(id),
                name: format!("Crew {id}"),
                role,
                trained_for_long_flights: trained,
            },
        }
    }

    fn ids(raw: &[u64]) -> Vec<EmployeeId> {
        raw.iter().copied().map(EmployeeId).collect()
    }

    #[test]
    fn full_trained_crew_on_long_route() {
        let state = fleet_and_crew();
        let crew = ids(&[1, 2, 3, 11, 12, 13, 14, 15, 16]);
        validate_composition(&state, LARGE, 660, &crew, &PolicyConfig::default()).unwrap();
    }

    #[test]
    fn two_pilots_on_large_aircraft() {
        let state = fleet_and_crew();
        let crew = ids(&[1, 2, 11, 12, 13, 14, 15, 16]);
        let err = validate_composition(&state, LARGE, 660, &crew, &PolicyConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::validation("Invalid number of pilots. Required: 3, Selected: 2")
        );
    }

    #[test]
    fn attendant_count_is_exact() {
        let state = fleet_and_crew();
        let crew = ids(&[1, 2, 11, 12, 13, 14]);
        let err =
            validate_composition(&state, SMALL, 90, &crew, &PolicyConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid number of attendants. Required: 3, Selected: 4"
        );
    }

    #[test]
    fn long_route_needs_large_aircraft() {
        let state = fleet_and_crew();
        let crew = ids(&[1, 2, 11, 12, 13]);
        let err =
            validate_composition(&state, SMALL, 360, &crew, &PolicyConfig::default()).unwrap_err();
        assert!(err.to_string().contains("require a large aircraft"));

        validate_composition(&state, SMALL, 359, &crew, &PolicyConfig::default()).unwrap();
    }

    #[test]
    fn untrained_crew_on_long_route() {
        let state = fleet_and_crew();
        let crew = ids(&[1, 2, 3, 11, 12, 13, 14, 15, 18]);
        let err = validate_composition(&state, LARGE, 660, &crew, &PolicyConfig::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Crew member 18 is not trained for long flights.");
    }

    #[test]
    fn selection_errors() {
        let state = fleet_and_crew();
        let policy = PolicyConfig::default();

        let err = validate_composition(&state, SMALL, 90, &[], &policy).unwrap_err();
        assert_eq!(err.to_string(), "No crew members selected.");

        let err = validate_composition(&state, SMALL, 90, &ids(&[1, 1, 11, 12, 13]), &policy)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = validate_composition(&state, SMALL, 90, &ids(&[1, 99]), &policy).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = validate_composition(&state, AircraftId(42), 90, &ids(&[1]), &policy)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn audit_flags_short_crewed_flights() {
        let mut state = fleet_and_crew();
        let departure = Utc.with_ymd_and_hms(2025, 5, 1, 6, 0, 0).unwrap();
        for (crew, hour) in [(ids(&[1, 2, 11, 12, 13]), 6), (ids(&[3, 11]), 12)] {
            state.apply(&FlightOpsEvent::FlightScheduled {
                flight: Flight {
                    key: FlightKey::new(
                        AirportCode::new("TLV"),
                        AirportCode::new("ATH"),
                        departure + chrono::Duration::hours(hour),
                    ),
                    aircraft: SMALL,
                    duration_minutes: 120,
                    status: FlightStatus::Active,
                    economy_price: Money::new(90),
                    business_price: None,
                    crew,
                },
            });
        }

        let violations = audit(&state, &PolicyConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Invalid number of pilots. Required: 2, Selected: 1"
        );
    }
}
