//! Availability checker.
//!
//! Decides whether one resource (a crew member or an aircraft) can take a
//! candidate flight, looking only at the resource's neighbours on its own
//! timeline:
//!
//! - the **prior** assignment (latest departure strictly before the
//!   candidate) must have landed, and landed where the candidate departs
//! - the **next** assignment (earliest departure at or after the candidate)
//!   must leave after the candidate lands, from where the candidate lands
//!
//! Cancelled flights are not part of any timeline. Completed flights are, so
//! the continuity chain stays anchored to where a resource actually is.

use crate::catalog;
use crate::config::PolicyConfig;
use crate::error::EngineError;
use crate::registry;
use crate::state::AirlineState;
use crate::types::{
    AircraftId, AirportCode, CrewMember, CrewRole, EmployeeId, Flight, SizeClass,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The flight a resource is being considered for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFlight {
    /// Departure airport
    pub source: AirportCode,
    /// Arrival airport
    pub dest: AirportCode,
    /// Scheduled departure
    pub departure: DateTime<Utc>,
    /// Flight time in minutes
    pub duration_minutes: u32,
}

impl CandidateFlight {
    /// Candidate with an explicit duration
    #[must_use]
    pub const fn new(
        source: AirportCode,
        dest: AirportCode,
        departure: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            source,
            dest,
            departure,
            duration_minutes,
        }
    }

    /// Candidate whose duration comes from the catalog route
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no route connects the airports.
    pub fn on_route(
        state: &AirlineState,
        source: AirportCode,
        dest: AirportCode,
        departure: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let duration_minutes = catalog::lookup_route(state, &source, &dest)?.duration_minutes;
        Ok(Self::new(source, dest, departure, duration_minutes))
    }

    /// Scheduled arrival
    #[must_use]
    pub fn arrival(&self) -> DateTime<Utc> {
        self.departure + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// A schedulable resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// A pilot or attendant
    Crew(EmployeeId),
    /// An aircraft tail
    Aircraft(AircraftId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crew(id) => write!(f, "crew member {id}"),
            Self::Aircraft(id) => write!(f, "aircraft {id}"),
        }
    }
}

/// Answer of the checker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Whether the resource can take the flight
    pub available: bool,
    /// Human-readable reason
    pub reason: String,
}

impl Availability {
    /// The resource is free
    #[must_use]
    pub fn available() -> Self {
        Self {
            available: true,
            reason: "Available".to_string(),
        }
    }

    /// The resource cannot take the flight
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: reason.into(),
        }
    }

    /// `Ok` when available, otherwise a conflict carrying the reason
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] when unavailable.
    pub fn into_result(self, resource: Resource) -> Result<(), EngineError> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::conflict(format!(
                "{resource} is unavailable: {}",
                self.reason
            )))
        }
    }
}

/// Interval and continuity check against one chronological timeline
///
/// `buffer` is the minimum ground time required between two flights.
pub fn check_timeline<'a>(
    timeline: impl IntoIterator<Item = &'a Flight>,
    candidate: &CandidateFlight,
    buffer: Duration,
) -> Availability {
    let mut prior: Option<&Flight> = None;
    let mut next: Option<&Flight> = None;

    for flight in timeline {
        if flight.key.departure < candidate.departure {
            if prior.is_none_or(|p| flight.key.departure > p.key.departure) {
                prior = Some(flight);
            }
        } else if next.is_none_or(|n| flight.key.departure < n.key.departure) {
            next = Some(flight);
        }
    }

    if let Some(prior) = prior {
        let ready = prior.arrival() + buffer;
        if ready > candidate.departure {
            return Availability::unavailable(format!(
                "busy until {}",
                ready.format(TIME_FORMAT)
            ));
        }
        if prior.key.dest != candidate.source {
            return Availability::unavailable(format!(
                "located at {}, flight departs from {}",
                prior.key.dest, candidate.source
            ));
        }
    }

    if let Some(next) = next {
        if candidate.arrival() + buffer > next.key.departure {
            return Availability::unavailable(format!(
                "conflicts with next flight at {}",
                next.key.departure.format(TIME_FORMAT)
            ));
        }
        if candidate.dest != next.key.source {
            return Availability::unavailable(format!(
                "next flight departs from {}, this flight arrives at {}",
                next.key.source, candidate.dest
            ));
        }
    }

    Availability::available()
}

/// Check a crew member
///
/// Untrained crew are never available for long flights. Crew have no
/// turnaround buffer.
fn check_crew(
    state: &AirlineState,
    member: &CrewMember,
    candidate: &CandidateFlight,
    policy: &PolicyConfig,
) -> Availability {
    if policy.is_long(candidate.duration_minutes) && !member.trained_for_long_flights {
        return Availability::unavailable("not trained for long flights");
    }
    check_timeline(state.crew_timeline(member.id), candidate, Duration::zero())
}

/// Check an aircraft
///
/// Long flights need a Large aircraft. Consecutive flights are separated by
/// the configured turnaround buffer.
fn check_aircraft(
    state: &AirlineState,
    id: AircraftId,
    size: SizeClass,
    candidate: &CandidateFlight,
    policy: &PolicyConfig,
) -> Availability {
    if policy.is_long(candidate.duration_minutes) && size != SizeClass::Large {
        return Availability::unavailable("long flights require a large aircraft");
    }
    let buffer = Duration::minutes(i64::from(policy.turnaround_buffer_minutes));
    check_timeline(state.aircraft_timeline(id), candidate, buffer)
}

/// Check one resource against a candidate flight
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown resource.
pub fn check_availability(
    state: &AirlineState,
    resource: Resource,
    candidate: &CandidateFlight,
    policy: &PolicyConfig,
) -> Result<Availability, EngineError> {
    match resource {
        Resource::Crew(id) => {
            let member = registry::lookup_crew_member(state, id)?;
            Ok(check_crew(state, member, candidate, policy))
        },
        Resource::Aircraft(id) => {
            let aircraft = catalog::lookup_aircraft(state, id)?;
            Ok(check_aircraft(state, id, aircraft.size, candidate, policy))
        },
    }
}

/// Availability of one crew member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewAvailability {
    /// Employee id
    pub id: EmployeeId,
    /// Full name
    pub name: String,
    /// Cleared for long flights
    pub trained_for_long_flights: bool,
    /// Verdict
    pub availability: Availability,
}

/// Availability of the whole roster, split by role
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewAvailabilityListing {
    /// Pilots by employee id
    pub pilots: Vec<CrewAvailability>,
    /// Attendants by employee id
    pub attendants: Vec<CrewAvailability>,
}

/// Availability of one aircraft
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftAvailability {
    /// Tail id
    pub id: AircraftId,
    /// Manufacturer
    pub manufacturer: String,
    /// Size class
    pub size: SizeClass,
    /// Verdict
    pub availability: Availability,
}

/// Check every crew member against a candidate flight
#[must_use]
pub fn crew_availability(
    state: &AirlineState,
    candidate: &CandidateFlight,
    policy: &PolicyConfig,
) -> CrewAvailabilityListing {
    let mut listing = CrewAvailabilityListing::default();
    for member in state.crew.values() {
        let entry = CrewAvailability {
            id: member.id,
            name: member.name.clone(),
            trained_for_long_flights: member.trained_for_long_flights,
            availability: check_crew(state, member, candidate, policy),
        };
        match member.role {
            CrewRole::Pilot => listing.pilots.push(entry),
            CrewRole::Attendant => listing.attendants.push(entry),
        }
    }
    listing
}

/// Check every aircraft against a candidate flight
#[must_use]
pub fn aircraft_availability(
    state: &AirlineState,
    candidate: &CandidateFlight,
    policy: &PolicyConfig,
) -> Vec<AircraftAvailability> {
    state
        .aircraft
        .values()
        .map(|aircraft| AircraftAvailability {
            id: aircraft.id,
            manufacturer: aircraft.manufacturer.clone(),
            size: aircraft.size,
            availability: check_aircraft(state, aircraft.id, aircraft.size, candidate, policy),
        })
        .collect()
}
