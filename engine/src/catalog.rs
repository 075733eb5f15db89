//! Catalog store: airports, routes, aircraft, and their seat inventory.
//!
//! Writes validate against the current state and return the event to apply;
//! they never mutate state themselves.

use crate::error::EngineError;
use crate::journal::FlightOpsEvent;
use crate::state::AirlineState;
use crate::types::{Aircraft, AircraftId, Airport, AirportCode, CabinGrid, Route, Seat, SizeClass};

/// Validate a new airport
///
/// # Errors
///
/// - [`EngineError::Validation`] for a blank code or name
/// - [`EngineError::Conflict`] if the code is taken
pub fn register_airport(
    state: &AirlineState,
    code: AirportCode,
    name: &str,
) -> Result<FlightOpsEvent, EngineError> {
    if code.as_str().is_empty() {
        return Err(EngineError::validation("Airport code cannot be empty."));
    }
    if name.trim().is_empty() {
        return Err(EngineError::validation("Airport name cannot be empty."));
    }
    if state.airports.contains_key(&code) {
        return Err(EngineError::conflict("Airport already exists."));
    }

    Ok(FlightOpsEvent::AirportRegistered {
        airport: Airport {
            code,
            name: name.trim().to_string(),
        },
    })
}

/// Validate a new directional route
///
/// # Errors
///
/// - [`EngineError::NotFound`] for an unknown airport
/// - [`EngineError::Validation`] for a loop or a zero duration
/// - [`EngineError::Conflict`] if the route exists
pub fn register_route(
    state: &AirlineState,
    source: AirportCode,
    dest: AirportCode,
    duration_minutes: u32,
) -> Result<FlightOpsEvent, EngineError> {
    lookup_airport(state, &source)?;
    lookup_airport(state, &dest)?;
    if source == dest {
        return Err(EngineError::validation(
            "Source and Destination airports cannot be the same.",
        ));
    }
    if duration_minutes == 0 {
        return Err(EngineError::validation("Route duration must be positive."));
    }
    if state.route(&source, &dest).is_some() {
        return Err(EngineError::conflict("Route already exists."));
    }

    Ok(FlightOpsEvent::RouteRegistered {
        route: Route {
            source,
            dest,
            duration_minutes,
        },
    })
}

/// Validate a new aircraft and its cabin configuration
///
/// The seat inventory is derived from the cabin grids, so it exists exactly
/// when the aircraft does.
///
/// # Errors
///
/// - [`EngineError::Validation`] for empty grids or a cabin layout that does
///   not match the size class
/// - [`EngineError::Conflict`] if the tail id is taken
pub fn register_aircraft(
    state: &AirlineState,
    aircraft: Aircraft,
) -> Result<FlightOpsEvent, EngineError> {
    if aircraft.manufacturer.trim().is_empty() {
        return Err(EngineError::validation("Manufacturer cannot be empty."));
    }
    validate_grid(aircraft.economy)?;
    match (aircraft.size, aircraft.business) {
        (SizeClass::Large, None) => {
            return Err(EngineError::validation(
                "Large aircraft must have a business class configuration.",
            ));
        },
        (SizeClass::Small, Some(_)) => {
            return Err(EngineError::validation("Small aircraft cannot have business class."));
        },
        (SizeClass::Large, Some(grid)) => validate_grid(grid)?,
        (SizeClass::Small, None) => {},
    }
    if state.aircraft.contains_key(&aircraft.id) {
        return Err(EngineError::conflict("Aircraft ID already exists."));
    }

    Ok(FlightOpsEvent::AircraftRegistered { aircraft })
}

fn validate_grid(grid: CabinGrid) -> Result<(), EngineError> {
    if grid.rows == 0 || grid.columns == 0 {
        return Err(EngineError::validation(
            "Rows and columns must be at least 1.",
        ));
    }
    Ok(())
}

/// Look up an airport
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown code.
pub fn lookup_airport<'a>(
    state: &'a AirlineState,
    code: &AirportCode,
) -> Result<&'a Airport, EngineError> {
    state
        .airports
        .get(code)
        .ok_or_else(|| EngineError::not_found(format!("Airport {code} not found.")))
}

/// Look up the route between two airports
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] if no route connects them.
pub fn lookup_route<'a>(
    state: &'a AirlineState,
    source: &AirportCode,
    dest: &AirportCode,
) -> Result<&'a Route, EngineError> {
    state
        .route(source, dest)
        .ok_or_else(|| EngineError::not_found(format!("No route from {source} to {dest}.")))
}

/// Look up an aircraft
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown tail id.
pub fn lookup_aircraft(state: &AirlineState, id: AircraftId) -> Result<&Aircraft, EngineError> {
    state
        .aircraft
        .get(&id)
        .ok_or_else(|| EngineError::not_found(format!("Aircraft {id} not found.")))
}

/// Every aircraft, by tail id
#[must_use]
pub fn list_aircraft(state: &AirlineState) -> Vec<Aircraft> {
    state.aircraft.values().cloned().collect()
}

/// Every airport, by name
#[must_use]
pub fn list_airports(state: &AirlineState) -> Vec<Airport> {
    let mut airports: Vec<_> = state.airports.values().cloned().collect();
    airports.sort_by(|a, b| a.name.cmp(&b.name));
    airports
}

/// Physical seat inventory of an aircraft
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown tail id.
pub fn seat_inventory(state: &AirlineState, id: AircraftId) -> Result<Vec<Seat>, EngineError> {
    Ok(lookup_aircraft(state, id)?.seats().collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;

    fn with_airports() -> AirlineState {
        let mut state = AirlineState::new();
        for (code, name) in [("TLV", "Ben Gurion"), ("JFK", "John F. Kennedy")] {
            let event = register_airport(&state, AirportCode::new(code), name).unwrap();
            state.apply(&event);
        }
        state
    }

    fn aircraft(size: SizeClass, business: Option<CabinGrid>) -> Aircraft {
        Aircraft {
            id: AircraftId(1),
            manufacturer: "Boeing".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
            size,
            economy: CabinGrid::new(20, 6),
            business,
        }
    }

    #[test]
    fn duplicate_airport_conflicts() {
        let state = with_airports();
        let err = register_airport(&state, AirportCode::new("tlv"), "Again").unwrap_err();
        assert_eq!(err, EngineError::conflict("Airport already exists."));
    }

    #[test]
    fn route_validation() {
        let mut state = with_airports();
        let tlv = AirportCode::new("TLV");
        let jfk = AirportCode::new("JFK");

        let err = register_route(&state, tlv.clone(), AirportCode::new("LHR"), 300).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = register_route(&state, tlv.clone(), tlv.clone(), 300).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = register_route(&state, tlv.clone(), jfk.clone(), 0).unwrap_err();
        assert_eq!(err.to_string(), "Route duration must be positive.");

        let event = register_route(&state, tlv.clone(), jfk.clone(), 660).unwrap();
        state.apply(&event);
        assert_eq!(lookup_route(&state, &tlv, &jfk).unwrap().duration_minutes, 660);
        assert!(lookup_route(&state, &jfk, &tlv).is_err());

        let err = register_route(&state, tlv, jfk, 650).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn cabin_layout_must_match_size() {
        let state = AirlineState::new();

        let err = register_aircraft(&state, aircraft(SizeClass::Large, None)).unwrap_err();
        assert_eq!(err.to_string(), "Large aircraft must have a business class configuration.");

        let err = register_aircraft(&state, aircraft(SizeClass::Small, Some(CabinGrid::new(2, 4))))
            .unwrap_err();
        assert_eq!(err.to_string(), "Small aircraft cannot have business class.");

        let err = register_aircraft(&state, aircraft(SizeClass::Large, Some(CabinGrid::new(0, 4))))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn registered_aircraft_has_seat_inventory() {
        let mut state = AirlineState::new();
        let event =
            register_aircraft(&state, aircraft(SizeClass::Large, Some(CabinGrid::new(2, 4))))
                .unwrap();
        state.apply(&event);

        assert_eq!(seat_inventory(&state, AircraftId(1)).unwrap().len(), 128);

        let err =
            register_aircraft(&state, aircraft(SizeClass::Large, Some(CabinGrid::new(2, 4))))
                .unwrap_err();
        assert_eq!(err.to_string(), "Aircraft ID already exists.");
    }
}
