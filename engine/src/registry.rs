//! Resource registry: the crew roster.

use crate::error::EngineError;
use crate::journal::FlightOpsEvent;
use crate::state::AirlineState;
use crate::types::{CrewMember, CrewRole, EmployeeId};

/// Validate a new crew member
///
/// # Errors
///
/// - [`EngineError::Validation`] for a blank name
/// - [`EngineError::Conflict`] if the employee id is taken
pub fn hire_crew_member(
    state: &AirlineState,
    member: CrewMember,
) -> Result<FlightOpsEvent, EngineError> {
    if member.name.trim().is_empty() {
        return Err(EngineError::validation("Employee name cannot be empty."));
    }
    if state.crew.contains_key(&member.id) {
        return Err(EngineError::conflict("Employee with this ID already exists."));
    }

    Ok(FlightOpsEvent::CrewMemberHired { member })
}

/// Look up a crew member
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown employee id.
pub fn lookup_crew_member(
    state: &AirlineState,
    id: EmployeeId,
) -> Result<&CrewMember, EngineError> {
    state
        .crew
        .get(&id)
        .ok_or_else(|| EngineError::not_found(format!("Crew member {id} not found.")))
}

/// Crew holding `role`, by employee id
pub fn list_crew(state: &AirlineState, role: CrewRole) -> impl Iterator<Item = &CrewMember> {
    state.crew.values().filter(move |member| member.role == role)
}
