//! Booking and seat ledger.
//!
//! A seat on a flight instance is taken iff a non-cancelled order on that
//! instance holds it. Booking re-checks every requested seat against the
//! state it commits to, so two bookings can never both win the same seat.

use crate::catalog;
use crate::config::PolicyConfig;
use crate::error::EngineError;
use crate::journal::FlightOpsEvent;
use crate::state::AirlineState;
use crate::types::{FlightKey, FlightStatus, Money, Order, OrderCode, OrderStatus, Seat};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};

/// Lowest six-digit order code
pub const MIN_ORDER_CODE: u32 = 100_000;
/// Highest six-digit order code
pub const MAX_ORDER_CODE: u32 = 999_999;

const CODE_ATTEMPTS: usize = 32;

/// Source of order codes
pub trait OrderCodeGenerator: Send + Sync {
    /// Propose a code; uniqueness is checked by the caller
    fn next_code(&self) -> OrderCode;
}

/// Uniformly random six-digit codes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrderCodes;

impl OrderCodeGenerator for RandomOrderCodes {
    fn next_code(&self) -> OrderCode {
        OrderCode(rand::thread_rng().gen_range(MIN_ORDER_CODE..=MAX_ORDER_CODE))
    }
}

/// Increasing codes starting at a fixed value, for reproducible tests
#[derive(Debug)]
pub struct SequentialOrderCodes {
    next: AtomicU32,
}

impl SequentialOrderCodes {
    /// Start at [`MIN_ORDER_CODE`]
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(MIN_ORDER_CODE)
    }

    /// Start at `first`
    #[must_use]
    pub const fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }
}

impl Default for SequentialOrderCodes {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderCodeGenerator for SequentialOrderCodes {
    fn next_code(&self) -> OrderCode {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        let span = MAX_ORDER_CODE - MIN_ORDER_CODE + 1;
        OrderCode(MIN_ORDER_CODE + raw.saturating_sub(MIN_ORDER_CODE) % span)
    }
}

/// Draw a code not used by any existing order
///
/// # Errors
///
/// Returns [`EngineError::Conflict`] if every attempt collides.
pub fn allocate_order_code(
    state: &AirlineState,
    codes: &dyn OrderCodeGenerator,
) -> Result<OrderCode, EngineError> {
    std::iter::repeat_with(|| codes.next_code())
        .take(CODE_ATTEMPTS)
        .find(|code| !state.orders.contains_key(code))
        .ok_or_else(|| EngineError::conflict("Could not allocate an order code. Please try again."))
}

/// Request to book seats on a flight
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Flight to book on
    pub flight: FlightKey,
    /// Customer email, the order's access credential
    pub customer_email: String,
    /// Seats to hold
    pub seats: Vec<Seat>,
}

/// Validate a booking and build its order
///
/// The whole selection is accepted or rejected; no partial grants.
///
/// # Errors
///
/// - [`EngineError::NotFound`] for an unknown flight
/// - [`EngineError::Validation`] for an empty, duplicated, or non-existent
///   seat selection or a blank email
/// - [`EngineError::State`] if the flight is completed or cancelled
/// - [`EngineError::Conflict`] if any seat is already taken or the flight is
///   fully booked
pub fn book_seats(
    state: &AirlineState,
    request: BookingRequest,
    code: OrderCode,
    now: DateTime<Utc>,
) -> Result<FlightOpsEvent, EngineError> {
    let flight = state
        .flights
        .get(&request.flight)
        .ok_or_else(|| EngineError::not_found("Flight not found."))?;
    if request.seats.is_empty() {
        return Err(EngineError::validation("No seats selected."));
    }
    let email = request.customer_email.trim();
    if email.is_empty() {
        return Err(EngineError::validation("Customer email is required."));
    }
    match flight.status {
        FlightStatus::Active => {},
        FlightStatus::FullyBooked => {
            return Err(EngineError::conflict("Flight is fully booked."));
        },
        FlightStatus::Completed | FlightStatus::Cancelled => {
            return Err(EngineError::state(format!(
                "Flight is not open for booking ({}).",
                flight.status
            )));
        },
    }

    let aircraft = catalog::lookup_aircraft(state, flight.aircraft)?;
    let mut requested = BTreeSet::new();
    for seat in &request.seats {
        if !requested.insert(*seat) {
            return Err(EngineError::validation(format!(
                "Seat {seat} is selected more than once."
            )));
        }
        if !aircraft.has_seat(*seat) {
            return Err(EngineError::validation(format!(
                "Seat {seat} does not exist on this aircraft."
            )));
        }
    }

    let occupied = state.occupied_seats(&request.flight);
    if let Some(taken) = request.seats.iter().find(|seat| occupied.contains(seat)) {
        return Err(EngineError::conflict(format!("Seat {taken} is already taken.")));
    }

    let total_payment = request
        .seats
        .iter()
        .map(|seat| flight.price(seat.cabin).unwrap_or(Money::ZERO))
        .sum();

    Ok(FlightOpsEvent::SeatsBooked {
        order: Order {
            code,
            customer_email: email.to_string(),
            flight: request.flight,
            total_payment,
            status: OrderStatus::Active,
            placed_at: now,
            seats: request.seats,
        },
    })
}

/// Settlement of a customer cancellation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationQuote {
    /// Amount paid before cancelling
    pub original: Money,
    /// Amount retained
    pub fee: Money,
    /// Amount returned to the customer
    pub refund: Money,
}

/// Look up an order for its owner
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] with `message` for an unknown code or
/// mismatched email.
pub fn owned_order<'a>(
    state: &'a AirlineState,
    code: OrderCode,
    email: &str,
    message: &str,
) -> Result<&'a Order, EngineError> {
    state
        .orders
        .get(&code)
        .filter(|order| order.customer_email.eq_ignore_ascii_case(email.trim()))
        .ok_or_else(|| EngineError::not_found(message))
}

/// Validate a customer cancellation and compute its fee
///
/// # Errors
///
/// - [`EngineError::NotFound`] for an unknown code or mismatched email
/// - [`EngineError::State`] for a cancelled or completed order, or one whose
///   flight departs inside the customer window
pub fn cancel_order(
    state: &AirlineState,
    code: OrderCode,
    email: &str,
    now: DateTime<Utc>,
    policy: &PolicyConfig,
) -> Result<(FlightOpsEvent, CancellationQuote), EngineError> {
    let order = owned_order(state, code, email, "Order not found or access denied.")?;
    match order.status {
        OrderStatus::Active => {},
        OrderStatus::ClientCancellation | OrderStatus::SystemCancellation => {
            return Err(EngineError::state("Order is already cancelled."));
        },
        OrderStatus::Completed => {
            return Err(EngineError::state("Completed orders cannot be cancelled."));
        },
    }

    let window = Duration::hours(i64::from(policy.customer_cancellation_window_hours));
    if order.flight.departure - now < window {
        return Err(EngineError::state(format!(
            "Cancellation is only allowed up to {} hours before the flight (less than the minimum cancellation window).",
            policy.customer_cancellation_window_hours
        )));
    }

    let fee = order.total_payment.basis_points(policy.cancellation_fee_bps);
    let quote = CancellationQuote {
        original: order.total_payment,
        fee,
        refund: order.total_payment - fee,
    };

    Ok((FlightOpsEvent::OrderCancelled { code, fee }, quote))
}

/// Share of seats sold on a departed flight, in percent
///
/// # Errors
///
/// - [`EngineError::NotFound`] for an unknown flight
/// - [`EngineError::State`] if the flight has not departed yet
pub fn occupancy(
    state: &AirlineState,
    key: &FlightKey,
    now: DateTime<Utc>,
) -> Result<f64, EngineError> {
    let flight = state
        .flights
        .get(key)
        .ok_or_else(|| EngineError::not_found("Flight not found."))?;
    if flight.key.departure >= now {
        return Err(EngineError::state(
            "Occupancy is only reported for flights that have departed.",
        ));
    }
    let capacity = catalog::lookup_aircraft(state, flight.aircraft)?.seat_count();
    if capacity == 0 {
        return Ok(0.0);
    }
    #[allow(clippy::cast_precision_loss)] // seat counts are far below 2^52
    let percent = state.occupied_seats(key).len() as f64 / capacity as f64 * 100.0;
    Ok(percent)
}
