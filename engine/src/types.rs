//! Domain types for the scheduling and booking engine.
//!
//! Identifiers, catalog entities, flights, orders, and the status enums with
//! their allowed transitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Airport code, e.g. `TLV`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AirportCode(String);

impl AirportCode {
    /// Creates an airport code, normalised to upper case
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// The code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aircraft tail identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AircraftId(pub u32);

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Employee identification number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub u64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six-digit order code handed to customers
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderCode(pub u32);

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Correlates a command with the outcome the engine settles it with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random `RequestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Money in whole currency units
///
/// Signed so that malformed input (negative prices) can be represented and
/// rejected by validation rather than by the type system at parse time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Highest cabin price a flight accepts
    pub const MAX_PRICE: Self = Self(1_000_000_000);

    /// Creates an amount in whole units
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// The amount in whole units
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Whether the amount is below zero
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `round(self × bps / 10_000)`, rounding halves away from zero
    ///
    /// Saturates at the `i64` bounds.
    #[must_use]
    pub const fn basis_points(self, bps: u32) -> Self {
        let scaled = self.0.saturating_mul(bps as i64);
        let half = if scaled >= 0 { 5_000 } else { -5_000 };
        Self(scaled.saturating_add(half) / 10_000)
    }
}

impl std::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// An airport
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    /// Airport code
    pub code: AirportCode,
    /// Display name
    pub name: String,
}

/// Directional route between two airports
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Departure airport
    pub source: AirportCode,
    /// Arrival airport
    pub dest: AirportCode,
    /// Flight time in minutes, always positive
    pub duration_minutes: u32,
}

/// Aircraft size class
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    /// Wide-body, two cabins
    Large,
    /// Narrow-body, economy only
    Small,
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Large => f.write_str("Large"),
            Self::Small => f.write_str("Small"),
        }
    }
}

/// Seating cabin
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cabin {
    /// Economy cabin
    Economy,
    /// Business cabin
    Business,
}

impl fmt::Display for Cabin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Economy => f.write_str("Economy"),
            Self::Business => f.write_str("Business"),
        }
    }
}

/// Seat grid of one cabin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CabinGrid {
    /// Number of rows
    pub rows: u16,
    /// Seats per row
    pub columns: u16,
}

impl CabinGrid {
    /// Creates a grid
    #[must_use]
    pub const fn new(rows: u16, columns: u16) -> Self {
        Self { rows, columns }
    }

    /// Seats in this grid
    #[must_use]
    pub const fn capacity(self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Whether `(row, column)` lies inside the grid (1-based)
    #[must_use]
    pub const fn contains(self, row: u16, column: u16) -> bool {
        row >= 1 && row <= self.rows && column >= 1 && column <= self.columns
    }
}

/// A physical seat slot on an aircraft
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seat {
    /// Cabin the seat belongs to
    pub cabin: Cabin,
    /// 1-based row
    pub row: u16,
    /// 1-based column
    pub column: u16,
}

impl Seat {
    /// Creates a seat coordinate
    #[must_use]
    pub const fn new(cabin: Cabin, row: u16, column: u16) -> Self {
        Self { cabin, row, column }
    }

    /// Economy seat shorthand
    #[must_use]
    pub const fn economy(row: u16, column: u16) -> Self {
        Self::new(Cabin::Economy, row, column)
    }

    /// Business seat shorthand
    #[must_use]
    pub const fn business(row: u16, column: u16) -> Self {
        Self::new(Cabin::Business, row, column)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.cabin, self.row, self.column)
    }
}

/// An aircraft tail with its cabin configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aircraft {
    /// Tail identifier
    pub id: AircraftId,
    /// Manufacturer name
    pub manufacturer: String,
    /// Purchase date
    pub purchase_date: NaiveDate,
    /// Size class
    pub size: SizeClass,
    /// Economy cabin grid
    pub economy: CabinGrid,
    /// Business cabin grid, present exactly when the aircraft is Large
    pub business: Option<CabinGrid>,
}

impl Aircraft {
    /// Grid of `cabin`, if the aircraft has it
    #[must_use]
    pub const fn grid(&self, cabin: Cabin) -> Option<CabinGrid> {
        match cabin {
            Cabin::Economy => Some(self.economy),
            Cabin::Business => self.business,
        }
    }

    /// Whether the aircraft has a seat at this coordinate
    #[must_use]
    pub fn has_seat(&self, seat: Seat) -> bool {
        self.grid(seat.cabin)
            .is_some_and(|grid| grid.contains(seat.row, seat.column))
    }

    /// Seats in `cabin`
    #[must_use]
    pub fn cabin_capacity(&self, cabin: Cabin) -> usize {
        self.grid(cabin).map_or(0, CabinGrid::capacity)
    }

    /// Seats across all cabins
    #[must_use]
    pub fn seat_count(&self) -> usize {
        self.cabin_capacity(Cabin::Economy) + self.cabin_capacity(Cabin::Business)
    }

    /// Every seat, business first, then row-major
    pub fn seats(&self) -> impl Iterator<Item = Seat> + '_ {
        [Cabin::Business, Cabin::Economy]
            .into_iter()
            .filter_map(|cabin| self.grid(cabin).map(|grid| (cabin, grid)))
            .flat_map(|(cabin, grid)| {
                (1..=grid.rows).flat_map(move |row| {
                    (1..=grid.columns).map(move |column| Seat::new(cabin, row, column))
                })
            })
    }
}

/// Crew role
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrewRole {
    /// Flight deck crew
    Pilot,
    /// Cabin crew
    Attendant,
}

impl fmt::Display for CrewRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pilot => f.write_str("Pilot"),
            Self::Attendant => f.write_str("Attendant"),
        }
    }
}

/// A rostered crew member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    /// Employee number
    pub id: EmployeeId,
    /// Full name
    pub name: String,
    /// Single role held by this employee
    pub role: CrewRole,
    /// Cleared to work long flights
    pub trained_for_long_flights: bool,
}

// ============================================================================
// Flights
// ============================================================================

/// Composite flight key; there is no surrogate flight id
///
/// Ordered by departure first so iteration over a `BTreeMap<FlightKey, _>`
/// yields flights chronologically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    /// Scheduled departure
    pub departure: DateTime<Utc>,
    /// Departure airport
    pub source: AirportCode,
    /// Arrival airport
    pub dest: AirportCode,
}

impl FlightKey {
    /// Creates a flight key
    #[must_use]
    pub fn new(source: AirportCode, dest: AirportCode, departure: DateTime<Utc>) -> Self {
        Self {
            departure,
            source,
            dest,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}→{} {}",
            self.source,
            self.dest,
            self.departure.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Flight status
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlightStatus {
    /// Open for booking
    Active,
    /// No unsold seats left
    FullyBooked,
    /// Departed
    Completed,
    /// Cancelled by the operator
    Cancelled,
}

impl FlightStatus {
    /// Whether no further transitions are possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Allowed transitions of the flight state machine
    ///
    /// ```text
    /// Active ⇄ FullyBooked
    /// Active | FullyBooked → Completed | Cancelled
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::FullyBooked)
                | (Self::FullyBooked, Self::Active)
                | (Self::Active | Self::FullyBooked, Self::Completed | Self::Cancelled)
        )
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("Active"),
            Self::FullyBooked => f.write_str("Fully Booked"),
            Self::Completed => f.write_str("Completed"),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// A scheduled flight instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Composite key
    pub key: FlightKey,
    /// Aircraft operating the flight
    pub aircraft: AircraftId,
    /// Route duration captured when the flight was scheduled
    pub duration_minutes: u32,
    /// Current status
    pub status: FlightStatus,
    /// Price per economy seat
    pub economy_price: Money,
    /// Price per business seat, absent when the aircraft has no business cabin
    pub business_price: Option<Money>,
    /// Assigned crew
    pub crew: Vec<EmployeeId>,
}

impl Flight {
    /// Scheduled arrival
    #[must_use]
    pub fn arrival(&self) -> DateTime<Utc> {
        self.key.departure + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Price of a seat in `cabin`
    #[must_use]
    pub const fn price(&self, cabin: Cabin) -> Option<Money> {
        match cabin {
            Cabin::Economy => Some(self.economy_price),
            Cabin::Business => self.business_price,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Order status
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Booked
    Active,
    /// Flown
    Completed,
    /// Cancelled by the customer; the fee is retained
    ClientCancellation,
    /// Cancelled because the flight was cancelled; fully refunded
    SystemCancellation,
}

impl OrderStatus {
    /// Whether the order no longer holds its seats
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::ClientCancellation | Self::SystemCancellation)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("Active"),
            Self::Completed => f.write_str("Completed"),
            Self::ClientCancellation => f.write_str("Client Cancellation"),
            Self::SystemCancellation => f.write_str("System Cancellation"),
        }
    }
}

/// A customer order and the seats it holds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order code
    pub code: OrderCode,
    /// Customer email
    pub customer_email: String,
    /// Flight the seats are on
    pub flight: FlightKey,
    /// Amount paid; overwritten with the settled amount on cancellation
    pub total_payment: Money,
    /// Current status
    pub status: OrderStatus,
    /// When the order was placed
    pub placed_at: DateTime<Utc>,
    /// Seats held
    pub seats: Vec<Seat>,
}
