//! # Flightdeck Engine
//!
//! Flight resource scheduling and booking.
//!
//! The engine decides whether a crew member or aircraft can take a flight,
//! validates crew composition, drives the flight status lifecycle, and keeps
//! the seat ledger. All state lives in one [`AirlineState`] inside a
//! `flightdeck-runtime` store; every command is one atomic reducer pass, and
//! every accepted change is appended to a journal stream.
//!
//! ## Example
//!
//! ```ignore
//! let ops = FlightOps::new(&Config::from_env(), clock, journal, Arc::new(RandomOrderCodes));
//! ops.register_airport("TLV", "Ben Gurion").await?;
//! let receipt = ops.book_seats(booking).await?;
//! println!("{}", receipt.message);
//! ```
//!
//! Collaborators normally use [`FlightOps`]. The pure domain functions in
//! each module take `&AirlineState` and return events or answers, so they can
//! be used and tested without a runtime.

pub mod availability;
pub mod catalog;
pub mod composition;
pub mod config;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod lifecycle;
pub mod queries;
pub mod reducer;
pub mod registry;
pub mod reports;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod types;

pub use availability::{Availability, CandidateFlight, Resource};
pub use config::{Config, FullyBookedBasis, PolicyConfig};
pub use error::{EngineError, ErrorKind, ServiceError};
pub use journal::FlightOpsEvent;
pub use ledger::{BookingRequest, OrderCodeGenerator, RandomOrderCodes, SequentialOrderCodes};
pub use lifecycle::NewFlight;
pub use reducer::{AirlineAction, AirlineEnvironment, AirlineReducer, Command, Outcome};
pub use service::{ApiResponse, BookingReceipt, CancellationReceipt, FlightOps};
pub use state::AirlineState;
pub use types::*;
