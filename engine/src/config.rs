//! Configuration management for the engine.
//!
//! Loads configuration from environment variables (and a `.env` file when one
//! is present) with defaults matching the airline's published policy.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Business rules
    pub policy: PolicyConfig,
    /// Store and journal settings
    pub runtime: RuntimeConfig,
    /// Log filter
    pub logging: LoggingConfig,
}

/// Which orders count as holding seats when deciding Fully Booked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullyBookedBasis {
    /// Seats of cancelled orders are free again
    #[default]
    ActiveOrders,
    /// Seats of cancelled orders still count as sold
    AllOrders,
}

impl FromStr for FullyBookedBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active_orders" | "active" => Ok(Self::ActiveOrders),
            "all_orders" | "all" => Ok(Self::AllOrders),
            other => Err(format!("unknown fully-booked basis: {other}")),
        }
    }
}

impl fmt::Display for FullyBookedBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveOrders => f.write_str("active_orders"),
            Self::AllOrders => f.write_str("all_orders"),
        }
    }
}

/// Time windows, fees, and thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum hours before departure for a customer to cancel an order
    pub customer_cancellation_window_hours: u32,
    /// Minimum hours before departure for the operator to cancel a flight
    pub operator_cancellation_window_hours: u32,
    /// Fee retained on customer cancellation, in basis points
    pub cancellation_fee_bps: u32,
    /// Route duration from which a flight counts as long
    pub long_flight_minutes: u32,
    /// Minimum ground time between two flights of the same aircraft
    pub turnaround_buffer_minutes: u32,
    /// Seat basis for Fully Booked reconciliation
    pub fully_booked_basis: FullyBookedBasis,
}

impl PolicyConfig {
    /// Override the customer cancellation window
    #[must_use]
    pub const fn with_customer_cancellation_window_hours(mut self, hours: u32) -> Self {
        self.customer_cancellation_window_hours = hours;
        self
    }

    /// Override the operator cancellation window
    #[must_use]
    pub const fn with_operator_cancellation_window_hours(mut self, hours: u32) -> Self {
        self.operator_cancellation_window_hours = hours;
        self
    }

    /// Override the aircraft turnaround buffer
    #[must_use]
    pub const fn with_turnaround_buffer_minutes(mut self, minutes: u32) -> Self {
        self.turnaround_buffer_minutes = minutes;
        self
    }

    /// Override the Fully Booked seat basis
    #[must_use]
    pub const fn with_fully_booked_basis(mut self, basis: FullyBookedBasis) -> Self {
        self.fully_booked_basis = basis;
        self
    }

    /// Whether a route of `duration_minutes` is a long flight
    #[must_use]
    pub const fn is_long(&self, duration_minutes: u32) -> bool {
        duration_minutes >= self.long_flight_minutes
    }

    /// Fee as a percentage label, e.g. `5%` or `2.5%`
    #[must_use]
    pub fn fee_percent_label(&self) -> String {
        let whole = self.cancellation_fee_bps / 100;
        let frac = self.cancellation_fee_bps % 100;
        if frac == 0 {
            format!("{whole}%")
        } else {
            format!("{whole}.{}%", format!("{frac:02}").trim_end_matches('0'))
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            customer_cancellation_window_hours: 72,
            operator_cancellation_window_hours: 72,
            cancellation_fee_bps: 500,
            long_flight_minutes: 360,
            turnaround_buffer_minutes: 0,
            fully_booked_basis: FullyBookedBasis::ActiveOrders,
        }
    }
}

/// Store and journal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of the store's action broadcast channel
    pub broadcast_capacity: usize,
    /// How long a facade call waits for its outcome
    pub request_timeout_ms: u64,
    /// Journal stream that receives every accepted change
    pub journal_stream: String,
}

impl RuntimeConfig {
    /// Request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            request_timeout_ms: 5_000,
            journal_stream: "flight-ops".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `flightdeck_engine=debug`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let policy_defaults = PolicyConfig::default();
        let runtime_defaults = RuntimeConfig::default();

        Self {
            policy: PolicyConfig {
                customer_cancellation_window_hours: lookup(
                    "FLIGHTDECK_CUSTOMER_CANCELLATION_WINDOW_HOURS",
                )
                .and_then(|s| s.parse().ok())
                .unwrap_or(policy_defaults.customer_cancellation_window_hours),
                operator_cancellation_window_hours: lookup(
                    "FLIGHTDECK_OPERATOR_CANCELLATION_WINDOW_HOURS",
                )
                .and_then(|s| s.parse().ok())
                .unwrap_or(policy_defaults.operator_cancellation_window_hours),
                cancellation_fee_bps: lookup("FLIGHTDECK_CANCELLATION_FEE_BPS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(policy_defaults.cancellation_fee_bps),
                long_flight_minutes: lookup("FLIGHTDECK_LONG_FLIGHT_MINUTES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(policy_defaults.long_flight_minutes),
                turnaround_buffer_minutes: lookup("FLIGHTDECK_TURNAROUND_BUFFER_MINUTES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(policy_defaults.turnaround_buffer_minutes),
                fully_booked_basis: lookup("FLIGHTDECK_FULLY_BOOKED_BASIS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(policy_defaults.fully_booked_basis),
            },
            runtime: RuntimeConfig {
                broadcast_capacity: lookup("FLIGHTDECK_BROADCAST_CAPACITY")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(runtime_defaults.broadcast_capacity),
                request_timeout_ms: lookup("FLIGHTDECK_REQUEST_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(runtime_defaults.request_timeout_ms),
                journal_stream: lookup("FLIGHTDECK_JOURNAL_STREAM")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(runtime_defaults.journal_stream),
            },
            logging: LoggingConfig {
                filter: lookup("FLIGHTDECK_LOG").unwrap_or_else(|| "info".to_string()),
            },
        }
    }
}
