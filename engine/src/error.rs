//! Error taxonomy of the engine.
//!
//! Every rejection carries a human-readable message that collaborators render
//! verbatim, so `Display` prints the bare message without a kind prefix.

use flightdeck_runtime::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A rejected command or query
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    /// Malformed input or a broken composition rule, rejected before any write
    #[error("{0}")]
    Validation(String),

    /// A resource or seat is already taken
    #[error("{0}")]
    Conflict(String),

    /// Unknown flight, order, airport, aircraft, or employee
    #[error("{0}")]
    NotFound(String),

    /// The target is in the wrong state or outside a time window
    #[error("{0}")]
    State(String),
}

impl EngineError {
    /// Shorthand for [`EngineError::Validation`]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`EngineError::Conflict`]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Shorthand for [`EngineError::NotFound`]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Shorthand for [`EngineError::State`]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Classification tag
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::State(_) => ErrorKind::State,
        }
    }

    /// The human-readable message
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::Conflict(m) | Self::NotFound(m) | Self::State(m) => m,
        }
    }
}

/// Classification of an [`EngineError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`EngineError::Validation`]
    Validation,
    /// See [`EngineError::Conflict`]
    Conflict,
    /// See [`EngineError::NotFound`]
    NotFound,
    /// See [`EngineError::State`]
    State,
}

impl ErrorKind {
    /// Label used in metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::State => "state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the [`FlightOps`](crate::FlightOps) facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The engine rejected the request
    #[error(transparent)]
    Rejected(#[from] EngineError),

    /// The runtime could not process the request
    #[error("runtime failure: {0}")]
    Runtime(#[from] StoreError),

    /// The journal could not be read, decoded, or written
    #[error("journal failure: {0}")]
    Journal(String),
}

impl ServiceError {
    /// The domain rejection, if this is one
    #[must_use]
    pub const fn rejection(&self) -> Option<&EngineError> {
        match self {
            Self::Rejected(error) => Some(error),
            Self::Runtime(_) | Self::Journal(_) => None,
        }
    }

    /// Kind of the domain rejection, if this is one
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.rejection().map(EngineError::kind)
    }
}
