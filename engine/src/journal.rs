//! Journal events and their envelope encoding.
//!
//! Every accepted change is described by one [`FlightOpsEvent`]. The reducer
//! applies events to [`AirlineState`](crate::state::AirlineState) and appends
//! them to the journal stream; replaying the stream rebuilds the same state.

use crate::types::{
    Aircraft, Airport, CrewMember, Flight, FlightKey, FlightStatus, Money, Order, OrderCode,
    RequestId, Route,
};
use chrono::{DateTime, Utc};
use flightdeck_core::event::{Event, EventError, SerializedEvent};
use serde::{Deserialize, Serialize};

/// Facts recorded by the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightOpsEvent {
    /// An airport was added to the catalog
    AirportRegistered {
        /// The airport
        airport: Airport,
    },

    /// A directional route was added to the catalog
    RouteRegistered {
        /// The route
        route: Route,
    },

    /// An aircraft and its seat inventory were added
    AircraftRegistered {
        /// The aircraft
        aircraft: Aircraft,
    },

    /// A crew member joined the roster
    CrewMemberHired {
        /// The crew member
        member: CrewMember,
    },

    /// A flight was created together with its crew assignments
    FlightScheduled {
        /// The flight, status `Active`
        flight: Flight,
    },

    /// Reconciliation moved a flight between statuses
    FlightStatusChanged {
        /// Flight
        key: FlightKey,
        /// Expected prior status
        from: FlightStatus,
        /// New status
        to: FlightStatus,
    },

    /// The operator cancelled a flight; every listed order was refunded in full
    FlightCancelled {
        /// Flight
        key: FlightKey,
        /// Status before cancellation
        from: FlightStatus,
        /// Orders moved to System Cancellation
        cascaded_orders: Vec<OrderCode>,
    },

    /// A customer booked seats
    SeatsBooked {
        /// The new order, status `Active`
        order: Order,
    },

    /// A customer cancelled an order and the fee was retained
    OrderCancelled {
        /// Order
        code: OrderCode,
        /// Amount retained, becomes the order's total payment
        fee: Money,
    },
}

impl Event for FlightOpsEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::AirportRegistered { .. } => "AirportRegistered.v1",
            Self::RouteRegistered { .. } => "RouteRegistered.v1",
            Self::AircraftRegistered { .. } => "AircraftRegistered.v1",
            Self::CrewMemberHired { .. } => "CrewMemberHired.v1",
            Self::FlightScheduled { .. } => "FlightScheduled.v1",
            Self::FlightStatusChanged { .. } => "FlightStatusChanged.v1",
            Self::FlightCancelled { .. } => "FlightCancelled.v1",
            Self::SeatsBooked { .. } => "SeatsBooked.v1",
            Self::OrderCancelled { .. } => "OrderCancelled.v1",
        }
    }
}

/// Encode a batch of events with request metadata
///
/// # Errors
///
/// Returns [`EventError::SerializationError`] if any event fails to encode.
pub fn encode(
    events: &[FlightOpsEvent],
    request_id: Option<RequestId>,
    recorded_at: DateTime<Utc>,
) -> Result<Vec<SerializedEvent>, EventError> {
    let metadata = serde_json::json!({
        "request_id": request_id.map(|id| id.to_string()),
        "recorded_at": recorded_at.to_rfc3339(),
    });

    events
        .iter()
        .map(|event| SerializedEvent::from_event(event, Some(metadata.clone())))
        .collect()
}

/// Decode journal entries back into events
///
/// # Errors
///
/// Returns [`EventError::DeserializationError`] for corrupted payloads and
/// [`EventError::UnknownEventType`] when the envelope type does not match the
/// payload.
pub fn decode(entries: &[SerializedEvent]) -> Result<Vec<FlightOpsEvent>, EventError> {
    entries
        .iter()
        .map(|entry| {
            let event = FlightOpsEvent::from_bytes(&entry.data)?;
            if event.event_type() == entry.event_type {
                Ok(event)
            } else {
                Err(EventError::UnknownEventType(entry.event_type.clone()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::AirportCode;
    use flightdeck_testing::test_clock;
    use flightdeck_core::environment::Clock;

    fn tlv() -> FlightOpsEvent {
        FlightOpsEvent::AirportRegistered {
            airport: Airport {
                code: AirportCode::new("TLV"),
                name: "Ben Gurion".to_string(),
            },
        }
    }

    #[test]
    fn batch_carries_request_metadata() {
        let request_id = RequestId::new();
        let encoded = encode(&[tlv()], Some(request_id), test_clock().now()).unwrap();

        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].event_type, "AirportRegistered.v1");
        let metadata = encoded[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["request_id"], request_id.to_string());
        assert_eq!(metadata["recorded_at"], "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn decode_restores_events() {
        let events = vec![
            tlv(),
            FlightOpsEvent::OrderCancelled {
                code: OrderCode(123_456),
                fee: Money::new(23),
            },
        ];
        let encoded = encode(&events, None, test_clock().now()).unwrap();

        assert_eq!(decode(&encoded).unwrap(), events);
    }

    #[test]
    fn mismatched_envelope_is_rejected() {
        let mut encoded = encode(&[tlv()], None, test_clock().now()).unwrap();
        encoded[0].event_type = "RouteRegistered.v1".to_string();

        assert!(matches!(
            decode(&encoded),
            Err(EventError::UnknownEventType(name)) if name == "RouteRegistered.v1"
        ));
    }
}
