//! Management reports: the numbers behind the dashboards, no charts.

#![allow(clippy::cast_precision_loss)] // seat counts, minutes, and order counts stay far below 2^52

use crate::config::PolicyConfig;
use crate::state::AirlineState;
use crate::types::{
    AircraftId, AirportCode, Cabin, CrewRole, EmployeeId, FlightKey, FlightStatus, Money,
    OrderStatus, SizeClass,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occupancy of one departed flight
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightOccupancy {
    /// Flight
    pub key: FlightKey,
    /// Seats sold over seats on the aircraft, in percent
    pub percent: f64,
}

/// Occupancy across departed, non-cancelled flights
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupancyReport {
    /// Per flight, by departure
    pub flights: Vec<FlightOccupancy>,
    /// Mean over `flights`, zero when there are none
    pub average: f64,
}

/// Occupancy of every flight that has departed by `now`
#[must_use]
pub fn occupancy_report(state: &AirlineState, now: DateTime<Utc>) -> OccupancyReport {
    let flights: Vec<FlightOccupancy> = state
        .flights
        .values()
        .filter(|f| f.status != FlightStatus::Cancelled && f.key.departure < now)
        .filter_map(|f| {
            let capacity = state.aircraft.get(&f.aircraft)?.seat_count();
            (capacity > 0).then(|| FlightOccupancy {
                key: f.key.clone(),
                percent: state.occupied_seats(&f.key).len() as f64 / capacity as f64 * 100.0,
            })
        })
        .collect();

    let average = if flights.is_empty() {
        0.0
    } else {
        flights.iter().map(|f| f.percent).sum::<f64>() / flights.len() as f64
    };

    OccupancyReport { flights, average }
}

/// Revenue of one (manufacturer, size, cabin) group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueLine {
    /// Aircraft manufacturer
    pub manufacturer: String,
    /// Aircraft size class
    pub size: SizeClass,
    /// Cabin
    pub cabin: Cabin,
    /// Seats sold times cabin price
    pub revenue: Money,
}

/// Revenue from Active and Completed orders, by aircraft type and cabin
#[must_use]
pub fn revenue_by_aircraft(state: &AirlineState) -> Vec<RevenueLine> {
    let mut totals: BTreeMap<(String, SizeClass, Cabin), Money> = BTreeMap::new();

    for order in state
        .orders
        .values()
        .filter(|o| matches!(o.status, OrderStatus::Active | OrderStatus::Completed))
    {
        let Some(flight) = state.flights.get(&order.flight) else {
            continue;
        };
        let Some(aircraft) = state.aircraft.get(&flight.aircraft) else {
            continue;
        };
        for seat in &order.seats {
            let price = flight.price(seat.cabin).unwrap_or(Money::ZERO);
            let slot = totals
                .entry((aircraft.manufacturer.clone(), aircraft.size, seat.cabin))
                .or_default();
            *slot = *slot + price;
        }
    }

    totals
        .into_iter()
        .map(|((manufacturer, size, cabin), revenue)| RevenueLine {
            manufacturer,
            size,
            cabin,
            revenue,
        })
        .collect()
}

/// Flight hours of one crew member
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrewHours {
    /// Employee id
    pub id: EmployeeId,
    /// Full name
    pub name: String,
    /// Role
    pub role: CrewRole,
    /// Hours on long flights
    pub long_hours: f64,
    /// Hours on short flights
    pub short_hours: f64,
}

impl CrewHours {
    /// Long plus short hours
    #[must_use]
    pub fn total_hours(&self) -> f64 {
        self.long_hours + self.short_hours
    }
}

/// Hours flown per crew member over non-cancelled flights, by employee id
///
/// Crew without any assignment are omitted.
#[must_use]
pub fn crew_hours(state: &AirlineState, policy: &PolicyConfig) -> Vec<CrewHours> {
    state
        .crew
        .values()
        .filter_map(|member| {
            let (long, short) = state.crew_timeline(member.id).fold((0u64, 0u64), |(l, s), f| {
                if policy.is_long(f.duration_minutes) {
                    (l + u64::from(f.duration_minutes), s)
                } else {
                    (l, s + u64::from(f.duration_minutes))
                }
            });
            (long + short > 0).then(|| CrewHours {
                id: member.id,
                name: member.name.clone(),
                role: member.role,
                long_hours: long as f64 / 60.0,
                short_hours: short as f64 / 60.0,
            })
        })
        .collect()
}

/// Cancellations in one order month
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCancellations {
    /// `YYYY-MM` of the order date
    pub month: String,
    /// Orders placed that month
    pub total_orders: usize,
    /// Of those, cancelled by the customer or the airline
    pub cancelled_orders: usize,
    /// `cancelled / total × 100`
    pub rate: f64,
}

/// Cancellation rate by the month orders were placed
///
/// Client and system cancellations both count.
#[must_use]
pub fn cancellation_rate_by_month(state: &AirlineState) -> Vec<MonthlyCancellations> {
    let mut months: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for order in state.orders.values() {
        let entry = months
            .entry(order.placed_at.format("%Y-%m").to_string())
            .or_default();
        entry.0 += 1;
        if order.status.is_cancelled() {
            entry.1 += 1;
        }
    }

    months
        .into_iter()
        .map(|(month, (total, cancelled))| MonthlyCancellations {
            month,
            total_orders: total,
            cancelled_orders: cancelled,
            rate: cancelled as f64 / total as f64 * 100.0,
        })
        .collect()
}

/// One aircraft's activity in one departure month
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AircraftActivity {
    /// Aircraft
    pub aircraft: AircraftId,
    /// `YYYY-MM` of departure
    pub month: String,
    /// Flights not cancelled, flown or still scheduled
    pub flights_performed: usize,
    /// Cancelled flights
    pub flights_cancelled: usize,
    /// Minutes of non-cancelled flights over the minutes in a 30-day month, in percent
    pub utilization: f64,
    /// Most frequent (source, dest) that month
    pub dominant_route: Option<(AirportCode, AirportCode)>,
}

const MONTH_MINUTES: f64 = 30.0 * 24.0 * 60.0;

#[derive(Default)]
struct MonthTally {
    performed: usize,
    cancelled: usize,
    minutes: u64,
    routes: BTreeMap<(AirportCode, AirportCode), usize>,
}

/// Activity per aircraft and departure month
#[must_use]
pub fn aircraft_activity_by_month(state: &AirlineState) -> Vec<AircraftActivity> {
    let mut tallies: BTreeMap<(AircraftId, String), MonthTally> = BTreeMap::new();

    for flight in state.flights.values() {
        let tally = tallies
            .entry((flight.aircraft, flight.key.departure.format("%Y-%m").to_string()))
            .or_default();
        if flight.status == FlightStatus::Cancelled {
            tally.cancelled += 1;
        } else {
            tally.performed += 1;
            tally.minutes += u64::from(flight.duration_minutes);
        }
        *tally
            .routes
            .entry((flight.key.source.clone(), flight.key.dest.clone()))
            .or_default() += 1;
    }

    tallies
        .into_iter()
        .map(|((aircraft, month), tally)| {
            // Ties go to the alphabetically first route.
            let dominant_route = tally
                .routes
                .iter()
                .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then(rb.cmp(ra)))
                .map(|(route, _)| route.clone());
            AircraftActivity {
                aircraft,
                month,
                flights_performed: tally.performed,
                flights_cancelled: tally.cancelled,
                utilization: tally.minutes as f64 / MONTH_MINUTES * 100.0,
                dominant_route,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::journal::FlightOpsEvent;
    use crate::types::{Aircraft, CabinGrid, CrewMember, Flight, Order, OrderCode, Seat};
    use chrono::{NaiveDate, TimeZone};

    fn t(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, hour, 0, 0).unwrap()
    }

    fn flight(source: &str, dest: &str, at: DateTime<Utc>, minutes: u32, status: FlightStatus) -> Flight {
        Flight {
            key: FlightKey::new(AirportCode::new(source), AirportCode::new(dest), at),
            aircraft: AircraftId(1),
            duration_minutes: minutes,
            status,
            economy_price: Money::new(100),
            business_price: Some(Money::new(500)),
            crew: vec![EmployeeId(1)],
        }
    }

    fn order(code: u32, flight: &Flight, seats: Vec<Seat>, status: OrderStatus, placed: DateTime<Utc>) -> Order {
        Order {
            code: OrderCode(code),
            customer_email: "dana@example.com".to_string(),
            flight: flight.key.clone(),
            total_payment: Money::new(0),
            status,
            placed_at: placed,
            seats,
        }
    }

    fn airline() -> AirlineState {
        let a = flight("TLV", "JFK", t(3, 1, 8), 660, FlightStatus::Completed);
        let b = flight("JFK", "TLV", t(3, 2, 8), 600, FlightStatus::Completed);
        let c = flight("TLV", "ATH", t(3, 20, 8), 120, FlightStatus::Cancelled);
        let d = flight("TLV", "JFK", t(3, 25, 8), 660, FlightStatus::Active);

        let mut events = vec![
            FlightOpsEvent::AircraftRegistered {
                aircraft: Aircraft {
                    id: AircraftId(1),
                    manufacturer: "Boeing".to_string(),
                    purchase_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
                    size: SizeClass::Large,
                    economy: CabinGrid::new(3, 2),
                    business: Some(CabinGrid::new(1, 2)),
                },
            },
            FlightOpsEvent::CrewMemberHired {
                member: CrewMember {
                    id: EmployeeId(1),
                    name: "Noa Levi".to_string(),
                    role: CrewRole::Pilot,
                    trained_for_long_flights: true,
                },
            },
        ];
        events.extend([&a, &b, &c, &d].map(|f| FlightOpsEvent::FlightScheduled { flight: f.clone() }));
        events.extend([
            order(1, &a, vec![Seat::economy(1, 1), Seat::business(1, 1)], OrderStatus::Active, t(1, 10, 0)),
            order(2, &a, vec![Seat::economy(1, 2)], OrderStatus::ClientCancellation, t(1, 12, 0)),
            order(3, &b, vec![Seat::economy(1, 1), Seat::economy(2, 1), Seat::economy(3, 1), Seat::economy(1, 2)], OrderStatus::Completed, t(2, 1, 0)),
            order(4, &c, vec![Seat::economy(1, 1)], OrderStatus::SystemCancellation, t(2, 3, 0)),
        ].map(|o| FlightOpsEvent::SeatsBooked { order: o }));
        AirlineState::replay(&events)
    }

    #[test]
    fn occupancy_averages_departed_flights() {
        let state = airline();
        let report = occupancy_report(&state, t(3, 21, 0));

        // a: 2 of 8 seats, b: 4 of 8; c is cancelled, d has not departed.
        assert_eq!(report.flights.len(), 2);
        assert_eq!(report.flights[0].percent, 25.0);
        assert_eq!(report.flights[1].percent, 50.0);
        assert_eq!(report.average, 37.5);

        assert_eq!(occupancy_report(&state, t(1, 1, 0)).average, 0.0);
    }

    #[test]
    fn revenue_groups_by_cabin() {
        let lines = revenue_by_aircraft(&airline());
        assert_eq!(
            lines,
            vec![
                RevenueLine {
                    manufacturer: "Boeing".to_string(),
                    size: SizeClass::Large,
                    cabin: Cabin::Economy,
                    revenue: Money::new(500),
                },
                RevenueLine {
                    manufacturer: "Boeing".to_string(),
                    size: SizeClass::Large,
                    cabin: Cabin::Business,
                    revenue: Money::new(500),
                },
            ]
        );
    }

    #[test]
    fn crew_hours_split_long_and_short() {
        let hours = crew_hours(&airline(), &PolicyConfig::default());
        assert_eq!(hours.len(), 1);
        // a and d are 660 minutes, b is 600; c is cancelled.
        assert_eq!(hours[0].long_hours, 32.0);
        assert_eq!(hours[0].short_hours, 0.0);
        assert_eq!(hours[0].total_hours(), 32.0);
    }

    #[test]
    fn cancellation_rate_counts_both_kinds() {
        let months = cancellation_rate_by_month(&airline());
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2025-01");
        assert_eq!(months[0].cancelled_orders, 1);
        assert_eq!(months[0].rate, 50.0);
        // Order 4 was cancelled by the airline.
        assert_eq!(months[1].month, "2025-02");
        assert_eq!(months[1].total_orders, 2);
        assert_eq!(months[1].cancelled_orders, 1);
        assert_eq!(months[1].rate, 50.0);
    }

    #[test]
    fn activity_per_aircraft_month() {
        let activity = aircraft_activity_by_month(&airline());
        assert_eq!(activity.len(), 1);
        let march = &activity[0];
        assert_eq!(march.month, "2025-03");
        // d has not flown yet but still counts.
        assert_eq!(march.flights_performed, 3);
        assert_eq!(march.flights_cancelled, 1);
        assert_eq!(march.utilization, f64::from(660 + 600 + 660) / 43_200.0 * 100.0);
        assert_eq!(
            march.dominant_route,
            Some((AirportCode::new("TLV"), AirportCode::new("JFK")))
        );
    }
}
