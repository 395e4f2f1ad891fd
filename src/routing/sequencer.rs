use serde::Serialize;
use uuid::Uuid;

use crate::models::courier::GeoPoint;
use crate::models::delivery::{Delivery, DeliveryStatus};

/// Where a courier currently is, as reported by the courier app.
#[derive(Debug, Clone, Copy)]
pub struct CourierPosition {
    pub courier_id: Uuid,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutePointKind {
    CourierPosition,
    Pickup,
    Dropoff,
}

/// One stop on a courier's route. Derived on every request, never stored;
/// `id` is the courier or delivery the point came from so tracking views
/// can correlate it back.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePoint {
    pub id: Uuid,
    pub kind: RoutePointKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub sequence_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub points: Vec<RoutePoint>,
    pub total_distance_km: f64,
    pub total_duration_minutes: u32,
}

/// Orders a courier's active deliveries into a stop sequence.
///
/// Deliveries are visited soonest-deadline-first (stable, so equal
/// deadlines keep their input order). The route starts at the courier's
/// reported position when one exists, goes to the pickup of the most
/// urgent delivery, then hits every dropoff in deadline order. Totals are
/// the sums of the distances and durations already stored on the
/// deliveries; nothing is re-measured here.
///
/// Returns `None` when there is nothing active to route.
pub fn sequence(position: Option<CourierPosition>, deliveries: &[Delivery]) -> Option<Route> {
    if deliveries.is_empty() {
        return None;
    }

    let mut sorted: Vec<&Delivery> = deliveries.iter().collect();
    sorted.sort_by_key(|delivery| delivery.estimated_delivery_time);

    let mut points = Vec::with_capacity(sorted.len() + 2);
    let mut sequence_number = 1u32;

    if let Some(position) = position {
        points.push(RoutePoint {
            id: position.courier_id,
            kind: RoutePointKind::CourierPosition,
            address: None,
            lat: position.location.lat,
            lng: position.location.lng,
            sequence_number,
            status: None,
            customer_name: None,
            estimated_arrival: None,
        });
        sequence_number += 1;
    }

    let first = sorted[0];
    points.push(RoutePoint {
        id: first.id,
        kind: RoutePointKind::Pickup,
        address: Some(first.pickup.address.clone()),
        lat: first.pickup.lat,
        lng: first.pickup.lng,
        sequence_number,
        status: Some(first.status),
        customer_name: None,
        estimated_arrival: None,
    });
    sequence_number += 1;

    for delivery in &sorted {
        points.push(RoutePoint {
            id: delivery.id,
            kind: RoutePointKind::Dropoff,
            address: Some(delivery.dropoff.address.clone()),
            lat: delivery.dropoff.lat,
            lng: delivery.dropoff.lng,
            sequence_number,
            status: Some(delivery.status),
            customer_name: Some(delivery.customer_name.clone()),
            estimated_arrival: Some(
                delivery
                    .estimated_delivery_time
                    .format("%H:%M")
                    .to_string(),
            ),
        });
        sequence_number += 1;
    }

    let total_distance_km = sorted.iter().map(|delivery| delivery.distance_km).sum();
    let total_duration_minutes = sorted
        .iter()
        .map(|delivery| delivery.duration_minutes)
        .sum();

    Some(Route {
        points,
        total_distance_km,
        total_duration_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::delivery::Location;
    use chrono::{TimeZone, Utc};

    fn delivery_due_at(hour: u32, minute: u32, distance_km: f64, duration_minutes: u32) -> Delivery {
        let due = Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap();
        Delivery {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            customer_name: "Dana".to_string(),
            courier_id: Some(Uuid::new_v4()),
            status: DeliveryStatus::Assigned,
            pickup: Location {
                address: "1 Market St".to_string(),
                lat: 40.74,
                lng: -73.99,
            },
            dropoff: Location {
                address: "99 Hudson St".to_string(),
                lat: 40.72,
                lng: -74.01,
            },
            assigned_at: due - chrono::Duration::minutes(45),
            estimated_delivery_time: due,
            actual_delivery_time: None,
            distance_km,
            duration_minutes,
            updated_at: due - chrono::Duration::minutes(45),
        }
    }

    fn position() -> CourierPosition {
        CourierPosition {
            courier_id: Uuid::new_v4(),
            location: GeoPoint {
                lat: 40.75,
                lng: -73.98,
            },
        }
    }

    #[test]
    fn empty_active_set_yields_no_route() {
        assert!(sequence(Some(position()), &[]).is_none());
    }

    #[test]
    fn single_delivery_route_has_position_pickup_and_dropoff() {
        let delivery = delivery_due_at(14, 30, 4.0, 18);
        let route = sequence(Some(position()), &[delivery]).unwrap();

        let kinds: Vec<RoutePointKind> = route.points.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RoutePointKind::CourierPosition,
                RoutePointKind::Pickup,
                RoutePointKind::Dropoff,
            ]
        );
        let numbers: Vec<u32> = route.points.iter().map(|p| p.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn without_a_position_fix_the_route_starts_at_the_pickup() {
        let delivery = delivery_due_at(14, 30, 4.0, 18);
        let route = sequence(None, &[delivery]).unwrap();

        assert_eq!(route.points[0].kind, RoutePointKind::Pickup);
        assert_eq!(route.points[0].sequence_number, 1);
    }

    #[test]
    fn dropoffs_are_ordered_by_deadline_not_by_input_order() {
        let late = delivery_due_at(16, 0, 2.0, 10);
        let early = delivery_due_at(13, 15, 2.0, 10);
        let middle = delivery_due_at(14, 45, 2.0, 10);
        let expected = vec![early.id, middle.id, late.id];

        let route = sequence(None, &[late, early, middle]).unwrap();
        let dropoff_ids: Vec<Uuid> = route
            .points
            .iter()
            .filter(|p| p.kind == RoutePointKind::Dropoff)
            .map(|p| p.id)
            .collect();

        assert_eq!(dropoff_ids, expected);
    }

    #[test]
    fn pickup_belongs_to_the_most_urgent_delivery() {
        let late = delivery_due_at(16, 0, 2.0, 10);
        let early = delivery_due_at(13, 15, 2.0, 10);
        let early_id = early.id;

        let route = sequence(None, &[late, early]).unwrap();
        let pickup = route
            .points
            .iter()
            .find(|p| p.kind == RoutePointKind::Pickup)
            .unwrap();

        assert_eq!(pickup.id, early_id);
    }

    #[test]
    fn totals_are_sums_of_stored_fields() {
        let a = delivery_due_at(13, 0, 5.2, 21);
        let b = delivery_due_at(15, 0, 3.1, 14);

        let route = sequence(None, &[a, b]).unwrap();

        assert_eq!(route.total_distance_km, 5.2 + 3.1);
        assert_eq!(route.total_duration_minutes, 35);
    }

    #[test]
    fn arrival_estimates_use_24_hour_clock() {
        let delivery = delivery_due_at(9, 5, 1.0, 5);
        let route = sequence(None, &[delivery]).unwrap();
        let dropoff = route
            .points
            .iter()
            .find(|p| p.kind == RoutePointKind::Dropoff)
            .unwrap();

        assert_eq!(dropoff.estimated_arrival.as_deref(), Some("09:05"));
    }

    #[test]
    fn equal_deadlines_keep_input_order() {
        let first = delivery_due_at(12, 0, 1.0, 5);
        let second = delivery_due_at(12, 0, 1.0, 5);
        let expected = vec![first.id, second.id];

        let route = sequence(None, &[first, second]).unwrap();
        let dropoff_ids: Vec<Uuid> = route
            .points
            .iter()
            .filter(|p| p.kind == RoutePointKind::Dropoff)
            .map(|p| p.id)
            .collect();

        assert_eq!(dropoff_ids, expected);
    }
}
