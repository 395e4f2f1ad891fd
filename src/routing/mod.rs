pub mod sequencer;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::Delivery;
use crate::state::AppState;

pub use sequencer::{sequence, CourierPosition, Route, RoutePoint, RoutePointKind};

/// Strategy seam for route construction. The default is the local deadline
/// sort; an external optimizer can be swapped in at startup, and when it
/// reports [`AppError::RouteUnavailable`] the caller degrades to the local
/// sort instead of surfacing the failure.
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn plan(
        &self,
        position: Option<CourierPosition>,
        deliveries: &[Delivery],
    ) -> Result<Option<Route>, AppError>;
}

/// Default planner: visit stops in `estimated_delivery_time` order.
pub struct DeadlineSequencer;

#[async_trait]
impl RoutePlanner for DeadlineSequencer {
    fn name(&self) -> &'static str {
        "deadline_sequencer"
    }

    async fn plan(
        &self,
        position: Option<CourierPosition>,
        deliveries: &[Delivery],
    ) -> Result<Option<Route>, AppError> {
        Ok(sequence(position, deliveries))
    }
}

/// Rebuilds a courier's route from current state. Always recomputed on
/// demand; nothing is cached between calls. `Ok(None)` means the courier
/// exists but has nothing active to drive to.
pub async fn build_route(state: &AppState, courier_id: Uuid) -> Result<Option<Route>, AppError> {
    let courier = state
        .store
        .courier(courier_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    let mut active = state.store.deliveries_for_courier(courier_id).await?;
    active.retain(|delivery| delivery.status.is_active());

    let position = courier
        .location
        .map(|location| CourierPosition { courier_id, location });

    match state.planner.plan(position, &active).await {
        Ok(route) => {
            state
                .metrics
                .route_builds_total
                .with_label_values(&[state.planner.name()])
                .inc();
            Ok(route)
        }
        Err(AppError::RouteUnavailable(reason)) => {
            tracing::warn!(
                courier_id = %courier_id,
                planner = state.planner.name(),
                reason = %reason,
                "route planner unavailable, using deadline order"
            );
            state
                .metrics
                .route_builds_total
                .with_label_values(&["fallback"])
                .inc();
            Ok(sequence(position, &active))
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::courier::{Courier, CourierStatus, GeoPoint};
    use crate::models::delivery::{DeliveryStatus, Location};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    struct FailingPlanner;

    #[async_trait]
    impl RoutePlanner for FailingPlanner {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn plan(
            &self,
            _position: Option<CourierPosition>,
            _deliveries: &[Delivery],
        ) -> Result<Option<Route>, AppError> {
            Err(AppError::RouteUnavailable("optimizer timed out".to_string()))
        }
    }

    fn courier_at(lat: f64, lng: f64) -> Courier {
        Courier {
            id: Uuid::new_v4(),
            name: "Riley".to_string(),
            status: CourierStatus::Available,
            location: Some(GeoPoint { lat, lng }),
            updated_at: Utc::now(),
        }
    }

    fn delivery_for(courier_id: Uuid, status: DeliveryStatus, due_in_minutes: i64) -> Delivery {
        let now = Utc::now();
        Delivery {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            customer_name: "Dana".to_string(),
            courier_id: Some(courier_id),
            status,
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
            assigned_at: now,
            estimated_delivery_time: now + Duration::minutes(due_in_minutes),
            actual_delivery_time: None,
            distance_km: 3.0,
            duration_minutes: 15,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn planner_failure_falls_back_to_deadline_order() {
        let mut state = AppState::new(Config::default());
        state.planner = Arc::new(FailingPlanner);

        let courier = courier_at(40.75, -73.98);
        let courier_id = courier.id;
        state.store.insert_courier(courier).await.unwrap();
        state
            .store
            .insert_delivery(delivery_for(courier_id, DeliveryStatus::Assigned, 30))
            .await
            .unwrap();
        state
            .store
            .insert_delivery(delivery_for(courier_id, DeliveryStatus::PickedUp, 10))
            .await
            .unwrap();

        let route = build_route(&state, courier_id).await.unwrap().unwrap();

        // position + pickup + two dropoffs
        assert_eq!(route.points.len(), 4);
    }

    #[tokio::test]
    async fn terminal_deliveries_do_not_appear_on_the_route() {
        let state = AppState::new(Config::default());
        let courier = courier_at(40.75, -73.98);
        let courier_id = courier.id;
        state.store.insert_courier(courier).await.unwrap();
        state
            .store
            .insert_delivery(delivery_for(courier_id, DeliveryStatus::Delivered, -30))
            .await
            .unwrap();
        state
            .store
            .insert_delivery(delivery_for(courier_id, DeliveryStatus::Canceled, 30))
            .await
            .unwrap();

        let route = build_route(&state, courier_id).await.unwrap();

        assert!(route.is_none());
    }

    #[tokio::test]
    async fn unknown_courier_is_not_found() {
        let state = AppState::new(Config::default());

        let result = build_route(&state, Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
