use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo;
use crate::lifecycle::{self, TransitionOutcome};
use crate::models::courier::GeoPoint;
use crate::models::delivery::{Delivery, DeliveryStatus, Location};
use crate::models::notification::NotificationType;
use crate::notify::dispatcher::{self, DispatchRequest};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(create_delivery).get(list_deliveries))
        .route("/deliveries/:id", get(get_delivery))
        .route("/deliveries/:id/status", post(update_delivery_status))
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub order_id: Uuid,
    pub customer_name: String,
    #[serde(default)]
    pub courier_id: Option<Uuid>,
    pub pickup: Location,
    pub dropoff: Location,
    pub estimated_delivery_time: DateTime<Utc>,
    /// Filled in from the pickup/dropoff geometry when absent.
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DeliveryStatus,
}

#[derive(Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Json<Delivery>, AppError> {
    let mut order = state
        .store
        .order(payload.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", payload.order_id)))?;
    if order.delivery_id.is_some() {
        return Err(AppError::BadRequest(format!(
            "order {} already has a delivery",
            order.id
        )));
    }
    if let Some(courier_id) = payload.courier_id {
        state
            .store
            .courier(courier_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
    }

    let distance_km = payload.distance_km.unwrap_or_else(|| {
        geo::haversine_km(
            GeoPoint {
                lat: payload.pickup.lat,
                lng: payload.pickup.lng,
            },
            GeoPoint {
                lat: payload.dropoff.lat,
                lng: payload.dropoff.lng,
            },
        )
    });
    let duration_minutes = payload
        .duration_minutes
        .unwrap_or_else(|| geo::estimate_duration_minutes(distance_km));

    let now = Utc::now();
    let delivery = Delivery {
        id: Uuid::new_v4(),
        order_id: order.id,
        customer_id: order.customer_id,
        customer_name: payload.customer_name,
        courier_id: payload.courier_id,
        status: DeliveryStatus::Assigned,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        assigned_at: now,
        estimated_delivery_time: payload.estimated_delivery_time,
        actual_delivery_time: None,
        distance_km,
        duration_minutes,
        updated_at: now,
    };

    state.store.insert_delivery(delivery.clone()).await?;
    order.delivery_id = Some(delivery.id);
    order.updated_at = now;
    state.store.update_order(order).await?;

    tracing::info!(
        delivery_id = %delivery.id,
        order_id = %delivery.order_id,
        courier_id = ?delivery.courier_id,
        "delivery created"
    );

    if let Some(courier_id) = delivery.courier_id {
        let request = DispatchRequest {
            recipient_id: courier_id,
            title: "New delivery assigned".to_string(),
            message: format!("Pickup at {}", delivery.pickup.address),
            data: serde_json::json!({ "delivery_id": delivery.id }),
            delivery_id: Some(delivery.id),
            order_id: Some(delivery.order_id),
        };
        if let Err(err) =
            dispatcher::dispatch(&state, NotificationType::OrderAssigned, request).await
        {
            tracing::warn!(
                delivery_id = %delivery.id,
                error = %err,
                "assignment notification dispatch failed"
            );
        }
    }

    Ok(Json(delivery))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state
        .store
        .delivery(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    Ok(Json(delivery))
}

/// Deliveries whose `assigned_at` falls in the window; defaults to the
/// last 24 hours.
async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let to = query.to.unwrap_or_else(Utc::now);
    let from = query.from.unwrap_or_else(|| to - Duration::hours(24));
    if from > to {
        return Err(AppError::BadRequest("from must not be after to".to_string()));
    }

    Ok(Json(state.store.deliveries_assigned_between(from, to).await?))
}

async fn update_delivery_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<TransitionOutcome<DeliveryStatus>>, AppError> {
    let outcome = lifecycle::transition_delivery(&state, id, payload.status).await?;
    Ok(Json(outcome))
}
