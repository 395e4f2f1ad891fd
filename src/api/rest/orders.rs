use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::{self, TransitionOutcome};
use crate::models::order::{Order, OrderItem, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(update_order_status))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub business_id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("order needs at least one item".to_string()));
    }
    if payload.items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest("item quantity must be > 0".to_string()));
    }

    let now = Utc::now();
    let total_cents = payload.items.iter().map(OrderItem::total_cents).sum();
    let order = Order {
        id: Uuid::new_v4(),
        business_id: payload.business_id,
        customer_id: payload.customer_id,
        items: payload.items,
        total_cents,
        status: OrderStatus::Pending,
        delivery_id: None,
        created_at: now,
        updated_at: now,
    };

    state.store.insert_order(order.clone()).await?;
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .store
        .order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<TransitionOutcome<OrderStatus>>, AppError> {
    let outcome = lifecycle::transition_order(&state, id, payload.status).await?;
    Ok(Json(outcome))
}
