use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Courier, CourierStatus, GeoPoint};
use crate::routing::{self, Route};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route("/couriers/:id/location", patch(update_courier_location))
        .route("/couriers/:id/route", get(courier_route))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CourierStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        status: CourierStatus::Available,
        location: payload.location,
        updated_at: Utc::now(),
    };

    state.store.insert_courier(courier.clone()).await?;
    Ok(Json(courier))
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Courier>>, AppError> {
    Ok(Json(state.store.couriers().await?))
}

async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .store
        .courier(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.status = payload.status;
    courier.updated_at = Utc::now();
    state.store.update_courier(courier.clone()).await?;

    Ok(Json(courier))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .store
        .courier(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.location = Some(payload.location);
    courier.updated_at = Utc::now();
    state.store.update_courier(courier.clone()).await?;

    Ok(Json(courier))
}

/// `null` body when the courier has nothing active; the tracking UI treats
/// that as its empty state.
async fn courier_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Route>>, AppError> {
    Ok(Json(routing::build_route(&state, id).await?))
}
