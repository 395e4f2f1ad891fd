use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{Channel, Notification, NotificationType};
use crate::models::preference::{Contact, NotificationFrequency, NotificationPreference};
use crate::notify::dispatcher::{self, DispatchReceipt, DispatchRequest};
use crate::notify::queue::DeadJob;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications/dispatch", post(dispatch_notification))
        .route("/notifications/unprocessed", get(list_unprocessed))
        .route("/notifications/dead-letters", get(list_dead_letters))
        .route("/notifications/:id", get(get_notification))
        .route("/recipients/:id/contact", put(upsert_contact))
        .route("/recipients/:id/preferences", put(upsert_preference))
}

/// The event type crosses the boundary as a raw string and is validated
/// by the dispatcher.
#[derive(Deserialize)]
pub struct DispatchApiRequest {
    pub event_type: String,
    #[serde(flatten)]
    pub request: DispatchRequest,
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub push_token: Option<String>,
}

#[derive(Deserialize)]
pub struct PreferenceRequest {
    pub event_type: String,
    pub channels: Vec<Channel>,
    pub frequency: NotificationFrequency,
}

async fn dispatch_notification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DispatchApiRequest>,
) -> Result<Json<DispatchReceipt>, AppError> {
    let receipt =
        dispatcher::dispatch_event(&state, &payload.event_type, payload.request).await?;
    Ok(Json(receipt))
}

async fn get_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = state
        .store
        .notification(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))?;

    Ok(Json(notification))
}

/// Notifications with at least one channel still pending. The operational
/// view for "did anything get stuck".
async fn list_unprocessed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.store.unprocessed_notifications().await?))
}

async fn list_dead_letters(State(state): State<Arc<AppState>>) -> Json<Vec<DeadJob>> {
    Json(state.notify_queue.dead_letters())
}

async fn upsert_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<Contact>, AppError> {
    let contact = Contact {
        recipient_id: id,
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        push_token: payload.push_token,
    };
    state.store.upsert_contact(contact.clone()).await?;
    Ok(Json(contact))
}

async fn upsert_preference(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PreferenceRequest>,
) -> Result<Json<NotificationPreference>, AppError> {
    let event_type: NotificationType = payload.event_type.parse()?;
    let preference = NotificationPreference {
        recipient_id: id,
        event_type,
        channels: payload.channels.into_iter().collect(),
        frequency: payload.frequency,
    };
    state.store.upsert_preference(preference.clone()).await?;
    Ok(Json(preference))
}
