use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::lifecycle::TransitionError;
use crate::models::notification::Channel;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown notification type: {0}")]
    UnknownNotificationType(String),

    #[error("missing {field} for {channel} delivery")]
    MissingContactField {
        channel: Channel,
        field: &'static str,
    },

    #[error("route planner unavailable: {0}")]
    RouteUnavailable(String),

    #[error("notification queue is closed")]
    QueueClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Transition(TransitionError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Transition(TransitionError::PreconditionNotMet { .. }) => {
                (StatusCode::PRECONDITION_FAILED, self.to_string())
            }
            AppError::UnknownNotificationType(_) | AppError::MissingContactField { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::RouteUnavailable(_) | AppError::QueueClosed => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Store(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
