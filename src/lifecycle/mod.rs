use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::DeliveryStatus;
use crate::models::notification::NotificationType;
use crate::models::order::OrderStatus;
use crate::notify::dispatcher::{self, DispatchRequest};
use crate::state::AppState;

/// Why a requested status change was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("cannot enter {target} without an assigned courier")]
    PreconditionNotMet { target: &'static str },
}

/// What a successful transition reports back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome<S> {
    pub status: S,
    pub updated_at: DateTime<Utc>,
}

/// Status-change notice broadcast to live tracking views.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingEvent {
    DeliveryStatus {
        delivery_id: Uuid,
        order_id: Uuid,
        courier_id: Option<Uuid>,
        customer_id: Uuid,
        previous: DeliveryStatus,
        status: DeliveryStatus,
        occurred_at: DateTime<Utc>,
    },
    OrderStatus {
        order_id: Uuid,
        customer_id: Uuid,
        previous: OrderStatus,
        status: OrderStatus,
        occurred_at: DateTime<Utc>,
    },
}

/// Validates one delivery status change.
///
/// Only the immediate successor or a terminal exception (`Canceled`,
/// `Failed`) is accepted; anything else (skips, regressions, no-ops,
/// moves out of a terminal state) is an `InvalidTransition`. Entering
/// `InTransit` additionally requires an assigned courier.
pub fn delivery_transition(
    current: DeliveryStatus,
    requested: DeliveryStatus,
    courier_assigned: bool,
) -> Result<DeliveryStatus, TransitionError> {
    let allowed = !current.is_terminal()
        && (current.next() == Some(requested)
            || matches!(
                requested,
                DeliveryStatus::Canceled | DeliveryStatus::Failed
            ));

    if !allowed {
        return Err(TransitionError::InvalidTransition {
            from: current.as_str(),
            to: requested.as_str(),
        });
    }

    if requested == DeliveryStatus::InTransit && !courier_assigned {
        return Err(TransitionError::PreconditionNotMet {
            target: requested.as_str(),
        });
    }

    Ok(requested)
}

/// Validates one order status change.
///
/// Same shape as [`delivery_transition`], except `Canceled` is only
/// reachable before `Ready`: an order already packed or moving cannot be
/// called back.
pub fn order_transition(
    current: OrderStatus,
    requested: OrderStatus,
    courier_assigned: bool,
) -> Result<OrderStatus, TransitionError> {
    let allowed = !current.is_terminal()
        && (current.next() == Some(requested)
            || (requested == OrderStatus::Canceled && current.can_cancel()));

    if !allowed {
        return Err(TransitionError::InvalidTransition {
            from: current.as_str(),
            to: requested.as_str(),
        });
    }

    if requested == OrderStatus::InTransit && !courier_assigned {
        return Err(TransitionError::PreconditionNotMet {
            target: requested.as_str(),
        });
    }

    Ok(requested)
}

/// Applies a validated status change to a stored delivery: persists the new
/// status, stamps `updated_at` (and `actual_delivery_time` on `Delivered`),
/// broadcasts a tracking event, and hands the customer notice to the
/// dispatcher. Dispatch problems are logged, never surfaced; the
/// transition already happened.
pub async fn transition_delivery(
    state: &AppState,
    delivery_id: Uuid,
    requested: DeliveryStatus,
) -> Result<TransitionOutcome<DeliveryStatus>, AppError> {
    let mut delivery = state
        .store
        .delivery(delivery_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    let next = match delivery_transition(delivery.status, requested, delivery.courier_id.is_some())
    {
        Ok(next) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&["delivery", "applied"])
                .inc();
            next
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&["delivery", "rejected"])
                .inc();
            return Err(err.into());
        }
    };

    let previous = delivery.status;
    let now = Utc::now();
    delivery.status = next;
    delivery.updated_at = now;
    if next == DeliveryStatus::Delivered {
        delivery.actual_delivery_time = Some(now);
    }
    state.store.update_delivery(delivery.clone()).await?;

    tracing::info!(
        delivery_id = %delivery_id,
        from = %previous,
        to = %next,
        "delivery transitioned"
    );

    let _ = state.tracking_events_tx.send(TrackingEvent::DeliveryStatus {
        delivery_id,
        order_id: delivery.order_id,
        courier_id: delivery.courier_id,
        customer_id: delivery.customer_id,
        previous,
        status: next,
        occurred_at: now,
    });

    let (event_type, title, message) = if next == DeliveryStatus::Delivered {
        (
            NotificationType::DeliveryCompleted,
            "Delivery completed".to_string(),
            "Your order has been delivered".to_string(),
        )
    } else {
        (
            NotificationType::DeliveryStatusChanged,
            "Delivery update".to_string(),
            format!("Your delivery is now {next}"),
        )
    };

    let request = DispatchRequest {
        recipient_id: delivery.customer_id,
        title,
        message,
        data: serde_json::json!({
            "previous": previous,
            "status": next,
        }),
        delivery_id: Some(delivery_id),
        order_id: Some(delivery.order_id),
    };
    if let Err(err) = dispatcher::dispatch(state, event_type, request).await {
        tracing::warn!(
            delivery_id = %delivery_id,
            error = %err,
            "status notification dispatch failed"
        );
    }

    Ok(TransitionOutcome {
        status: next,
        updated_at: now,
    })
}

/// Order counterpart of [`transition_delivery`]. The courier precondition
/// for `InTransit` is satisfied through the 1:1 delivery link: the order
/// must have a delivery and that delivery must have a courier.
pub async fn transition_order(
    state: &AppState,
    order_id: Uuid,
    requested: OrderStatus,
) -> Result<TransitionOutcome<OrderStatus>, AppError> {
    let mut order = state
        .store
        .order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let courier_assigned = match order.delivery_id {
        Some(delivery_id) => state
            .store
            .delivery(delivery_id)
            .await?
            .is_some_and(|delivery| delivery.courier_id.is_some()),
        None => false,
    };

    let next = match order_transition(order.status, requested, courier_assigned) {
        Ok(next) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&["order", "applied"])
                .inc();
            next
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&["order", "rejected"])
                .inc();
            return Err(err.into());
        }
    };

    let previous = order.status;
    let now = Utc::now();
    order.status = next;
    order.updated_at = now;
    state.store.update_order(order.clone()).await?;

    tracing::info!(order_id = %order_id, from = %previous, to = %next, "order transitioned");

    let _ = state.tracking_events_tx.send(TrackingEvent::OrderStatus {
        order_id,
        customer_id: order.customer_id,
        previous,
        status: next,
        occurred_at: now,
    });

    let request = DispatchRequest {
        recipient_id: order.customer_id,
        title: "Order update".to_string(),
        message: format!("Your order is now {next}"),
        data: serde_json::json!({
            "previous": previous,
            "status": next,
        }),
        delivery_id: order.delivery_id,
        order_id: Some(order_id),
    };
    if let Err(err) = dispatcher::dispatch(state, NotificationType::OrderStatusChanged, request).await
    {
        tracing::warn!(order_id = %order_id, error = %err, "status notification dispatch failed");
    }

    Ok(TransitionOutcome {
        status: next,
        updated_at: now,
    })
}
