use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{
    Channel, ChannelDelivery, Notification, NotificationType,
};
use crate::models::preference::{NotificationFrequency, NotificationPreference};
use crate::notify::queue::NotificationJob;
use crate::state::AppState;

/// Everything a caller supplies when emitting an event.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub delivery_id: Option<Uuid>,
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedChannel {
    pub channel: Channel,
    pub reason: String,
}

/// What `dispatch` decided per channel. Callers are free to ignore it;
/// nothing here blocks on an actual send.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub notification_id: Uuid,
    pub enqueued: Vec<Channel>,
    pub skipped: Vec<SkippedChannel>,
}

/// Boundary entry point for callers holding a raw event-type string. The
/// string dies here: either it parses into the closed enum or the whole
/// dispatch is rejected before anything is recorded or enqueued.
pub async fn dispatch_event(
    state: &AppState,
    event_type: &str,
    request: DispatchRequest,
) -> Result<DispatchReceipt, AppError> {
    let event_type: NotificationType = event_type.parse()?;
    dispatch(state, event_type, request).await
}

/// Fans one event out to its eligible channels.
///
/// Creates the notification record once, then per eligible channel checks
/// the recipient's stored preference (default: everything on, immediate)
/// and contact record. Channels that pass get a queue job with the resolved
/// destination and start as `Pending`; the rest are recorded as `Skipped`
/// with the gating reason. Ineligible channels are not recorded at all.
pub async fn dispatch(
    state: &AppState,
    event_type: NotificationType,
    request: DispatchRequest,
) -> Result<DispatchReceipt, AppError> {
    let recipient_id = request.recipient_id;

    let preference = state
        .store
        .preference(recipient_id, event_type)
        .await?
        .unwrap_or_else(|| NotificationPreference::default_for(recipient_id, event_type));
    let contact = state.store.contact(recipient_id).await?;

    let notification_id = Uuid::new_v4();
    let mut channel_status: BTreeMap<Channel, ChannelDelivery> = BTreeMap::new();
    let mut jobs: Vec<NotificationJob> = Vec::new();
    let mut skipped: Vec<SkippedChannel> = Vec::new();

    for &channel in event_type.eligible_channels() {
        if !preference.allows(channel) {
            let reason = "disabled by preference".to_string();
            channel_status.insert(channel, ChannelDelivery::Skipped { reason: reason.clone() });
            skipped.push(SkippedChannel { channel, reason });
            continue;
        }
        if preference.frequency != NotificationFrequency::Immediate {
            let reason = "deferred by digest preference".to_string();
            channel_status.insert(channel, ChannelDelivery::Skipped { reason: reason.clone() });
            skipped.push(SkippedChannel { channel, reason });
            continue;
        }
        let destination = contact
            .as_ref()
            .and_then(|contact| contact.destination(channel));
        let Some(destination) = destination else {
            let reason = AppError::MissingContactField {
                channel,
                field: channel.contact_field(),
            }
            .to_string();
            channel_status.insert(channel, ChannelDelivery::Skipped { reason: reason.clone() });
            skipped.push(SkippedChannel { channel, reason });
            continue;
        };

        channel_status.insert(channel, ChannelDelivery::Pending);
        jobs.push(NotificationJob {
            id: Uuid::new_v4(),
            notification_id,
            channel,
            recipient_id,
            destination: destination.to_string(),
            title: request.title.clone(),
            message: request.message.clone(),
            attempts: 0,
        });
    }

    let notification = Notification {
        id: notification_id,
        event_type,
        title: request.title,
        message: request.message,
        recipient_id,
        delivery_id: request.delivery_id,
        order_id: request.order_id,
        data: request.data,
        channel_status,
        created_at: Utc::now(),
    };
    state.store.insert_notification(notification).await?;

    let mut enqueued = Vec::with_capacity(jobs.len());
    for job in jobs {
        let channel = job.channel;
        state.notify_queue.push(job)?;
        state
            .metrics
            .notifications_enqueued_total
            .with_label_values(&[channel.as_str()])
            .inc();
        enqueued.push(channel);
    }
    state
        .metrics
        .notify_queue_depth
        .set(state.notify_queue.depth() as i64);

    tracing::info!(
        event_type = %event_type,
        recipient_id = %recipient_id,
        enqueued = enqueued.len(),
        skipped = skipped.len(),
        "notification dispatched"
    );

    Ok(DispatchReceipt {
        notification_id,
        enqueued,
        skipped,
    })
}
