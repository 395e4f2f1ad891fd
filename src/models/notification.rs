use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Delivery channels a notification can fan out over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Sms => "SMS",
            Channel::Push => "PUSH",
        }
    }

    /// Contact-record field that backs this channel's destination.
    pub fn contact_field(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "phone",
            Channel::Push => "push_token",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain events the dispatcher knows how to fan out.
///
/// The wire strings (`ORDER_ASSIGNED`, …) exist only at the process
/// boundary; everything inside the crate matches on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    OrderAssigned,
    OrderStatusChanged,
    PaymentReceived,
    PaymentFailed,
    DeliveryStatusChanged,
    DeliveryCompleted,
    ZoneBoundaryAlert,
    SystemAlert,
}

impl NotificationType {
    /// Channels this event type may ever use, before preferences are
    /// consulted. Zone alerts are too time-critical for email; system
    /// alerts never go out as SMS.
    pub fn eligible_channels(&self) -> &'static [Channel] {
        match self {
            NotificationType::ZoneBoundaryAlert => &[Channel::Sms, Channel::Push],
            NotificationType::SystemAlert => &[Channel::Email, Channel::Push],
            NotificationType::OrderAssigned
            | NotificationType::OrderStatusChanged
            | NotificationType::PaymentReceived
            | NotificationType::PaymentFailed
            | NotificationType::DeliveryStatusChanged
            | NotificationType::DeliveryCompleted => {
                &[Channel::Email, Channel::Sms, Channel::Push]
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderAssigned => "ORDER_ASSIGNED",
            NotificationType::OrderStatusChanged => "ORDER_STATUS_CHANGED",
            NotificationType::PaymentReceived => "PAYMENT_RECEIVED",
            NotificationType::PaymentFailed => "PAYMENT_FAILED",
            NotificationType::DeliveryStatusChanged => "DELIVERY_STATUS_CHANGED",
            NotificationType::DeliveryCompleted => "DELIVERY_COMPLETED",
            NotificationType::ZoneBoundaryAlert => "ZONE_BOUNDARY_ALERT",
            NotificationType::SystemAlert => "SYSTEM_ALERT",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_ASSIGNED" => Ok(NotificationType::OrderAssigned),
            "ORDER_STATUS_CHANGED" => Ok(NotificationType::OrderStatusChanged),
            "PAYMENT_RECEIVED" => Ok(NotificationType::PaymentReceived),
            "PAYMENT_FAILED" => Ok(NotificationType::PaymentFailed),
            "DELIVERY_STATUS_CHANGED" => Ok(NotificationType::DeliveryStatusChanged),
            "DELIVERY_COMPLETED" => Ok(NotificationType::DeliveryCompleted),
            "ZONE_BOUNDARY_ALERT" => Ok(NotificationType::ZoneBoundaryAlert),
            "SYSTEM_ALERT" => Ok(NotificationType::SystemAlert),
            other => Err(AppError::UnknownNotificationType(other.to_string())),
        }
    }
}

/// Per-channel delivery state of a notification.
///
/// Replaces the original single `processed` flag, which any channel handler
/// could overwrite regardless of what the others had done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelDelivery {
    Pending,
    Sent {
        provider_message_id: String,
        at: DateTime<Utc>,
    },
    Failed {
        attempts: u32,
        reason: String,
    },
    Skipped {
        reason: String,
    },
}

impl ChannelDelivery {
    /// Whether this channel needs no further work.
    pub fn is_settled(&self) -> bool {
        !matches!(self, ChannelDelivery::Pending)
    }
}

/// One emitted event record. Created exactly once per dispatched event;
/// channel workers update their own entry in `channel_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub event_type: NotificationType,
    pub title: String,
    pub message: String,
    pub recipient_id: Uuid,
    pub delivery_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub data: serde_json::Value,
    pub channel_status: BTreeMap<Channel, ChannelDelivery>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// True once every channel has settled. Skipped channels count as
    /// settled; a record with only skips is still "processed" because
    /// there is nothing left to deliver.
    pub fn is_processed(&self) -> bool {
        !self.channel_status.is_empty()
            && self.channel_status.values().all(ChannelDelivery::is_settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_alert_is_never_eligible_for_email() {
        assert!(!NotificationType::ZoneBoundaryAlert
            .eligible_channels()
            .contains(&Channel::Email));
    }

    #[test]
    fn system_alert_is_never_eligible_for_sms() {
        assert!(!NotificationType::SystemAlert
            .eligible_channels()
            .contains(&Channel::Sms));
    }

    #[test]
    fn order_and_delivery_events_use_all_channels() {
        for event_type in [
            NotificationType::OrderAssigned,
            NotificationType::OrderStatusChanged,
            NotificationType::PaymentReceived,
            NotificationType::PaymentFailed,
            NotificationType::DeliveryStatusChanged,
            NotificationType::DeliveryCompleted,
        ] {
            assert_eq!(event_type.eligible_channels(), &Channel::ALL);
        }
    }

    #[test]
    fn unknown_wire_string_is_rejected() {
        let err = NotificationType::from_str("UNKNOWN").unwrap_err();
        assert!(matches!(
            err,
            AppError::UnknownNotificationType(ref s) if s == "UNKNOWN"
        ));
    }

    #[test]
    fn wire_strings_round_trip() {
        for event_type in [
            NotificationType::OrderAssigned,
            NotificationType::ZoneBoundaryAlert,
            NotificationType::SystemAlert,
        ] {
            assert_eq!(
                NotificationType::from_str(event_type.as_str()).unwrap(),
                event_type
            );
        }
    }

    #[test]
    fn processed_requires_every_channel_settled() {
        let mut notification = Notification {
            id: Uuid::new_v4(),
            event_type: NotificationType::OrderStatusChanged,
            title: "t".to_string(),
            message: "m".to_string(),
            recipient_id: Uuid::new_v4(),
            delivery_id: None,
            order_id: None,
            data: serde_json::Value::Null,
            channel_status: BTreeMap::new(),
            created_at: Utc::now(),
        };

        // No channels resolved at all: nothing was dispatched yet.
        assert!(!notification.is_processed());

        notification
            .channel_status
            .insert(Channel::Email, ChannelDelivery::Pending);
        notification.channel_status.insert(
            Channel::Sms,
            ChannelDelivery::Sent {
                provider_message_id: "sms-1".to_string(),
                at: Utc::now(),
            },
        );

        // One channel confirmed, the other still pending: a second
        // channel's success must not mark the whole record done.
        assert!(!notification.is_processed());

        notification.channel_status.insert(
            Channel::Email,
            ChannelDelivery::Failed {
                attempts: 3,
                reason: "mailbox unavailable".to_string(),
            },
        );
        assert!(notification.is_processed());
    }
}
