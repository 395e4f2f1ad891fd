use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::notification::{Channel, NotificationType};

/// How often a recipient wants to hear about an event type. Only
/// `Immediate` rows reach the realtime dispatcher; digest rows are
/// batched elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationFrequency {
    Immediate,
    DailyDigest,
    WeeklyDigest,
}

/// Stored per (recipient, event type): which channels are enabled and at
/// what cadence. Recipients without a row get the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub recipient_id: Uuid,
    pub event_type: NotificationType,
    pub channels: BTreeSet<Channel>,
    pub frequency: NotificationFrequency,
}

impl NotificationPreference {
    /// Default-on: all channels enabled, delivered immediately.
    pub fn default_for(recipient_id: Uuid, event_type: NotificationType) -> Self {
        Self {
            recipient_id,
            event_type,
            channels: Channel::ALL.into_iter().collect(),
            frequency: NotificationFrequency::Immediate,
        }
    }

    pub fn allows(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }
}

/// Contact fields backing each channel's destination. A missing field
/// means the channel cannot be used for this recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub recipient_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub push_token: Option<String>,
}

impl Contact {
    pub fn destination(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => self.email.as_deref(),
            Channel::Sms => self.phone.as_deref(),
            Channel::Push => self.push_token.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preference_enables_everything_immediately() {
        let pref =
            NotificationPreference::default_for(Uuid::new_v4(), NotificationType::OrderAssigned);
        assert!(pref.allows(Channel::Email));
        assert!(pref.allows(Channel::Sms));
        assert!(pref.allows(Channel::Push));
        assert_eq!(pref.frequency, NotificationFrequency::Immediate);
    }

    #[test]
    fn destination_maps_channel_to_contact_field() {
        let contact = Contact {
            recipient_id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
            push_token: Some("token-1".to_string()),
        };
        assert_eq!(contact.destination(Channel::Email), Some("ada@example.com"));
        assert_eq!(contact.destination(Channel::Sms), None);
        assert_eq!(contact.destination(Channel::Push), Some("token-1"));
    }
}
