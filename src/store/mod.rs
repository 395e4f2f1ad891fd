pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::courier::Courier;
use crate::models::delivery::Delivery;
use crate::models::notification::{Channel, ChannelDelivery, Notification, NotificationType};
use crate::models::order::Order;
use crate::models::preference::{Contact, NotificationPreference};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam. Only the in-memory implementation ships; a relational
/// backend would implement the same surface.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn insert_courier(&self, courier: Courier) -> Result<(), StoreError>;
    async fn courier(&self, id: Uuid) -> Result<Option<Courier>, StoreError>;
    async fn couriers(&self) -> Result<Vec<Courier>, StoreError>;
    async fn update_courier(&self, courier: Courier) -> Result<(), StoreError>;

    async fn insert_order(&self, order: Order) -> Result<(), StoreError>;
    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn update_order(&self, order: Order) -> Result<(), StoreError>;

    async fn insert_delivery(&self, delivery: Delivery) -> Result<(), StoreError>;
    async fn delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;
    async fn update_delivery(&self, delivery: Delivery) -> Result<(), StoreError>;
    async fn deliveries_for_courier(&self, courier_id: Uuid) -> Result<Vec<Delivery>, StoreError>;
    async fn deliveries_assigned_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Delivery>, StoreError>;

    async fn insert_notification(&self, notification: Notification) -> Result<(), StoreError>;
    async fn notification(&self, id: Uuid) -> Result<Option<Notification>, StoreError>;
    async fn set_channel_status(
        &self,
        notification_id: Uuid,
        channel: Channel,
        status: ChannelDelivery,
    ) -> Result<(), StoreError>;
    async fn unprocessed_notifications(&self) -> Result<Vec<Notification>, StoreError>;

    async fn upsert_contact(&self, contact: Contact) -> Result<(), StoreError>;
    async fn contact(&self, recipient_id: Uuid) -> Result<Option<Contact>, StoreError>;

    async fn upsert_preference(
        &self,
        preference: NotificationPreference,
    ) -> Result<(), StoreError>;
    async fn preference(
        &self,
        recipient_id: Uuid,
        event_type: NotificationType,
    ) -> Result<Option<NotificationPreference>, StoreError>;
}
