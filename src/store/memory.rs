use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::courier::Courier;
use crate::models::delivery::Delivery;
use crate::models::notification::{Channel, ChannelDelivery, Notification, NotificationType};
use crate::models::order::Order;
use crate::models::preference::{Contact, NotificationPreference};

use super::{Datastore, StoreError};

/// Concurrent in-memory store. Every record is owned by its map; reads
/// hand out clones so callers never hold a shard lock across an await.
#[derive(Default)]
pub struct MemoryStore {
    couriers: DashMap<Uuid, Courier>,
    orders: DashMap<Uuid, Order>,
    deliveries: DashMap<Uuid, Delivery>,
    notifications: DashMap<Uuid, Notification>,
    contacts: DashMap<Uuid, Contact>,
    preferences: DashMap<(Uuid, NotificationType), NotificationPreference>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn insert_courier(&self, courier: Courier) -> Result<(), StoreError> {
        self.couriers.insert(courier.id, courier);
        Ok(())
    }

    async fn courier(&self, id: Uuid) -> Result<Option<Courier>, StoreError> {
        Ok(self.couriers.get(&id).map(|entry| entry.clone()))
    }

    async fn couriers(&self) -> Result<Vec<Courier>, StoreError> {
        Ok(self
            .couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update_courier(&self, courier: Courier) -> Result<(), StoreError> {
        self.couriers.insert(courier.id, courier);
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|entry| entry.clone()))
    }

    async fn update_order(&self, order: Order) -> Result<(), StoreError> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn insert_delivery(&self, delivery: Delivery) -> Result<(), StoreError> {
        self.deliveries.insert(delivery.id, delivery);
        Ok(())
    }

    async fn delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.deliveries.get(&id).map(|entry| entry.clone()))
    }

    async fn update_delivery(&self, delivery: Delivery) -> Result<(), StoreError> {
        self.deliveries.insert(delivery.id, delivery);
        Ok(())
    }

    async fn deliveries_for_courier(&self, courier_id: Uuid) -> Result<Vec<Delivery>, StoreError> {
        let mut found: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|entry| entry.courier_id == Some(courier_id))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|delivery| delivery.assigned_at);
        Ok(found)
    }

    async fn deliveries_assigned_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Delivery>, StoreError> {
        let mut found: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|entry| entry.assigned_at >= from && entry.assigned_at <= to)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|delivery| delivery.assigned_at);
        Ok(found)
    }

    async fn insert_notification(&self, notification: Notification) -> Result<(), StoreError> {
        self.notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn notification(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        Ok(self.notifications.get(&id).map(|entry| entry.clone()))
    }

    async fn set_channel_status(
        &self,
        notification_id: Uuid,
        channel: Channel,
        status: ChannelDelivery,
    ) -> Result<(), StoreError> {
        if let Some(mut entry) = self.notifications.get_mut(&notification_id) {
            entry.channel_status.insert(channel, status);
        }
        Ok(())
    }

    async fn unprocessed_notifications(&self) -> Result<Vec<Notification>, StoreError> {
        let mut found: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|entry| !entry.is_processed())
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|notification| notification.created_at);
        Ok(found)
    }

    async fn upsert_contact(&self, contact: Contact) -> Result<(), StoreError> {
        self.contacts.insert(contact.recipient_id, contact);
        Ok(())
    }

    async fn contact(&self, recipient_id: Uuid) -> Result<Option<Contact>, StoreError> {
        Ok(self.contacts.get(&recipient_id).map(|entry| entry.clone()))
    }

    async fn upsert_preference(
        &self,
        preference: NotificationPreference,
    ) -> Result<(), StoreError> {
        self.preferences
            .insert((preference.recipient_id, preference.event_type), preference);
        Ok(())
    }

    async fn preference(
        &self,
        recipient_id: Uuid,
        event_type: NotificationType,
    ) -> Result<Option<NotificationPreference>, StoreError> {
        Ok(self
            .preferences
            .get(&(recipient_id, event_type))
            .map(|entry| entry.clone()))
    }
}
