use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery lifecycle.
///
/// ```text
/// Assigned ──► PickedUp ──► InTransit ──► Delivered
///     │            │            │
///     └────────────┴────────────┴──► Canceled / Failed
/// ```
///
/// `Delivered`, `Canceled`, and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Canceled,
    Failed,
}

impl DeliveryStatus {
    /// The immediate successor on the happy path, if any.
    pub fn next(&self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Assigned => Some(DeliveryStatus::PickedUp),
            DeliveryStatus::PickedUp => Some(DeliveryStatus::InTransit),
            DeliveryStatus::InTransit => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered | DeliveryStatus::Canceled | DeliveryStatus::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Canceled | DeliveryStatus::Failed
        )
    }

    /// True for statuses that keep a delivery on the courier's route.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Assigned | DeliveryStatus::PickedUp | DeliveryStatus::InTransit
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Assigned => "ASSIGNED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Canceled => "CANCELED",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stop address with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

/// One physical transport leg fulfilling an order.
///
/// `distance_km` and `duration_minutes` are whatever the creating process
/// stored; route totals sum them as-is. `actual_delivery_time` is set only
/// when the status reaches `Delivered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub courier_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub pickup: Location,
    pub dropoff: Location,
    pub assigned_at: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::DeliveryStatus;

    #[test]
    fn happy_path_successors() {
        assert_eq!(
            DeliveryStatus::Assigned.next(),
            Some(DeliveryStatus::PickedUp)
        );
        assert_eq!(
            DeliveryStatus::PickedUp.next(),
            Some(DeliveryStatus::InTransit)
        );
        assert_eq!(
            DeliveryStatus::InTransit.next(),
            Some(DeliveryStatus::Delivered)
        );
    }

    #[test]
    fn terminal_states_have_no_successor() {
        assert_eq!(DeliveryStatus::Delivered.next(), None);
        assert_eq!(DeliveryStatus::Canceled.next(), None);
        assert_eq!(DeliveryStatus::Failed.next(), None);
    }

    #[test]
    fn active_set_matches_route_membership() {
        assert!(DeliveryStatus::Assigned.is_active());
        assert!(DeliveryStatus::PickedUp.is_active());
        assert!(DeliveryStatus::InTransit.is_active());
        assert!(!DeliveryStatus::Delivered.is_active());
        assert!(!DeliveryStatus::Canceled.is_active());
        assert!(!DeliveryStatus::Failed.is_active());
    }

    #[test]
    fn wire_format_is_screaming_snake() {
        let json = serde_json::to_string(&DeliveryStatus::PickedUp).unwrap();
        assert_eq!(json, "\"PICKED_UP\"");
        let back: DeliveryStatus = serde_json::from_str("\"IN_TRANSIT\"").unwrap();
        assert_eq!(back, DeliveryStatus::InTransit);
    }
}
