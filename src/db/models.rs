use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use phf::phf_map;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub phone: String,
    pub address: String,
    pub location: GeoPoint,
}

/// When a medicine should be taken during the day.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeTimes {
    pub morning: bool,
    pub noon: bool,
    pub evening: bool,
    pub night: bool,
    pub before_meals: bool,
}

impl IntakeTimes {
    /// Returns `true` if at least one intake time is ticked.
    pub fn any(&self) -> bool {
        self.morning || self.noon || self.evening || self.night || self.before_meals
    }
}

/// A medicine line on an order, together with the recipe the pharmacist fills in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub exists_in_stock: bool,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub intake_times: IntakeTimes,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default)]
    pub recipe_validated: bool,
}

impl Medicine {
    /// Creates an in-stock medicine with an empty recipe.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Medicine {
            id: id.into(),
            name: name.into(),
            image_url: None,
            exists_in_stock: true,
            dosage: String::new(),
            intake_times: IntakeTimes::default(),
            frequency: String::new(),
            duration: String::new(),
            warnings: None,
            recipe_validated: false,
        }
    }

    /// A medicine is complete when it is in stock and its recipe has a
    /// dosage, frequency, duration and at least one intake time.
    pub fn is_complete(&self) -> bool {
        self.exists_in_stock
            && !self.dosage.trim().is_empty()
            && !self.frequency.trim().is_empty()
            && !self.duration.trim().is_empty()
            && self.intake_times.any()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Prescription,
    List,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    New,
    Prepared,
    #[serde(rename = "Waiting for Delivery")]
    WaitingForDelivery,
    Assigned,
    #[serde(rename = "On The Way")]
    OnTheWay,
    Delivered,
    Declined,
}

static STATUS_LABELS: phf::Map<&'static str, OrderStatus> = phf_map! {
    "new" => OrderStatus::New,
    "prepared" => OrderStatus::Prepared,
    "waiting for delivery" => OrderStatus::WaitingForDelivery,
    "assigned" => OrderStatus::Assigned,
    "on the way" => OrderStatus::OnTheWay,
    "delivered" => OrderStatus::Delivered,
    "declined" => OrderStatus::Declined,
};

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::Prepared => "Prepared",
            OrderStatus::WaitingForDelivery => "Waiting for Delivery",
            OrderStatus::Assigned => "Assigned",
            OrderStatus::OnTheWay => "On The Way",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Declined => "Declined",
        }
    }

    /// Delivered and Declined orders accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Declined)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STATUS_LABELS
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| format!("Unknown order status: {}", s))
    }
}

/// When an order passed each delivery milestone.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryTimeline {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepared_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl DeliveryTimeline {
    /// Most recent recorded milestone, if any.
    pub fn last_event(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
            .or(self.picked_up_at)
            .or(self.assigned_at)
            .or(self.prepared_at)
    }

    pub fn record(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        match status {
            OrderStatus::Prepared => self.prepared_at = Some(at),
            OrderStatus::WaitingForDelivery => {
                self.prepared_at.get_or_insert(at);
            }
            OrderStatus::Assigned => self.assigned_at = Some(at),
            OrderStatus::OnTheWay => self.picked_up_at = Some(at),
            OrderStatus::Delivered => self.delivered_at = Some(at),
            OrderStatus::New | OrderStatus::Declined => {}
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub client: Client,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub time: NaiveTime,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_driver_id: Option<String>,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_to: Option<String>,
    #[serde(default)]
    pub timeline: DeliveryTimeline,
}

impl Order {
    pub fn medicine(&self, medicine_id: &str) -> Option<&Medicine> {
        self.medicines.iter().find(|m| m.id == medicine_id)
    }

    pub fn medicine_mut(&mut self, medicine_id: &str) -> Option<&mut Medicine> {
        self.medicines.iter_mut().find(|m| m.id == medicine_id)
    }

    /// True when the order has medicines and every one of them is in stock,
    /// validated and complete.
    pub fn is_fully_validated(&self) -> bool {
        !self.medicines.is_empty()
            && self
                .medicines
                .iter()
                .all(|m| m.exists_in_stock && m.recipe_validated && m.is_complete())
    }

    pub fn has_missing_medicines(&self) -> bool {
        self.medicines.iter().any(|m| !m.exists_in_stock)
    }

    /// In-stock medicines whose recipe still waits for pharmacist validation.
    pub fn any_incomplete(&self) -> bool {
        self.medicines
            .iter()
            .any(|m| m.exists_in_stock && !m.recipe_validated)
    }

    pub fn validated_count(&self) -> usize {
        self.medicines
            .iter()
            .filter(|m| m.exists_in_stock && m.recipe_validated)
            .count()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub area: String,
    pub available: bool,
    pub location: GeoPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_medicine() -> Medicine {
        let mut m = Medicine::new("m1", "Amoxicillin 500mg");
        m.dosage = "500mg".to_string();
        m.frequency = "3x/day".to_string();
        m.duration = "7 days".to_string();
        m.intake_times.morning = true;
        m
    }

    #[test]
    fn status_labels_parse_case_insensitively() {
        assert_eq!(
            "waiting for delivery".parse::<OrderStatus>(),
            Ok(OrderStatus::WaitingForDelivery)
        );
        assert_eq!(" On the Way ".parse::<OrderStatus>(), Ok(OrderStatus::OnTheWay));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_with_display_label() {
        let json = serde_json::to_string(&OrderStatus::WaitingForDelivery).unwrap();
        assert_eq!(json, "\"Waiting for Delivery\"");
        assert_eq!(OrderStatus::OnTheWay.to_string(), "On The Way");
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Declined.is_terminal());
        assert!(!OrderStatus::Assigned.is_terminal());
    }

    #[test]
    fn medicine_needs_every_recipe_field_to_be_complete() {
        assert!(complete_medicine().is_complete());

        let mut no_timing = complete_medicine();
        no_timing.intake_times = IntakeTimes::default();
        assert!(!no_timing.is_complete());

        let mut blank_dosage = complete_medicine();
        blank_dosage.dosage = "  ".to_string();
        assert!(!blank_dosage.is_complete());

        let mut missing = complete_medicine();
        missing.exists_in_stock = false;
        assert!(!missing.is_complete());
    }

    #[test]
    fn timeline_keeps_the_latest_milestone() {
        let prepared = "2026-03-02T09:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let delivered = "2026-03-02T11:05:00Z".parse::<DateTime<Utc>>().unwrap();

        let mut timeline = DeliveryTimeline::default();
        assert_eq!(timeline.last_event(), None);

        timeline.record(OrderStatus::Prepared, prepared);
        // Moving to the pool does not overwrite the preparation time.
        timeline.record(OrderStatus::WaitingForDelivery, delivered);
        assert_eq!(timeline.prepared_at, Some(prepared));

        timeline.record(OrderStatus::Delivered, delivered);
        assert_eq!(timeline.last_event(), Some(delivered));
    }

    #[test]
    fn empty_medicine_list_is_never_fully_validated() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "O-1",
            "client": {
                "id": "c1", "name": "John Smith", "age": 62, "phone": "+216 22 111 222",
                "address": "Ave. Habib Bourguiba, Tunis",
                "location": { "lat": 36.8005, "lng": 10.181 }
            },
            "type": "List",
            "status": "New",
            "time": "09:12:00",
            "items": ["Vitamin D3"]
        }))
        .unwrap();

        assert!(!order.is_fully_validated());
        assert!(!order.has_missing_medicines());
        assert_eq!(order.validated_count(), 0);
    }
}
