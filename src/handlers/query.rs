use std::cmp::Reverse;

use chrono::NaiveDate;

use super::OrderWorkflow;
use crate::db::models::{Driver, Medicine, Order, OrderStatus};
use crate::db::OrderRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    Any,
    Today,
    Week,
}

/// Criteria for the order board. An empty filter matches every order.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub search: String,
    pub status: Option<OrderStatus>,
    pub date: DateFilter,
}

impl OrderFilter {
    pub fn search(query: impl Into<String>) -> Self {
        OrderFilter {
            search: query.into(),
            ..OrderFilter::default()
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_date(mut self, date: DateFilter) -> Self {
        self.date = date;
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.matches_text(order) && self.matches_status(order) && self.matches_date(order)
    }

    fn matches_text(&self, order: &Order) -> bool {
        let query = self.search.trim().to_lowercase();
        query.is_empty()
            || [&order.id, &order.client.name, &order.client.address]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
    }

    fn matches_status(&self, order: &Order) -> bool {
        self.status.map_or(true, |status| order.status == status)
    }

    // Orders only carry a time of day, so "today" is approximated by ids
    // ending in 1 or 2 and "this week" matches everything.
    fn matches_date(&self, order: &Order) -> bool {
        match self.date {
            DateFilter::Any | DateFilter::Week => true,
            DateFilter::Today => order.id.ends_with(&['1', '2'][..]),
        }
    }
}

/// Criteria for the delivery history. Date bounds are inclusive and apply to
/// the day of the latest milestone on the order's timeline.
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Substring of the client name (any case) or phone number.
    pub client: String,
    pub driver_id: Option<String>,
}

impl DeliveryFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        DeliveryFilter {
            from: Some(from),
            to: Some(to),
            ..DeliveryFilter::default()
        }
    }

    pub fn with_client(mut self, query: impl Into<String>) -> Self {
        self.client = query.into();
        self
    }

    pub fn with_driver(mut self, driver_id: impl Into<String>) -> Self {
        self.driver_id = Some(driver_id.into());
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        is_delivery(order)
            && self.matches_dates(order)
            && self.matches_client(order)
            && self
                .driver_id
                .as_deref()
                .map_or(true, |id| order.assigned_driver_id.as_deref() == Some(id))
    }

    fn matches_dates(&self, order: &Order) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(day) = order.timeline.last_event().map(|at| at.date_naive()) else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }

    fn matches_client(&self, order: &Order) -> bool {
        let query = self.client.trim();
        query.is_empty()
            || order.client.name.to_lowercase().contains(&query.to_lowercase())
            || order.client.phone.contains(query)
    }
}

/// Orders that reached the delivery pool or were handed to a driver.
fn is_delivery(order: &Order) -> bool {
    order.assigned_driver_id.is_some()
        || matches!(
            order.status,
            OrderStatus::WaitingForDelivery
                | OrderStatus::Assigned
                | OrderStatus::OnTheWay
                | OrderStatus::Delivered
        )
}

impl<R: OrderRepository> OrderWorkflow<R> {
    pub fn orders(&self) -> &[Order] {
        self.store.orders()
    }

    pub fn drivers(&self) -> &[Driver] {
        self.store.drivers()
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.store.order(order_id)
    }

    /// Orders matching `filter`, in store order. Recomputed on every call.
    pub fn filtered_orders(&self, filter: &OrderFilter) -> Vec<&Order> {
        let orders: Vec<&Order> = self
            .store
            .orders()
            .iter()
            .filter(|order| filter.matches(order))
            .collect();
        log::debug!("{:?} matched {} orders", filter, orders.len());
        orders
    }

    pub fn orders_with_status(&self, status: OrderStatus) -> Vec<&Order> {
        self.filtered_orders(&OrderFilter::default().with_status(status))
    }

    /// Deliveries matching `filter`, newest first. Orders without any
    /// recorded milestone come last.
    pub fn delivery_history(&self, filter: &DeliveryFilter) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .store
            .orders()
            .iter()
            .filter(|order| filter.matches(order))
            .collect();
        orders.sort_by_key(|order| Reverse(order.timeline.last_event()));
        log::debug!("{:?} matched {} deliveries", filter, orders.len());
        orders
    }

    pub fn available_drivers(&self) -> Vec<&Driver> {
        self.store.drivers().iter().filter(|d| d.available).collect()
    }

    /// Medicines of an order whose name contains `query`, ignoring case.
    pub fn visible_medicines(&self, order_id: &str, query: &str) -> Vec<&Medicine> {
        let query = query.trim().to_lowercase();
        self.store
            .order(order_id)
            .map(|order| {
                order
                    .medicines
                    .iter()
                    .filter(|m| query.is_empty() || m.name.to_lowercase().contains(&query))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Display name of a driver, or the id itself when no driver has it.
    pub fn driver_name<'a>(&'a self, driver_id: &'a str) -> &'a str {
        self.store
            .driver(driver_id)
            .map(|d| d.name.as_str())
            .unwrap_or(driver_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn workflow() -> OrderWorkflow {
        let store = MemoryStore::from_json(include_str!("../../data/orders.json")).unwrap();
        OrderWorkflow::new(store)
    }

    fn ids(orders: Vec<&Order>) -> Vec<&str> {
        orders.into_iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_everything() {
        let wf = workflow();
        assert_eq!(wf.filtered_orders(&OrderFilter::default()).len(), 5);
    }

    #[test]
    fn search_matches_address_case_insensitively() {
        let wf = workflow();
        let found = wf.filtered_orders(&OrderFilter::search("marsa"));
        assert_eq!(ids(found.clone()), vec!["O-3002"]);
        assert!(found
            .iter()
            .all(|o| o.client.address.to_lowercase().contains("marsa")));
    }

    #[test]
    fn search_matches_id_and_client_name() {
        let wf = workflow();
        assert_eq!(
            ids(wf.filtered_orders(&OrderFilter::search("o-3004"))),
            vec!["O-3004"]
        );
        assert_eq!(
            ids(wf.filtered_orders(&OrderFilter::search("  ALEX "))),
            vec!["O-3003", "O-3005"]
        );
        assert!(wf.filtered_orders(&OrderFilter::search("sousse")).is_empty());
    }

    #[test]
    fn status_and_text_combine() {
        let wf = workflow();
        let filter = OrderFilter::search("tunis").with_status(OrderStatus::New);
        assert_eq!(ids(wf.filtered_orders(&filter)), vec!["O-3001", "O-3002"]);
        assert_eq!(
            ids(wf.orders_with_status(OrderStatus::Declined)),
            vec!["O-3005"]
        );
    }

    #[test]
    fn today_uses_id_suffix() {
        let wf = workflow();
        let today = OrderFilter::default().with_date(DateFilter::Today);
        assert_eq!(ids(wf.filtered_orders(&today)), vec!["O-3001", "O-3002"]);

        let week = OrderFilter::default().with_date(DateFilter::Week);
        assert_eq!(wf.filtered_orders(&week).len(), 5);
    }

    #[test]
    fn views_reflect_commands_immediately() {
        let mut wf = workflow();
        wf.mark_prepared("O-3001").unwrap();
        assert_eq!(
            ids(wf.orders_with_status(OrderStatus::New)),
            vec!["O-3002"]
        );
    }

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn delivery_history_is_newest_first() {
        let wf = workflow();
        assert_eq!(
            ids(wf.delivery_history(&DeliveryFilter::default())),
            vec!["O-3003", "O-3004"]
        );
    }

    #[test]
    fn delivery_history_filters_by_date_range() {
        let wf = workflow();
        let first_day = DeliveryFilter::between(day("2026-03-01"), day("2026-03-01"));
        assert_eq!(ids(wf.delivery_history(&first_day)), vec!["O-3004"]);

        let both = DeliveryFilter::between(day("2026-03-01"), day("2026-03-02"));
        assert_eq!(wf.delivery_history(&both).len(), 2);

        let later = DeliveryFilter {
            from: Some(day("2026-03-03")),
            ..DeliveryFilter::default()
        };
        assert!(wf.delivery_history(&later).is_empty());
    }

    #[test]
    fn delivery_history_filters_by_client_and_driver() {
        let wf = workflow();
        let by_name = DeliveryFilter::default().with_client("alex");
        assert_eq!(ids(wf.delivery_history(&by_name)), vec!["O-3003"]);

        let by_phone = DeliveryFilter::default().with_client("71 777");
        assert_eq!(ids(wf.delivery_history(&by_phone)), vec!["O-3004"]);

        let by_driver = DeliveryFilter::default().with_driver("d3");
        assert_eq!(ids(wf.delivery_history(&by_driver)), vec!["O-3004"]);
        assert!(wf
            .delivery_history(&DeliveryFilter::default().with_driver("d"))
            .is_empty());
    }

    #[test]
    fn recent_activity_tops_the_history() {
        let mut wf = workflow();
        wf.claim_order("O-3003", "d1").unwrap();
        wf.start_delivery("O-3003").unwrap();
        wf.mark_delivered("O-3003").unwrap();
        wf.move_to_waiting_for_delivery("O-3002").unwrap();

        let history = wf.delivery_history(&DeliveryFilter::default().with_driver("d1"));
        assert_eq!(ids(history), vec!["O-3003"]);
        assert_eq!(
            ids(wf.delivery_history(&DeliveryFilter::default())),
            vec!["O-3002", "O-3003", "O-3004"]
        );
    }

    #[test]
    fn medicine_search() {
        let wf = workflow();
        let found = wf.visible_medicines("O-3001", "vitamin");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m2");
        assert_eq!(wf.visible_medicines("O-3001", "").len(), 2);
        assert!(wf.visible_medicines("O-9999", "").is_empty());
    }

    #[test]
    fn driver_lookup() {
        let wf = workflow();
        assert_eq!(wf.driver_name("d3"), "Driver C");
        assert_eq!(wf.driver_name("d7"), "d7");
        let available: Vec<&str> = wf.available_drivers().into_iter().map(|d| d.id.as_str()).collect();
        assert_eq!(available, vec!["d1"]);
    }
}
