use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod models;

use models::{Driver, Order};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse data file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate order id: {0}")]
    DuplicateOrder(String),
    #[error("Duplicate driver id: {0}")]
    DuplicateDriver(String),
    #[error("Order {order_id} references unknown driver {driver_id}")]
    UnknownDriver { order_id: String, driver_id: String },
    #[error("Order {0} has a pickup code that is not six digits")]
    InvalidPickupCode(String),
}

/// Read and write access to the orders and drivers the workflow operates on.
///
/// Drivers are referenced from orders by id only, so every lookup goes
/// through the repository and always sees the current driver state.
pub trait OrderRepository {
    fn orders(&self) -> &[Order];
    fn drivers(&self) -> &[Driver];
    fn order_mut(&mut self, order_id: &str) -> Option<&mut Order>;
    fn driver_mut(&mut self, driver_id: &str) -> Option<&mut Driver>;

    fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders().iter().find(|o| o.id == order_id)
    }

    fn driver(&self, driver_id: &str) -> Option<&Driver> {
        self.drivers().iter().find(|d| d.id == driver_id)
    }
}

/// Layout of the data file the store is loaded from.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    orders: Vec<Order>,
    drivers: Vec<Driver>,
}

impl MemoryStore {
    pub fn new(orders: Vec<Order>, drivers: Vec<Driver>) -> Result<Self, StoreError> {
        check_integrity(&orders, &drivers)?;
        Ok(MemoryStore { orders, drivers })
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        Self::new(snapshot.orders, snapshot.drivers)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        log::info!("Loading orders and drivers from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_json(&raw)?;
        log::info!(
            "Loaded {} orders and {} drivers",
            store.orders.len(),
            store.drivers.len()
        );
        Ok(store)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            orders: self.orders.clone(),
            drivers: self.drivers.clone(),
        }
    }
}

impl OrderRepository for MemoryStore {
    fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    fn order_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == order_id)
    }

    fn driver_mut(&mut self, driver_id: &str) -> Option<&mut Driver> {
        self.drivers.iter_mut().find(|d| d.id == driver_id)
    }
}

fn check_integrity(orders: &[Order], drivers: &[Driver]) -> Result<(), StoreError> {
    let mut driver_ids = HashSet::new();
    for driver in drivers {
        if !driver_ids.insert(driver.id.as_str()) {
            return Err(StoreError::DuplicateDriver(driver.id.clone()));
        }
    }

    let mut order_ids = HashSet::new();
    for order in orders {
        if !order_ids.insert(order.id.as_str()) {
            return Err(StoreError::DuplicateOrder(order.id.clone()));
        }

        if let Some(driver_id) = &order.assigned_driver_id {
            if !driver_ids.contains(driver_id.as_str()) {
                return Err(StoreError::UnknownDriver {
                    order_id: order.id.clone(),
                    driver_id: driver_id.clone(),
                });
            }
        }

        if let Some(code) = &order.pickup_code {
            if !crate::utils::is_pickup_code(code) {
                return Err(StoreError::InvalidPickupCode(order.id.clone()));
            }
        }
    }

    Ok(())
}
