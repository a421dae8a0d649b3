//! The order workflow engine.
//!
//! `OrderWorkflow` owns the repository of orders and drivers. Commands take
//! `&mut self` and either apply their whole effect or return a
//! [`WorkflowError`] with the state left untouched.

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::db::models::OrderStatus;
use crate::db::{MemoryStore, OrderRepository};

pub mod medicine;
pub mod order;
pub mod query;

pub use medicine::RecipeUpdate;
pub use query::{DateFilter, DeliveryFilter, OrderFilter};

pub const DEFAULT_FALLBACK_PHARMACY: &str = "Nearest partner pharmacy";

/// Workflow commands, used to report which command a transition guard rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MarkPrepared,
    MoveToWaitingForDelivery,
    ClaimOrder,
    StartDelivery,
    MarkDelivered,
    DeclineOrder,
    ForwardOrder,
    VerifyPickupCode,
    SetMedicineAvailability,
    UpdateRecipe,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::MarkPrepared => "mark prepared",
            Command::MoveToWaitingForDelivery => "move to waiting for delivery",
            Command::ClaimOrder => "claim order",
            Command::StartDelivery => "start delivery",
            Command::MarkDelivered => "mark delivered",
            Command::DeclineOrder => "decline order",
            Command::ForwardOrder => "forward order",
            Command::VerifyPickupCode => "verify pickup code",
            Command::SetMedicineAvailability => "set medicine availability",
            Command::UpdateRecipe => "update recipe",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
    #[error("Medicine {medicine_id} not found on order {order_id}")]
    MedicineNotFound {
        order_id: String,
        medicine_id: String,
    },
    #[error("Cannot {command} order {order_id} while it is {from}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        command: Command,
    },
    #[error("Order {0} has medicines that are missing or not validated")]
    NotFullyValidated(String),
    #[error("Order {order_id} is already claimed by driver {driver_id}")]
    AlreadyClaimed { order_id: String, driver_id: String },
    #[error("Driver {0} is not available")]
    DriverUnavailable(String),
    #[error("No driver is available to claim order {0}")]
    NoAvailableDriver(String),
    #[error("Recipe for medicine {0} is incomplete")]
    MedicineIncomplete(String),
    #[error("Pickup code is empty")]
    EmptyPickupCode,
    #[error("Pickup code does not match order {0}")]
    PickupCodeMismatch(String),
}

pub struct OrderWorkflow<R: OrderRepository = MemoryStore> {
    store: R,
    rng: StdRng,
    fallback_pharmacy: String,
    release_drivers: bool,
}

impl<R: OrderRepository> OrderWorkflow<R> {
    pub fn new(store: R) -> Self {
        OrderWorkflow {
            store,
            rng: StdRng::from_entropy(),
            fallback_pharmacy: DEFAULT_FALLBACK_PHARMACY.to_string(),
            release_drivers: false,
        }
    }

    /// Uses a seeded generator so pickup codes and random claims are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Partner pharmacy declined orders are forwarded to when none is given.
    pub fn with_fallback_pharmacy(mut self, name: impl Into<String>) -> Self {
        self.fallback_pharmacy = name.into();
        self
    }

    /// Restore a driver's availability once their order is delivered or declined.
    ///
    /// Off by default: drivers stay unavailable after completing an order.
    pub fn with_driver_release(mut self, release: bool) -> Self {
        self.release_drivers = release;
        self
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn into_store(self) -> R {
        self.store
    }

    pub fn fallback_pharmacy(&self) -> &str {
        &self.fallback_pharmacy
    }
}

fn reject<T>(err: WorkflowError) -> Result<T, WorkflowError> {
    log::warn!("Rejected: {}", err);
    Err(err)
}
