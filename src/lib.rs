//! Order-to-delivery workflow for a pharmacy operations dashboard.
//!
//! Orders move New → Prepared → Waiting for Delivery → Assigned → On The Way
//! → Delivered, or end up Declined. Drivers claim orders from the delivery
//! pool and confirm the handoff with a six digit pickup code.

pub mod config;
pub mod db;
pub mod handlers;
pub mod services;
pub mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub use db::models::{
    Client, DeliveryTimeline, Driver, GeoPoint, IntakeTimes, Medicine, Order, OrderStatus, OrderType,
};
pub use db::{MemoryStore, OrderRepository, StoreError};
pub use handlers::{
    Command, DateFilter, DeliveryFilter, OrderFilter, OrderWorkflow, RecipeUpdate, WorkflowError,
};
