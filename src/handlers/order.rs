use chrono::Utc;
use rand::seq::SliceRandom;

use super::{reject, Command, OrderWorkflow, WorkflowError};
use crate::db::models::{Order, OrderStatus};
use crate::db::OrderRepository;
use crate::utils::generate_pickup_code;

impl<R: OrderRepository> OrderWorkflow<R> {
    pub(super) fn lookup_order(&self, order_id: &str) -> Result<&Order, WorkflowError> {
        match self.store.order(order_id) {
            Some(order) => Ok(order),
            None => reject(WorkflowError::OrderNotFound(order_id.to_string())),
        }
    }

    /// Fails with `InvalidTransition` if the order is already delivered or declined.
    pub(super) fn ensure_open(&self, order_id: &str, command: Command) -> Result<(), WorkflowError> {
        let status = self.lookup_order(order_id)?.status;
        if status.is_terminal() {
            return reject(WorkflowError::InvalidTransition {
                order_id: order_id.to_string(),
                from: status,
                command,
            });
        }
        Ok(())
    }

    fn transition(
        &mut self,
        order_id: &str,
        command: Command,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), WorkflowError> {
        let current = self.lookup_order(order_id)?.status;
        if current != from {
            return reject(WorkflowError::InvalidTransition {
                order_id: order_id.to_string(),
                from: current,
                command,
            });
        }
        self.set_status(order_id, to);
        Ok(())
    }

    /// Writes the new status and, when the order is finished and driver
    /// release is on, hands the assigned driver back to the pool.
    pub(super) fn set_status(&mut self, order_id: &str, to: OrderStatus) {
        let mut finished_driver = None;
        if let Some(order) = self.store.order_mut(order_id) {
            log::info!("Order {}: {} -> {}", order_id, order.status, to);
            order.status = to;
            order.timeline.record(to, Utc::now());
            if to.is_terminal() {
                finished_driver = order.assigned_driver_id.clone();
            }
        }

        if !self.release_drivers {
            return;
        }
        if let Some(driver_id) = finished_driver {
            if let Some(driver) = self.store.driver_mut(&driver_id) {
                driver.available = true;
                log::info!("Driver {} is available again", driver_id);
            }
        }
    }

    pub fn mark_prepared(&mut self, order_id: &str) -> Result<(), WorkflowError> {
        self.transition(
            order_id,
            Command::MarkPrepared,
            OrderStatus::New,
            OrderStatus::Prepared,
        )
    }

    /// Releases the order to the delivery pool.
    ///
    /// An order with medicines needs every one of them in stock and
    /// validated, whether it is New or Prepared. An order without medicines
    /// (a plain list) has nothing to validate and must be Prepared first.
    pub fn move_to_waiting_for_delivery(&mut self, order_id: &str) -> Result<(), WorkflowError> {
        let order = self.lookup_order(order_id)?;
        let ready = match order.status {
            OrderStatus::New | OrderStatus::Prepared if !order.medicines.is_empty() => {
                order.is_fully_validated()
            }
            OrderStatus::Prepared => true,
            OrderStatus::New => false,
            from => {
                return reject(WorkflowError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from,
                    command: Command::MoveToWaitingForDelivery,
                });
            }
        };
        if !ready {
            return reject(WorkflowError::NotFullyValidated(order_id.to_string()));
        }
        self.set_status(order_id, OrderStatus::WaitingForDelivery);
        Ok(())
    }

    /// Binds an available driver to an order waiting for delivery.
    ///
    /// On success the order is Assigned, carries a fresh pickup code (which
    /// is returned) and the driver is no longer available. The whole
    /// check-and-set happens under one `&mut self` borrow.
    pub fn claim_order(&mut self, order_id: &str, driver_id: &str) -> Result<String, WorkflowError> {
        let order = self.lookup_order(order_id)?;
        let status = order.status;
        let current_driver = order.assigned_driver_id.clone();

        let available = match self.store.driver(driver_id) {
            Some(driver) => driver.available,
            None => return reject(WorkflowError::DriverNotFound(driver_id.to_string())),
        };

        if status != OrderStatus::WaitingForDelivery {
            return reject(WorkflowError::InvalidTransition {
                order_id: order_id.to_string(),
                from: status,
                command: Command::ClaimOrder,
            });
        }
        if let Some(current) = current_driver {
            return reject(WorkflowError::AlreadyClaimed {
                order_id: order_id.to_string(),
                driver_id: current,
            });
        }
        if !available {
            return reject(WorkflowError::DriverUnavailable(driver_id.to_string()));
        }

        let code = generate_pickup_code(&mut self.rng);
        if let Some(order) = self.store.order_mut(order_id) {
            order.assigned_driver_id = Some(driver_id.to_string());
            order.pickup_code = Some(code.clone());
        }
        if let Some(driver) = self.store.driver_mut(driver_id) {
            driver.available = false;
        }
        self.set_status(order_id, OrderStatus::Assigned);
        log::info!("Driver {} claimed order {}", driver_id, order_id);

        Ok(code)
    }

    /// Claims the order for a driver picked at random among the available ones.
    ///
    /// Returns the chosen driver id and the pickup code.
    pub fn simulate_random_claim(&mut self, order_id: &str) -> Result<(String, String), WorkflowError> {
        let status = self.lookup_order(order_id)?.status;
        if status != OrderStatus::WaitingForDelivery {
            return reject(WorkflowError::InvalidTransition {
                order_id: order_id.to_string(),
                from: status,
                command: Command::ClaimOrder,
            });
        }

        let candidates: Vec<String> = self
            .store
            .drivers()
            .iter()
            .filter(|d| d.available)
            .map(|d| d.id.clone())
            .collect();
        let driver_id = match candidates.choose(&mut self.rng) {
            Some(id) => id.clone(),
            None => return reject(WorkflowError::NoAvailableDriver(order_id.to_string())),
        };

        let code = self.claim_order(order_id, &driver_id)?;
        Ok((driver_id, code))
    }

    pub fn start_delivery(&mut self, order_id: &str) -> Result<(), WorkflowError> {
        self.transition(
            order_id,
            Command::StartDelivery,
            OrderStatus::Assigned,
            OrderStatus::OnTheWay,
        )
    }

    pub fn mark_delivered(&mut self, order_id: &str) -> Result<(), WorkflowError> {
        self.transition(
            order_id,
            Command::MarkDelivered,
            OrderStatus::OnTheWay,
            OrderStatus::Delivered,
        )
    }

    pub fn decline_order(&mut self, order_id: &str) -> Result<(), WorkflowError> {
        self.ensure_open(order_id, Command::DeclineOrder)?;
        self.set_status(order_id, OrderStatus::Declined);
        Ok(())
    }

    /// Declines the order and records the partner pharmacy it goes to.
    pub fn forward_order(&mut self, order_id: &str, target: Option<&str>) -> Result<(), WorkflowError> {
        self.ensure_open(order_id, Command::ForwardOrder)?;
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.fallback_pharmacy)
            .to_string();
        if let Some(order) = self.store.order_mut(order_id) {
            log::info!("Order {} forwarded to {}", order_id, target);
            order.forwarded_to = Some(target);
        }
        self.set_status(order_id, OrderStatus::Declined);
        Ok(())
    }

    /// Confirms the physical handoff: the driver's code must match the one
    /// generated at claim time. Surrounding whitespace is ignored.
    pub fn verify_pickup_code(&mut self, order_id: &str, input: &str) -> Result<(), WorkflowError> {
        let order = self.lookup_order(order_id)?;
        if order.status != OrderStatus::Assigned {
            return reject(WorkflowError::InvalidTransition {
                order_id: order_id.to_string(),
                from: order.status,
                command: Command::VerifyPickupCode,
            });
        }

        let input = input.trim();
        if input.is_empty() {
            return reject(WorkflowError::EmptyPickupCode);
        }
        if order.pickup_code.as_deref() != Some(input) {
            return reject(WorkflowError::PickupCodeMismatch(order_id.to_string()));
        }

        self.start_delivery(order_id)
    }
}
