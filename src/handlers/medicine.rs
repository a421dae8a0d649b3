use super::{reject, Command, OrderWorkflow, WorkflowError};
use crate::db::models::{IntakeTimes, Medicine, OrderStatus};
use crate::db::OrderRepository;

/// Recipe fields a pharmacist edits on a medicine line. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub intake_times: Option<IntakeTimes>,
    pub warnings: Option<String>,
}

impl RecipeUpdate {
    /// Applies the update and returns whether anything changed.
    fn apply(self, medicine: &mut Medicine) -> bool {
        let mut changed = false;
        if let Some(dosage) = self.dosage {
            changed |= medicine.dosage != dosage;
            medicine.dosage = dosage;
        }
        if let Some(frequency) = self.frequency {
            changed |= medicine.frequency != frequency;
            medicine.frequency = frequency;
        }
        if let Some(duration) = self.duration {
            changed |= medicine.duration != duration;
            medicine.duration = duration;
        }
        if let Some(intake_times) = self.intake_times {
            changed |= medicine.intake_times != intake_times;
            medicine.intake_times = intake_times;
        }
        if let Some(warnings) = self.warnings {
            let warnings = Some(warnings).filter(|w| !w.trim().is_empty());
            changed |= medicine.warnings != warnings;
            medicine.warnings = warnings;
        }
        changed
    }
}

impl<R: OrderRepository> OrderWorkflow<R> {
    fn lookup_medicine(&self, order_id: &str, medicine_id: &str) -> Result<&Medicine, WorkflowError> {
        match self.lookup_order(order_id)?.medicine(medicine_id) {
            Some(medicine) => Ok(medicine),
            None => reject(WorkflowError::MedicineNotFound {
                order_id: order_id.to_string(),
                medicine_id: medicine_id.to_string(),
            }),
        }
    }

    fn medicine_mut(&mut self, order_id: &str, medicine_id: &str) -> Option<&mut Medicine> {
        self.store
            .order_mut(order_id)
            .and_then(|order| order.medicine_mut(medicine_id))
    }

    /// Marks the medicine's recipe as confirmed by the pharmacist.
    ///
    /// Only a complete medicine can be validated: in stock, with dosage,
    /// frequency, duration and at least one intake time.
    pub fn validate_medicine(&mut self, order_id: &str, medicine_id: &str) -> Result<(), WorkflowError> {
        if !self.lookup_medicine(order_id, medicine_id)?.is_complete() {
            return reject(WorkflowError::MedicineIncomplete(medicine_id.to_string()));
        }
        if let Some(medicine) = self.medicine_mut(order_id, medicine_id) {
            medicine.recipe_validated = true;
            log::info!("Recipe for {} on order {} validated", medicine.name, order_id);
        }
        Ok(())
    }

    /// Records whether a medicine is in stock. A missing medicine declines
    /// the order and forwards it, keeping any forwarding target already set.
    pub fn set_medicine_availability(
        &mut self,
        order_id: &str,
        medicine_id: &str,
        exists: bool,
    ) -> Result<(), WorkflowError> {
        self.ensure_open(order_id, Command::SetMedicineAvailability)?;
        self.lookup_medicine(order_id, medicine_id)?;

        if let Some(medicine) = self.medicine_mut(order_id, medicine_id) {
            medicine.exists_in_stock = exists;
        }
        if exists {
            return Ok(());
        }

        log::info!("Medicine {} on order {} is out of stock", medicine_id, order_id);
        let fallback = self.fallback_pharmacy.clone();
        if let Some(order) = self.store.order_mut(order_id) {
            order.forwarded_to.get_or_insert(fallback);
        }
        self.set_status(order_id, OrderStatus::Declined);
        Ok(())
    }

    /// Edits the recipe of a medicine line. Any actual change withdraws a
    /// previous validation so the pharmacist has to confirm it again.
    ///
    /// Recipes are frozen once the order has left the pharmacy bench.
    pub fn update_recipe(
        &mut self,
        order_id: &str,
        medicine_id: &str,
        update: RecipeUpdate,
    ) -> Result<(), WorkflowError> {
        let status = self.lookup_order(order_id)?.status;
        if !matches!(status, OrderStatus::New | OrderStatus::Prepared) {
            return reject(WorkflowError::InvalidTransition {
                order_id: order_id.to_string(),
                from: status,
                command: Command::UpdateRecipe,
            });
        }
        self.lookup_medicine(order_id, medicine_id)?;

        if let Some(medicine) = self.medicine_mut(order_id, medicine_id) {
            if update.apply(medicine) && medicine.recipe_validated {
                medicine.recipe_validated = false;
                log::info!("Recipe for {} changed, validation withdrawn", medicine.name);
            }
        }
        Ok(())
    }
}
