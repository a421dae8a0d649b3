use std::sync::Arc;

use futures::future;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::Config;
use crate::db::models::OrderStatus;
use crate::db::MemoryStore;
use crate::handlers::{OrderWorkflow, WorkflowError};

/// Workflow handle shared between simulated drivers and the scheduler.
///
/// Every command locks the mutex once, so a claim's check-and-set over the
/// order status, its driver and the driver's availability is atomic.
pub type SharedWorkflow = Arc<Mutex<OrderWorkflow>>;

/// Builds a workflow over `store` using the runtime configuration.
pub fn build_workflow(store: MemoryStore, config: &Config) -> OrderWorkflow {
    let workflow = OrderWorkflow::new(store)
        .with_fallback_pharmacy(config.fallback_pharmacy.clone())
        .with_driver_release(config.release_drivers);
    match config.rng_seed {
        Some(seed) => workflow.with_seed(seed),
        None => workflow,
    }
}

pub fn share(workflow: OrderWorkflow) -> SharedWorkflow {
    Arc::new(Mutex::new(workflow))
}

/// Result of several drivers trying to claim the same order at once.
#[derive(Debug, Default)]
pub struct RaceOutcome {
    /// Winning driver id and the pickup code it received.
    pub winner: Option<(String, String)>,
    pub rejected: Vec<(String, WorkflowError)>,
}

/// Lets every available driver try to claim `order_id` concurrently.
///
/// Each attempt runs on its own task and all of them are awaited together.
/// At most one attempt succeeds; the others are reported with the reason
/// they were turned down.
pub async fn race_for_order(workflow: SharedWorkflow, order_id: &str) -> RaceOutcome {
    let drivers: Vec<String> = {
        let wf = workflow.lock().await;
        wf.available_drivers().iter().map(|d| d.id.clone()).collect()
    };
    log::info!("{} drivers racing for order {}", drivers.len(), order_id);

    let attempts: Vec<_> = drivers
        .into_iter()
        .map(|driver_id| {
            let workflow = Arc::clone(&workflow);
            let order_id = order_id.to_string();
            tokio::spawn(async move {
                let result = workflow.lock().await.claim_order(&order_id, &driver_id);
                (driver_id, result)
            })
        })
        .collect();

    let mut outcome = RaceOutcome::default();
    for joined in future::join_all(attempts).await {
        match joined {
            Ok((driver_id, Ok(code))) => outcome.winner = Some((driver_id, code)),
            Ok((driver_id, Err(e))) => outcome.rejected.push((driver_id, e)),
            Err(e) => log::error!("Claim task failed: {}", e),
        }
    }
    outcome
}

/// Offers every unclaimed order waiting for delivery to a random available
/// driver. Returns the number of orders claimed.
pub async fn dispatch_waiting_orders(workflow: &SharedWorkflow) -> usize {
    let mut wf = workflow.lock().await;
    let waiting: Vec<String> = wf
        .orders_with_status(OrderStatus::WaitingForDelivery)
        .into_iter()
        .filter(|o| o.assigned_driver_id.is_none())
        .map(|o| o.id.clone())
        .collect();

    let mut claimed = 0;
    for order_id in waiting {
        match wf.simulate_random_claim(&order_id) {
            Ok((driver_id, _)) => {
                log::info!("{} picked up order {}", wf.driver_name(&driver_id), order_id);
                claimed += 1;
            }
            Err(WorkflowError::NoAvailableDriver(_)) => break,
            Err(e) => log::warn!("Could not dispatch order {}: {}", order_id, e),
        }
    }
    claimed
}

/// Schedules simulated driver claims.
///
/// A `tokio_cron_scheduler` job runs [`dispatch_waiting_orders`] on every
/// tick of `schedule` (a cron expression with a seconds field). The
/// scheduler is started on a separate task and returned so the caller can
/// shut it down.
pub async fn schedule_claim_simulation(
    workflow: SharedWorkflow,
    schedule: &str,
) -> Result<JobScheduler, crate::Error> {
    let sched = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_uuid, _l| {
        let workflow = Arc::clone(&workflow);
        Box::pin(async move {
            let claimed = dispatch_waiting_orders(&workflow).await;
            log::debug!("Claim simulation tick: {} orders claimed", claimed);
        })
    })
    .map_err(|e| {
        log::error!("Failed to create claim simulation job: {}", e);
        Box::new(e) as crate::Error
    })?;

    sched.add(job).await.map_err(|e| {
        log::error!("Failed to add job to scheduler: {}", e);
        Box::new(e) as crate::Error
    })?;

    let runner = sched.clone();
    tokio::spawn(async move {
        if let Err(e) = runner.start().await {
            log::error!("Scheduler error: {}", e);
        }
    });

    log::info!("Claim simulation scheduled with '{}'", schedule);
    Ok(sched)
}
