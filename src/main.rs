use std::sync::Arc;

use dotenvy::dotenv;
use envconfig::Envconfig;
use pharmops::config::Config;
use pharmops::services::{build_workflow, schedule_claim_simulation, share, SharedWorkflow};
use pharmops::utils::order_summary;
use pharmops::{DeliveryFilter, Error, MemoryStore, OrderFilter};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load environment variables from a .env file if present
    dotenv().ok();

    // Initialize the logger with "info" level unless RUST_LOG says otherwise
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the pharmacy order workflow...");

    let config = Config::init_from_env()?;
    let store = MemoryStore::load(&config.data_file)?;
    let workflow = share(build_workflow(store, &config));

    log_board(&workflow, &config).await;

    let scheduler = if config.simulate_claims {
        Some(schedule_claim_simulation(Arc::clone(&workflow), &config.claim_schedule).await?)
    } else {
        log::info!("Claim simulation disabled");
        None
    };

    tokio::signal::ctrl_c().await?;

    if let Some(mut scheduler) = scheduler {
        scheduler.shutdown().await?;
    }

    log_board(&workflow, &config).await;
    log_deliveries(&workflow).await;
    log::info!("Shutting down gracefully");
    Ok(())
}

async fn log_board(workflow: &SharedWorkflow, config: &Config) {
    let filter = match config.board_status {
        Some(status) => OrderFilter::default().with_status(status),
        None => OrderFilter::default(),
    };
    let wf = workflow.lock().await;
    for order in wf.filtered_orders(&filter) {
        match &order.assigned_driver_id {
            Some(driver_id) => log::info!("{} ({})", order_summary(order), wf.driver_name(driver_id)),
            None => log::info!("{}", order_summary(order)),
        }
    }
}

async fn log_deliveries(workflow: &SharedWorkflow) {
    let wf = workflow.lock().await;
    for order in wf.delivery_history(&DeliveryFilter::default()) {
        if let Some(at) = order.timeline.last_event() {
            log::info!("{} last update {}", order.id, at.format("%Y-%m-%d %H:%M"));
        }
    }
}
