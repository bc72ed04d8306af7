use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use vent_modbus::RtuTransport;

use ventsrv::aggregator::BulkStatusAggregator;
use ventsrv::api::{ApiServer, AppState};
use ventsrv::batch::BulkCommandProcessor;
use ventsrv::bus::SharedBus;
use ventsrv::command::CommandDispatcher;
use ventsrv::config::Config;
use ventsrv::status::StatusReader;
use ventsrv::store::{CommandLog, ResultStore};
use ventsrv::{Result, SERVICE_NAME, SERVICE_VERSION};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    init_logging(&config.log_level);

    info!(
        "Starting {} v{} on port {}",
        SERVICE_NAME, SERVICE_VERSION, config.service.port
    );

    // Open the one transport for the one physical bus. A failed open is
    // not fatal: the bridge keeps serving in disconnected/demo mode.
    let bus = match RtuTransport::open(&config.serial).await {
        Ok(transport) => {
            info!(
                "Serial bus connected on {} ({} baud)",
                config.serial.device, config.serial.baud_rate
            );
            Arc::new(SharedBus::connected(Box::new(transport)))
        }
        Err(e) => {
            warn!(
                "Serial bus unavailable on {} ({}), running in disconnected mode",
                config.serial.device, e
            );
            Arc::new(SharedBus::disconnected())
        }
    };

    let results = Arc::new(ResultStore::new());
    let command_log = Arc::new(CommandLog::new());

    let dispatcher = CommandDispatcher::new(Arc::clone(&bus));
    let reader = StatusReader::new(Arc::clone(&bus));

    // Background workers for bulk jobs
    let (commands, command_worker) =
        BulkCommandProcessor::spawn(dispatcher.clone(), Arc::clone(&command_log));
    let aggregator = BulkStatusAggregator::new(
        reader.clone(),
        Arc::clone(&results),
        Duration::from_millis(config.bus.pacing_delay_ms),
    );
    let (statuses, status_worker) = aggregator.spawn();

    let state = AppState {
        bus,
        dispatcher,
        reader,
        commands,
        statuses,
        results,
        command_log,
    };

    let server = ApiServer::new(state, config.service.clone());
    let server_handle = tokio::spawn(async move { server.start().await });

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }

    server_handle.abort();
    command_worker.abort();
    status_worker.abort();

    info!("{} stopped", SERVICE_NAME);
    Ok(())
}

/// Initialize the logging system
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(level: &str) {
    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("{}={}", env!("CARGO_PKG_NAME"), level));

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();
}
