pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::aggregator::AggregatorHandle;
use crate::batch::BulkCommandProcessor;
use crate::bus::SharedBus;
use crate::command::CommandDispatcher;
use crate::config::ServiceConfig;
use crate::error::{Result, VentsrvError};
use crate::status::StatusReader;
use crate::store::{CommandLog, ResultStore};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<SharedBus>,
    pub dispatcher: CommandDispatcher,
    pub reader: StatusReader,
    pub commands: BulkCommandProcessor,
    pub statuses: AggregatorHandle,
    pub results: Arc<ResultStore>,
    pub command_log: Arc<CommandLog>,
}

/// Create all API routes for the vent bridge
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Control commands
        .route("/api/control", post(handlers::control_device))
        .route("/api/control/bulk", post(handlers::bulk_control_device))
        .route("/api/control/bulk/{run_id}", get(handlers::get_batch_results))
        // Status reads
        .route("/api/status", get(handlers::get_device_status))
        .route("/api/status/bulk", post(handlers::start_bulk_status))
        .route("/api/status/bulk/results", get(handlers::get_bulk_results))
        // Add CORS support
        .layer(CorsLayer::permissive())
        // Add state
        .with_state(state)
}

/// HTTP server for the bridge API
pub struct ApiServer {
    state: AppState,
    config: ServiceConfig,
}

impl ApiServer {
    pub fn new(state: AppState, config: ServiceConfig) -> Self {
        Self { state, config }
    }

    pub async fn start(self) -> Result<()> {
        let app = create_router(self.state);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            VentsrvError::ApiError(format!("Failed to bind to {}: {}", addr, e))
        })?;

        axum::serve(listener, app)
            .await
            .map_err(|e| VentsrvError::ApiError(format!("Server error: {}", e)))?;

        Ok(())
    }
}
