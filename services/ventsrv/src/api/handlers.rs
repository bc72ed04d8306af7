//! API handlers for the vent bridge
//!
//! Every handler answers with a well-formed JSON body; bus faults are
//! reported inside the payload, never as a raised fault.

#![allow(clippy::disallowed_methods)] // json! macro used in multiple functions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::aggregator::VentQuery;
use crate::command::Command;

use super::AppState;

/// Response for single control commands
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: String,
    pub message: String,
}

/// Query parameters for a single status read
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,
    /// On/off discrete input address
    #[serde(default, rename = "on")]
    pub on_address: u16,
    /// Temperature input register address
    #[serde(default = "default_temp_address", rename = "temp")]
    pub temp_address: u16,
    /// Fan speed input register address
    #[serde(default = "default_speed_address", rename = "speed")]
    pub speed_address: u16,
}

fn default_slave_id() -> u8 {
    1
}

fn default_temp_address() -> u16 {
    1
}

fn default_speed_address() -> u16 {
    36
}

/// Bulk status request: parallel arrays, index i describes one unit
#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub slave_id: Vec<u8>,
    pub on: Vec<u16>,
    pub temp: Vec<u16>,
    pub speed: Vec<u16>,
}

/// Execute a single control command
///
/// @route POST /api/control
pub async fn control_device(
    State(state): State<AppState>,
    Json(cmd): Json<Command>,
) -> Json<ControlResponse> {
    let outcome = state.dispatcher.execute(&cmd).await;

    let status = if outcome.succeeded { "success" } else { "error" };
    Json(ControlResponse {
        status: status.to_string(),
        message: outcome.message,
    })
}

/// Queue a batch of control commands for background execution
///
/// @route POST /api/control/bulk
pub async fn bulk_control_device(
    State(state): State<AppState>,
    Json(commands): Json<Vec<Command>>,
) -> impl IntoResponse {
    if !state.bus.is_connected() {
        return Json(json!({
            "status": "error",
            "message": "Modbus device not connected"
        }))
        .into_response();
    }

    match state.commands.submit(commands).await {
        Ok(accepted) => Json(json!({
            "status": "success",
            "message": format!(
                "{} commands are being processed in the background",
                accepted.accepted
            ),
            "run_id": accepted.run_id,
            "accepted": accepted.accepted,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "error", "message": e.to_string()})),
        )
            .into_response(),
    }
}

/// Fetch the outcome log of a submitted batch
///
/// @route GET /api/control/bulk/{run_id}
pub async fn get_batch_results(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.command_log.get(run_id) {
        Some(run) => Json(run).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": format!("No batch with run id {}", run_id)})),
        )
            .into_response(),
    }
}

/// Read one unit's current status
///
/// @route GET /api/status
pub async fn get_device_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    match state
        .reader
        .read(
            query.slave_id,
            query.on_address,
            query.temp_address,
            query.speed_address,
        )
        .await
    {
        Ok(status) => Json(status).into_response(),
        Err(e) => Json(json!({
            "Status": "error",
            "message": format!("Failed to read from Modbus device: {}", e)
        }))
        .into_response(),
    }
}

/// Queue a bulk status run over many units
///
/// @route POST /api/status/bulk
pub async fn start_bulk_status(
    State(state): State<AppState>,
    Json(request): Json<BulkStatusRequest>,
) -> impl IntoResponse {
    let count = request.slave_id.len();
    if request.on.len() != count || request.temp.len() != count || request.speed.len() != count {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": "slave_id, on, temp and speed arrays must have equal length"
            })),
        )
            .into_response();
    }

    let queries: Vec<VentQuery> = (0..count)
        .map(|i| VentQuery {
            slave_id: request.slave_id[i],
            on_address: request.on[i],
            temp_address: request.temp[i],
            speed_address: request.speed[i],
        })
        .collect();

    match state.statuses.submit(queries).await {
        Ok(()) => Json(json!({
            "message": "Bulk fetch started",
            "slave_ids": request.slave_id,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "error", "message": e.to_string()})),
        )
            .into_response(),
    }
}

/// Fetch the latest bulk status snapshot
///
/// @route GET /api/status/bulk/results
pub async fn get_bulk_results(State(state): State<AppState>) -> impl IntoResponse {
    match state.results.get() {
        Some(snapshot) => Json((*snapshot).clone()).into_response(),
        None => Json(json!({"message": "No results yet"})).into_response(),
    }
}

/// Health check endpoint
///
/// @route GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": crate::SERVICE_NAME,
        "bus_connected": state.bus.is_connected(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
