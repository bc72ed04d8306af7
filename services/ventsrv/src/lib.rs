//! ventsrv - HTTP control plane to Modbus RTU bridge for HVAC vent
//! controllers
//!
//! Translates REST requests into field-bus transactions and bus readings
//! into REST responses. All bus traffic is serialized through a single
//! shared transport; bulk work runs on background workers decoupled from
//! the triggering request.

pub mod aggregator;
pub mod api;
pub mod batch;
pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod status;
pub mod store;

pub use error::{Result, VentsrvError};

/// Service name used in logs and health responses
pub const SERVICE_NAME: &str = "ventsrv";
/// Service version from the crate manifest
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
