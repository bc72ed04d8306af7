//! Single control command execution
//!
//! A command targets either a coil (on/off actuator) or a register
//! (temperature setpoint in tenths of a degree, or fan speed) on one unit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bus::SharedBus;

/// One control command against one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// "coil", "temp" or "fan_speed"
    pub action: String,
    pub value: u16,
    pub address: u16,
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,
}

fn default_slave_id() -> u8 {
    1
}

/// Result of executing one command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: Command,
    pub succeeded: bool,
    pub message: String,
}

impl CommandOutcome {
    fn success(command: &Command, message: impl Into<String>) -> Self {
        Self {
            command: command.clone(),
            succeeded: true,
            message: message.into(),
        }
    }

    fn failure(command: &Command, message: impl Into<String>) -> Self {
        Self {
            command: command.clone(),
            succeeded: false,
            message: message.into(),
        }
    }
}

/// Validates and executes one command against the shared bus
#[derive(Clone)]
pub struct CommandDispatcher {
    bus: Arc<SharedBus>,
}

impl CommandDispatcher {
    pub fn new(bus: Arc<SharedBus>) -> Self {
        Self { bus }
    }

    /// Execute one command: exactly one bus write (coil or register),
    /// never both. Unknown actions and a disconnected bus fail without
    /// touching the bus at all.
    pub async fn execute(&self, cmd: &Command) -> CommandOutcome {
        if !self.bus.is_connected() {
            return CommandOutcome::failure(cmd, "Modbus device not connected");
        }

        match cmd.action.as_str() {
            "coil" => {
                match self
                    .bus
                    .write_coil(cmd.slave_id, cmd.address, cmd.value != 0)
                    .await
                {
                    Ok(()) => CommandOutcome::success(
                        cmd,
                        format!("Coil at address {} set to {}", cmd.address, cmd.value),
                    ),
                    Err(e) => {
                        warn!("Coil write to {}:{} failed: {}", cmd.slave_id, cmd.address, e);
                        CommandOutcome::failure(
                            cmd,
                            format!("Failed to write coil at address {}: {}", cmd.address, e),
                        )
                    }
                }
            }
            "temp" => {
                match self
                    .bus
                    .write_register(cmd.slave_id, cmd.address, cmd.value)
                    .await
                {
                    Ok(()) => CommandOutcome::success(
                        cmd,
                        format!(
                            "Temperature at address {} set to {:.1}°C",
                            cmd.address,
                            f64::from(cmd.value) / 10.0
                        ),
                    ),
                    Err(e) => {
                        warn!(
                            "Temperature write to {}:{} failed: {}",
                            cmd.slave_id, cmd.address, e
                        );
                        CommandOutcome::failure(
                            cmd,
                            format!(
                                "Failed to write temperature at address {}: {}",
                                cmd.address, e
                            ),
                        )
                    }
                }
            }
            "fan_speed" => {
                match self
                    .bus
                    .write_register(cmd.slave_id, cmd.address, cmd.value)
                    .await
                {
                    Ok(()) => CommandOutcome::success(
                        cmd,
                        format!("Fan speed at address {} set to {}", cmd.address, cmd.value),
                    ),
                    Err(e) => {
                        warn!(
                            "Fan speed write to {}:{} failed: {}",
                            cmd.slave_id, cmd.address, e
                        );
                        CommandOutcome::failure(
                            cmd,
                            format!("Failed to write fan speed at address {}: {}", cmd.address, e),
                        )
                    }
                }
            }
            _ => CommandOutcome::failure(cmd, "Invalid action specified"),
        }
    }
}
