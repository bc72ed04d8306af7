//! Per-unit status reading
//!
//! One status read is three sequential bus transactions against the same
//! unit: on/off discrete input, temperature input register (tenths of a
//! degree), fan speed input register.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use vent_modbus::{ModbusError, ModbusResult};

use crate::bus::SharedBus;

/// Status of one vent unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    #[serde(rename = "Status")]
    pub on_off: u8,
    #[serde(rename = "Temp")]
    pub temperature: f64,
    #[serde(rename = "Speed")]
    pub speed: u16,
}

impl UnitStatus {
    /// Fixed values reported in disconnected/demo mode
    pub fn simulated() -> Self {
        Self {
            on_off: 1,
            temperature: 20.0,
            speed: 1,
        }
    }
}

/// Reads on/off, temperature and speed for one unit
#[derive(Clone)]
pub struct StatusReader {
    bus: Arc<SharedBus>,
}

impl StatusReader {
    pub fn new(bus: Arc<SharedBus>) -> Self {
        Self { bus }
    }

    /// Read one unit's status.
    ///
    /// Disconnected bus: returns the fixed simulated status so the bridge
    /// keeps serving in demo mode. Connected bus: a failed individual read
    /// defaults that field to 0 and the read continues; only a
    /// connection-class fault errors the read as a whole.
    pub async fn read(
        &self,
        slave_id: u8,
        on_address: u16,
        temp_address: u16,
        speed_address: u16,
    ) -> ModbusResult<UnitStatus> {
        if !self.bus.is_connected() {
            return Ok(UnitStatus::simulated());
        }

        let on_off = match self.bus.read_discrete_input(slave_id, on_address).await {
            Ok(bit) => u8::from(bit),
            Err(e) => self.field_default(slave_id, on_address, "on/off", e)?,
        };

        let temperature = match self.bus.read_input_register(slave_id, temp_address).await {
            Ok(raw) => f64::from(raw) / 10.0,
            Err(e) => f64::from(self.field_default(slave_id, temp_address, "temperature", e)?),
        };

        let speed = match self.bus.read_input_register(slave_id, speed_address).await {
            Ok(raw) => raw,
            Err(e) => u16::from(self.field_default(slave_id, speed_address, "speed", e)?),
        };

        Ok(UnitStatus {
            on_off,
            temperature,
            speed,
        })
    }

    /// Per-field fallback: transient faults default the field to 0,
    /// connection loss aborts the whole read
    fn field_default(
        &self,
        slave_id: u8,
        address: u16,
        field: &str,
        err: ModbusError,
    ) -> ModbusResult<u8> {
        if err.is_connection_error() {
            return Err(err);
        }
        warn!(
            "Slave {} {} read at address {} failed, defaulting to 0: {}",
            slave_id, field, address, err
        );
        Ok(0)
    }
}
