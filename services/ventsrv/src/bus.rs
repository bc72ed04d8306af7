//! Shared bus handle
//!
//! The field bus is a half-duplex serial line with a single master: two
//! in-flight transactions would interleave bytes on the wire and corrupt
//! both. `SharedBus` is the single serialization point every bus
//! transaction passes through: the dispatcher, the status reader and both
//! bulk workers all hold the same handle and queue on its mutex.

use tokio::sync::Mutex;
use vent_modbus::{BusTransport, ModbusError, ModbusResult};

/// Shared, serialized handle to the one physical bus transport
pub struct SharedBus {
    /// The transport, present only when the link came up at startup.
    /// The mutex is held for the full duration of one transaction.
    transport: Option<Mutex<Box<dyn BusTransport>>>,
}

impl SharedBus {
    /// Wrap an opened transport
    pub fn connected(transport: Box<dyn BusTransport>) -> Self {
        Self {
            transport: Some(Mutex::new(transport)),
        }
    }

    /// Bus handle for disconnected/demo mode: every transaction fails with
    /// a connection error and status reads fall back to simulated values
    pub fn disconnected() -> Self {
        Self { transport: None }
    }

    /// Whether the link was established at startup
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Write a single coil on one unit
    pub async fn write_coil(&self, slave_id: u8, address: u16, value: bool) -> ModbusResult<()> {
        match &self.transport {
            Some(transport) => transport.lock().await.write_coil(slave_id, address, value).await,
            None => Err(Self::not_connected()),
        }
    }

    /// Write a single register on one unit
    pub async fn write_register(&self, slave_id: u8, address: u16, value: u16) -> ModbusResult<()> {
        match &self.transport {
            Some(transport) => {
                transport
                    .lock()
                    .await
                    .write_register(slave_id, address, value)
                    .await
            }
            None => Err(Self::not_connected()),
        }
    }

    /// Read a single discrete input bit from one unit
    pub async fn read_discrete_input(&self, slave_id: u8, address: u16) -> ModbusResult<bool> {
        match &self.transport {
            Some(transport) => {
                let bits = transport
                    .lock()
                    .await
                    .read_discrete_inputs(slave_id, address, 1)
                    .await?;
                bits.first().copied().ok_or_else(|| {
                    ModbusError::Protocol("Empty discrete input response".to_string())
                })
            }
            None => Err(Self::not_connected()),
        }
    }

    /// Read a single input register from one unit
    pub async fn read_input_register(&self, slave_id: u8, address: u16) -> ModbusResult<u16> {
        match &self.transport {
            Some(transport) => {
                let registers = transport
                    .lock()
                    .await
                    .read_input_registers(slave_id, address, 1)
                    .await?;
                registers.first().copied().ok_or_else(|| {
                    ModbusError::Protocol("Empty input register response".to_string())
                })
            }
            None => Err(Self::not_connected()),
        }
    }

    fn not_connected() -> ModbusError {
        ModbusError::Connection("Modbus device not connected".to_string())
    }
}
