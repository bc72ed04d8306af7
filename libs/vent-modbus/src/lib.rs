//! Modbus RTU client for HVAC field-bus devices
//!
//! Implements the subset of Modbus the vent bridge needs: single coil and
//! register writes (FC05/FC06) and discrete input / input register reads
//! (FC02/FC04) over a half-duplex serial line. The `BusTransport` trait is
//! the contract consumed by the bridge; `RtuTransport` is the serial
//! implementation.

pub mod codec;
pub mod error;
pub mod frame;
pub mod pdu;
pub mod transport;

pub use codec::ModbusCodec;
pub use error::{ModbusError, ModbusResult};
pub use pdu::{ModbusPdu, PduBuilder, MAX_PDU_SIZE};
pub use transport::{BusTransport, RtuTransport, SerialSettings};
