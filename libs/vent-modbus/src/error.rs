//! Error handling for the Modbus RTU client
//!
//! Every transport operation returns an explicit error kind instead of
//! raising; callers decide per call whether a fault is fatal.

use thiserror::Error;

/// Result type alias for Modbus operations
pub type ModbusResult<T> = std::result::Result<T, ModbusError>;

/// Errors that can occur during a Modbus transaction
#[derive(Error, Debug, Clone)]
pub enum ModbusError {
    /// Serial port could not be opened or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO error while reading or writing the serial port
    #[error("IO error: {0}")]
    Io(String),

    /// Transaction did not complete within the configured timeout
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Malformed frame: bad CRC, short frame, or wrong slave address
    #[error("Frame error: {0}")]
    Frame(String),

    /// Protocol-level error: unexpected function code or byte count
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Device answered with a Modbus exception response
    #[error("Modbus exception {code:#04X} ({description})")]
    Exception {
        /// Exception code from the device
        code: u8,
        /// Human-readable meaning of the code
        description: &'static str,
    },

    /// Request could not be encoded (invalid quantity or oversized PDU)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ModbusError {
    /// Build an exception error from a device exception code
    pub fn exception(code: u8) -> Self {
        ModbusError::Exception {
            code,
            description: Self::exception_description(code),
        }
    }

    /// Human-readable description for a Modbus exception code
    pub fn exception_description(code: u8) -> &'static str {
        match code {
            0x01 => "Illegal Function",
            0x02 => "Illegal Data Address",
            0x03 => "Illegal Data Value",
            0x04 => "Slave Device Failure",
            0x05 => "Acknowledge",
            0x06 => "Slave Device Busy",
            0x08 => "Memory Parity Error",
            0x0A => "Gateway Path Unavailable",
            0x0B => "Gateway Target Failed to Respond",
            _ => "Unknown Exception",
        }
    }

    /// True when the error indicates the physical link itself is unusable,
    /// as opposed to a single failed transaction.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ModbusError::Connection(_))
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        ModbusError::Io(err.to_string())
    }
}

impl From<tokio_serial::Error> for ModbusError {
    fn from(err: tokio_serial::Error) -> Self {
        ModbusError::Connection(err.to_string())
    }
}
