use thiserror::Error;

/// Result type for ventsrv
pub type Result<T> = std::result::Result<T, VentsrvError>;

/// Errors that can occur in ventsrv
#[derive(Error, Debug)]
pub enum VentsrvError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bus error: {0}")]
    BusError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl From<vent_modbus::ModbusError> for VentsrvError {
    fn from(err: vent_modbus::ModbusError) -> Self {
        VentsrvError::BusError(err.to_string())
    }
}
