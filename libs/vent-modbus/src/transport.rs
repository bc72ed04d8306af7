//! Serial transport for Modbus RTU
//!
//! `BusTransport` is the contract every bus user goes through; callers own
//! exactly one transport per physical bus and must serialize access to it
//! (a half-duplex line has one master).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::trace;

use crate::codec::ModbusCodec;
use crate::error::{ModbusError, ModbusResult};
use crate::frame;
use crate::pdu::ModbusPdu;

/// Serial line settings for the RTU link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial device path
    #[serde(default = "default_device")]
    pub device: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits (5-8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Stop bits (1 or 2)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Parity: "none", "even" or "odd"
    #[serde(default = "default_parity")]
    pub parity: String,

    /// Per-transaction timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_device() -> String {
    "/dev/ttyUSB1".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> String {
    "even".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Bus transport contract
///
/// All operations are bounded by the transport's transaction timeout and
/// report failure through `ModbusError` kinds rather than raising.
#[async_trait]
pub trait BusTransport: Send {
    /// Write a single coil (FC05)
    async fn write_coil(&mut self, slave_id: u8, address: u16, value: bool) -> ModbusResult<()>;

    /// Write a single holding register (FC06)
    async fn write_register(&mut self, slave_id: u8, address: u16, value: u16) -> ModbusResult<()>;

    /// Read discrete inputs (FC02)
    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>>;

    /// Read input registers (FC04)
    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>>;
}

/// Modbus RTU transport over a serial port
pub struct RtuTransport {
    port: SerialStream,
    timeout: Duration,
}

impl RtuTransport {
    /// Open the serial port with the given settings
    pub async fn open(settings: &SerialSettings) -> ModbusResult<Self> {
        let parity = match settings.parity.to_lowercase().as_str() {
            "even" | "e" => Parity::Even,
            "odd" | "o" => Parity::Odd,
            _ => Parity::None,
        };

        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match settings.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let timeout = Duration::from_millis(settings.timeout_ms);
        let port = tokio_serial::new(&settings.device, settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(timeout)
            .open_native_async()?;

        Ok(Self { port, timeout })
    }

    /// Execute one request/response exchange, bounded by the timeout
    async fn transaction(
        &mut self,
        slave_id: u8,
        request: &ModbusPdu,
        expected_len: usize,
    ) -> ModbusResult<ModbusPdu> {
        let request_frame = frame::encode_frame(slave_id, request);
        trace!(
            "TX slave {}: {:02X?} ({} bytes)",
            slave_id,
            request_frame,
            request_frame.len()
        );

        let response = tokio::time::timeout(
            self.timeout,
            Self::exchange(&mut self.port, &request_frame, expected_len),
        )
        .await
        .map_err(|_| {
            ModbusError::Timeout(format!(
                "No response from slave {} within {} ms",
                slave_id,
                self.timeout.as_millis()
            ))
        })??;

        trace!("RX slave {}: {:02X?}", slave_id, response);
        frame::decode_frame(&response, slave_id)
    }

    /// Write the request frame and accumulate the response frame
    async fn exchange(
        port: &mut SerialStream,
        request_frame: &[u8],
        expected_len: usize,
    ) -> ModbusResult<Vec<u8>> {
        port.write_all(request_frame).await?;
        port.flush().await?;

        let mut response = Vec::with_capacity(expected_len);
        let mut chunk = [0u8; 256];
        loop {
            let n = port.read(&mut chunk).await?;
            if n == 0 {
                return Err(ModbusError::Connection("Serial port closed".to_string()));
            }
            response.extend_from_slice(&chunk[..n]);

            // Exception responses are 5 bytes regardless of the request
            if response.len() >= 2 && response[1] & 0x80 != 0 {
                if response.len() >= frame::EXCEPTION_FRAME_LEN {
                    return Ok(response);
                }
            } else if response.len() >= expected_len {
                return Ok(response);
            }
        }
    }
}

#[async_trait]
impl BusTransport for RtuTransport {
    async fn write_coil(&mut self, slave_id: u8, address: u16, value: bool) -> ModbusResult<()> {
        let pdu = ModbusCodec::build_write_fc05_single_coil_pdu(address, value)?;
        let response = self
            .transaction(slave_id, &pdu, frame::expected_response_len(0x05, 0))
            .await?;
        ModbusCodec::parse_write_response(&response, 0x05)
    }

    async fn write_register(&mut self, slave_id: u8, address: u16, value: u16) -> ModbusResult<()> {
        let pdu = ModbusCodec::build_write_fc06_single_register_pdu(address, value)?;
        let response = self
            .transaction(slave_id, &pdu, frame::expected_response_len(0x06, 0))
            .await?;
        ModbusCodec::parse_write_response(&response, 0x06)
    }

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        let pdu = ModbusCodec::build_read_fc02_discrete_inputs_pdu(address, quantity)?;
        let response = self
            .transaction(slave_id, &pdu, frame::expected_response_len(0x02, quantity))
            .await?;
        ModbusCodec::parse_bits_response(&response, quantity)
    }

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        let pdu = ModbusCodec::build_read_fc04_input_registers_pdu(address, quantity)?;
        let response = self
            .transaction(slave_id, &pdu, frame::expected_response_len(0x04, quantity))
            .await?;
        ModbusCodec::parse_registers_response(&response, quantity)
    }
}
