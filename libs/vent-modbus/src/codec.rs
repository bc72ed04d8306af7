//! Modbus codec implementation
//!
//! Builds request PDUs and parses response PDUs for the function codes the
//! vent bridge uses: FC02 (read discrete inputs), FC04 (read input
//! registers), FC05 (write single coil), FC06 (write single register).

use crate::error::{ModbusError, ModbusResult};
use crate::pdu::{ModbusPdu, PduBuilder};

/// Modbus spec limit for bits per FC02 read
pub const MAX_READ_BITS: u16 = 2000;
/// Modbus spec limit for registers per FC04 read
pub const MAX_READ_REGISTERS: u16 = 125;

/// Modbus codec for request/response PDUs
pub struct ModbusCodec;

impl ModbusCodec {
    /// Build read PDU for FC02 (Read Discrete Inputs)
    pub fn build_read_fc02_discrete_inputs_pdu(
        address: u16,
        quantity: u16,
    ) -> ModbusResult<ModbusPdu> {
        if quantity == 0 || quantity > MAX_READ_BITS {
            return Err(ModbusError::InvalidRequest(format!(
                "Invalid bit count for FC02: {}",
                quantity
            )));
        }

        Ok(PduBuilder::new()
            .function_code(0x02)?
            .address(address)?
            .quantity(quantity)?
            .build())
    }

    /// Build read PDU for FC04 (Read Input Registers)
    pub fn build_read_fc04_input_registers_pdu(
        address: u16,
        quantity: u16,
    ) -> ModbusResult<ModbusPdu> {
        if quantity == 0 || quantity > MAX_READ_REGISTERS {
            return Err(ModbusError::InvalidRequest(format!(
                "Invalid register count for FC04: {}",
                quantity
            )));
        }

        Ok(PduBuilder::new()
            .function_code(0x04)?
            .address(address)?
            .quantity(quantity)?
            .build())
    }

    /// Build write PDU for FC05 (Write Single Coil)
    pub fn build_write_fc05_single_coil_pdu(address: u16, value: bool) -> ModbusResult<ModbusPdu> {
        // FC05 request value is 0xFF00 for ON, 0x0000 for OFF
        Ok(PduBuilder::new()
            .function_code(0x05)?
            .address(address)?
            .byte(if value { 0xFF } else { 0x00 })?
            .byte(0x00)?
            .build())
    }

    /// Build write PDU for FC06 (Write Single Register)
    pub fn build_write_fc06_single_register_pdu(
        address: u16,
        value: u16,
    ) -> ModbusResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(0x06)?
            .address(address)?
            .quantity(value)?
            .build())
    }

    /// Parse an FC02 response into bit values
    pub fn parse_bits_response(pdu: &ModbusPdu, quantity: u16) -> ModbusResult<Vec<bool>> {
        let data = Self::check_response(pdu, 0x02)?;

        let byte_count = data[1] as usize;
        let expected_bytes = (quantity as usize).div_ceil(8);
        if byte_count != expected_bytes || data.len() < 2 + byte_count {
            return Err(ModbusError::Protocol(format!(
                "FC02 byte count mismatch: expected {}, got {}",
                expected_bytes, byte_count
            )));
        }

        let mut bits = Vec::with_capacity(quantity as usize);
        for i in 0..quantity as usize {
            let byte = data[2 + i / 8];
            bits.push(byte & (1 << (i % 8)) != 0);
        }
        Ok(bits)
    }

    /// Parse an FC04 response into register values
    pub fn parse_registers_response(pdu: &ModbusPdu, quantity: u16) -> ModbusResult<Vec<u16>> {
        let data = Self::check_response(pdu, 0x04)?;

        let byte_count = data[1] as usize;
        let expected_bytes = quantity as usize * 2;
        if byte_count != expected_bytes || data.len() < 2 + byte_count {
            return Err(ModbusError::Protocol(format!(
                "FC04 byte count mismatch: expected {}, got {}",
                expected_bytes, byte_count
            )));
        }

        let mut registers = Vec::with_capacity(quantity as usize);
        for i in 0..quantity as usize {
            let hi = data[2 + i * 2];
            let lo = data[3 + i * 2];
            registers.push(u16::from_be_bytes([hi, lo]));
        }
        Ok(registers)
    }

    /// Parse a write response (FC05/FC06 echo the request on success)
    pub fn parse_write_response(pdu: &ModbusPdu, expected_fc: u8) -> ModbusResult<()> {
        let data = Self::check_response(pdu, expected_fc)?;

        // A write echo carries address + value after the function code
        if data.len() < 5 {
            return Err(ModbusError::Protocol(format!(
                "Short write response: {} bytes",
                data.len()
            )));
        }
        Ok(())
    }

    /// Common response validation: non-empty, not an exception, matching FC
    fn check_response(pdu: &ModbusPdu, expected_fc: u8) -> ModbusResult<&[u8]> {
        let data = pdu.as_slice();

        if data.is_empty() {
            return Err(ModbusError::Protocol("Empty response PDU".to_string()));
        }

        if pdu.is_exception() {
            return Err(ModbusError::exception(pdu.exception_code().unwrap_or(0)));
        }

        if data[0] != expected_fc {
            return Err(ModbusError::Protocol(format!(
                "Function code mismatch: expected {:02X}, got {:02X}",
                expected_fc, data[0]
            )));
        }

        if data.len() < 2 {
            return Err(ModbusError::Protocol("Truncated response PDU".to_string()));
        }

        Ok(data)
    }
}
