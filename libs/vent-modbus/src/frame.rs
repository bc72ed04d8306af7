//! Modbus RTU frame assembly and validation
//!
//! An RTU frame is the slave address, the PDU, and a CRC-16/MODBUS
//! checksum transmitted low byte first.

use crc::{Crc, CRC_16_MODBUS};

use crate::error::{ModbusError, ModbusResult};
use crate::pdu::ModbusPdu;

/// CRC-16/MODBUS (poly 0x8005 reflected, init 0xFFFF)
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Minimum valid RTU frame: address + function code + exception code + CRC
pub const MIN_FRAME_SIZE: usize = 4;

/// Compute the CRC-16/MODBUS checksum of a byte slice
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Assemble an RTU frame from a slave address and a PDU
pub fn encode_frame(slave_id: u8, pdu: &ModbusPdu) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + pdu.len() + 2);
    frame.push(slave_id);
    frame.extend_from_slice(pdu.as_slice());

    let crc = crc16(&frame);
    // CRC goes on the wire low byte first
    frame.push((crc & 0xFF) as u8);
    frame.push((crc >> 8) as u8);
    frame
}

/// Validate an RTU frame and extract its PDU
///
/// Checks the length, CRC, and slave address; the PDU itself is parsed by
/// the codec layer.
pub fn decode_frame(raw: &[u8], expected_slave: u8) -> ModbusResult<ModbusPdu> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(ModbusError::Frame(format!(
            "Frame too short: {} bytes",
            raw.len()
        )));
    }

    let payload = &raw[..raw.len() - 2];
    let received_crc = u16::from_le_bytes([raw[raw.len() - 2], raw[raw.len() - 1]]);
    let computed_crc = crc16(payload);
    if received_crc != computed_crc {
        return Err(ModbusError::Frame(format!(
            "CRC mismatch: received {:04X}, computed {:04X}",
            received_crc, computed_crc
        )));
    }

    if raw[0] != expected_slave {
        return Err(ModbusError::Frame(format!(
            "Slave address mismatch: expected {}, got {}",
            expected_slave, raw[0]
        )));
    }

    ModbusPdu::from_slice(&payload[1..])
}

/// Expected total response frame length for a request
///
/// `quantity` is the number of bits (FC02) or registers (FC04) requested;
/// ignored for write echoes. Exception responses are always 5 bytes and
/// are detected separately by the transport.
pub fn expected_response_len(function_code: u8, quantity: u16) -> usize {
    match function_code {
        // address + fc + byte count + packed bits + crc
        0x02 => 1 + 1 + 1 + (quantity as usize).div_ceil(8) + 2,
        // address + fc + byte count + 2 bytes per register + crc
        0x04 => 1 + 1 + 1 + quantity as usize * 2 + 2,
        // write echoes: address + fc + addr(2) + value(2) + crc
        0x05 | 0x06 => 8,
        _ => MIN_FRAME_SIZE,
    }
}

/// Total frame length of an exception response
pub const EXCEPTION_FRAME_LEN: usize = 5;
