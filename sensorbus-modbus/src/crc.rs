//! Modbus RTU frame check sequence.
//!
//! Bit-reflected CRC-16 (IBM/Modbus variant), computed bit by bit. The
//! result is transmitted low byte first.

/// Initial accumulator value.
pub const CRC_INIT: u16 = 0xFFFF;

/// Reflected polynomial (0x8005 bit-reversed).
pub const CRC_POLY: u16 = 0xA001;

/// Length of the checksum trailer on every frame.
pub const CRC_LEN: usize = 2;

/// Compute the CRC-16/MODBUS accumulator over `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Checksum bytes in wire order (little-endian).
pub fn checksum(data: &[u8]) -> [u8; CRC_LEN] {
    crc16(data).to_le_bytes()
}
