//! Modbus RTU framing for reading a contiguous block of input registers.
//!
//! ```text
//! request:  [addr:1][func:1][start:2 BE][count:2 BE][crc:2 LE]
//! response: [addr:1][func:1][byte_count:1][reg:2 BE]*count[crc:2 LE]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crc::{CRC_LEN, checksum, crc16};

/// Function code 0x04: Read Input Registers.
pub const READ_INPUT_REGISTERS: u8 = 0x04;

/// Address, function code and byte count.
pub const RESPONSE_HEADER_LEN: usize = 3;

/// Length of an encoded read request.
pub const REQUEST_LEN: usize = 6 + CRC_LEN;

/// Contiguous span of input registers, shared by every device of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBlock {
    /// First register address.
    pub address: u16,
    /// Number of 16-bit registers.
    pub count: u16,
}

impl RegisterBlock {
    pub fn new(address: u16, count: u16) -> Self {
        Self { address, count }
    }

    /// Expected reply length: header + 2 bytes per register + checksum.
    pub fn response_len(&self) -> usize {
        response_len(self.count)
    }
}

/// Expected reply length for `count` registers.
pub fn response_len(count: u16) -> usize {
    RESPONSE_HEADER_LEN + 2 * usize::from(count) + CRC_LEN
}

/// A checksummed request, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    bytes: Vec<u8>,
}

impl RequestFrame {
    /// Build a read request for `block` on device `unit_id`.
    pub fn read(unit_id: u8, function_code: u8, block: RegisterBlock) -> Self {
        Self {
            bytes: encode_request(unit_id, function_code, block.address, block.count),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Space-separated uppercase hex, e.g. `6A 04 01 90 00 02 78 C1`.
impl fmt::Display for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.bytes)
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{:02X}", byte)?;
    }
    Ok(())
}

/// Wrapper rendering arbitrary bytes like [`RequestFrame`]'s `Display`.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, self.0)
    }
}

/// Encode a request frame: payload followed by its checksum.
pub fn encode_request(unit_id: u8, function_code: u8, address: u16, count: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(REQUEST_LEN);
    frame.push(unit_id);
    frame.push(function_code);
    frame.extend_from_slice(&address.to_be_bytes());
    frame.extend_from_slice(&count.to_be_bytes());
    let crc = checksum(&frame);
    frame.extend_from_slice(&crc);
    frame
}

/// How the trailing checksum of a response is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrcCheck {
    /// Accept the trailer as-is.
    #[default]
    Skip,
    /// Verify and report a mismatch, but keep the registers.
    Warn,
    /// Verify and turn a mismatch into NoData.
    Enforce,
}

/// Result of verifying a response trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Unchecked,
    Valid,
    Mismatch { expected: u16, received: u16 },
}

/// Why a poll produced no usable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDataReason {
    /// Fewer bytes than the expected reply length arrived before the timeout.
    Short { received: usize, expected: usize },
    /// Trailer did not match the computed checksum (enforced policy only).
    ChecksumMismatch { expected: u16, received: u16 },
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::Short { received: 0, .. } => write!(f, "no response"),
            NoDataReason::Short { received, expected } => {
                write!(f, "incomplete response ({}/{} bytes)", received, expected)
            }
            NoDataReason::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum mismatch (computed 0x{:04X}, received 0x{:04X})",
                expected, received
            ),
        }
    }
}

/// Decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Registers {
        values: Vec<u16>,
        checksum: ChecksumStatus,
    },
    NoData(NoDataReason),
}

/// Decode a response without verifying its checksum.
pub fn decode_response(bytes: &[u8], expected_count: u16) -> Response {
    decode_response_checked(bytes, expected_count, CrcCheck::Skip)
}

/// Decode a response for `expected_count` registers under a checksum policy.
///
/// Bytes past the expected length are ignored. The address, function code
/// and byte-count header fields are not inspected.
pub fn decode_response_checked(bytes: &[u8], expected_count: u16, policy: CrcCheck) -> Response {
    let expected = response_len(expected_count);
    if bytes.len() < expected {
        return Response::NoData(NoDataReason::Short {
            received: bytes.len(),
            expected,
        });
    }

    let frame = &bytes[..expected];
    let (body, trailer) = frame.split_at(expected - CRC_LEN);

    let status = match policy {
        CrcCheck::Skip => ChecksumStatus::Unchecked,
        CrcCheck::Warn | CrcCheck::Enforce => {
            let computed = crc16(body);
            let received = u16::from_le_bytes([trailer[0], trailer[1]]);
            if computed == received {
                ChecksumStatus::Valid
            } else {
                ChecksumStatus::Mismatch {
                    expected: computed,
                    received,
                }
            }
        }
    };

    if let (CrcCheck::Enforce, ChecksumStatus::Mismatch { expected, received }) = (policy, status)
    {
        return Response::NoData(NoDataReason::ChecksumMismatch { expected, received });
    }

    let values = body[RESPONSE_HEADER_LEN..]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    Response::Registers {
        values,
        checksum: status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit 106 reporting 25.0 C / 45.50 %RH.
    const GOOD_RESPONSE: [u8; 9] = [0x6A, 0x04, 0x04, 0x00, 0xFA, 0x11, 0xC6, 0x8D, 0x71];

    #[test]
    fn test_encode_default_request() {
        let frame = RequestFrame::read(106, READ_INPUT_REGISTERS, RegisterBlock::new(0x0190, 2));
        assert_eq!(
            frame.as_bytes(),
            &[0x6A, 0x04, 0x01, 0x90, 0x00, 0x02, 0x78, 0xC1]
        );
        assert_eq!(frame.len(), REQUEST_LEN);
        assert_eq!(frame.to_string(), "6A 04 01 90 00 02 78 C1");
    }

    #[test]
    fn test_request_header_fields_recoverable() {
        let cases = [
            (0u8, 0x04u8, 0u16, 0u16),
            (255, 0x04, 65535, 65535),
            (1, 0x03, 0x0191, 1),
            (129, 0x04, 0x8000, 0x007D),
        ];

        for (unit, function, address, count) in cases {
            let bytes = encode_request(unit, function, address, count);
            assert_eq!(bytes.len(), 6 + CRC_LEN);
            assert_eq!(bytes[0], unit);
            assert_eq!(bytes[1], function);
            assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), address);
            assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), count);
            assert_eq!(&bytes[6..], &checksum(&bytes[..6]));
        }
    }

    #[test]
    fn test_response_len() {
        assert_eq!(response_len(2), 9);
        assert_eq!(RegisterBlock::new(0x0190, 1).response_len(), 7);
        assert_eq!(response_len(125), 255);
    }

    #[test]
    fn test_decode_every_short_length() {
        for len in 0..GOOD_RESPONSE.len() {
            assert_eq!(
                decode_response(&GOOD_RESPONSE[..len], 2),
                Response::NoData(NoDataReason::Short {
                    received: len,
                    expected: 9
                }),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn test_decode_full_response() {
        assert_eq!(
            decode_response(&GOOD_RESPONSE, 2),
            Response::Registers {
                values: vec![250, 4550],
                checksum: ChecksumStatus::Unchecked,
            }
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = GOOD_RESPONSE.to_vec();
        bytes.extend_from_slice(&[0xDE, 0xAD]);

        match decode_response_checked(&bytes, 2, CrcCheck::Enforce) {
            Response::Registers { values, checksum } => {
                assert_eq!(values, vec![250, 4550]);
                assert_eq!(checksum, ChecksumStatus::Valid);
            }
            other => panic!("Expected registers, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_frame_accepted_when_unchecked() {
        let mut bytes = GOOD_RESPONSE;
        bytes[4] ^= 0x01;

        match decode_response(&bytes, 2) {
            Response::Registers { values, checksum } => {
                assert_eq!(values, vec![251, 4550]);
                assert_eq!(checksum, ChecksumStatus::Unchecked);
            }
            other => panic!("Expected registers, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_frame_flagged_when_warning() {
        let mut bytes = GOOD_RESPONSE;
        bytes[8] = 0x00;

        match decode_response_checked(&bytes, 2, CrcCheck::Warn) {
            Response::Registers { values, checksum } => {
                assert_eq!(values, vec![250, 4550]);
                assert_eq!(
                    checksum,
                    ChecksumStatus::Mismatch {
                        expected: 0x718D,
                        received: 0x008D
                    }
                );
            }
            other => panic!("Expected registers, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_frame_rejected_when_enforced() {
        let mut bytes = GOOD_RESPONSE;
        bytes[8] = 0x00;

        assert_eq!(
            decode_response_checked(&bytes, 2, CrcCheck::Enforce),
            Response::NoData(NoDataReason::ChecksumMismatch {
                expected: 0x718D,
                received: 0x008D
            })
        );
    }

    #[test]
    fn test_no_data_display() {
        let none = NoDataReason::Short {
            received: 0,
            expected: 9,
        };
        let partial = NoDataReason::Short {
            received: 3,
            expected: 9,
        };
        assert_eq!(none.to_string(), "no response");
        assert_eq!(partial.to_string(), "incomplete response (3/9 bytes)");
    }

    #[test]
    fn test_crc_check_parses_lowercase() {
        let policy: CrcCheck = serde_json::from_str("\"enforce\"").unwrap();
        assert_eq!(policy, CrcCheck::Enforce);
        assert_eq!(CrcCheck::default(), CrcCheck::Skip);
    }
}
