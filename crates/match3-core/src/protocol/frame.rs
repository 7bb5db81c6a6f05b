//! Frame codec: 6-byte packets with a CRC-8 trailer.

use std::fmt;

use crc::{CRC_8_SMBUS, Crc};
use thiserror::Error;

use super::constants::{FRAME_LEN, PAYLOAD_LEN, RSP_BAD_CRC, STATUS_FAIL};

/// CRC-8/SMBUS: poly 0x07, init 0x00, no reflection, no final XOR.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Checksum of a byte slice.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    BadChecksum { computed: u8, received: u8 },

    #[error("Frame too short: expected 6 bytes, got {actual}")]
    TooShort { actual: usize },
}

/// A decoded frame: command byte plus four argument bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub cmd: u8,
    pub args: [u8; 4],
}

impl Frame {
    pub const fn new(cmd: u8, a: u8, b: u8, c: u8, d: u8) -> Self {
        Self {
            cmd,
            args: [a, b, c, d],
        }
    }

    /// Diagnostic reply for a frame whose checksum did not match.
    pub const fn bad_checksum(computed: u8, received: u8) -> Self {
        Self::new(RSP_BAD_CRC, computed, received, STATUS_FAIL, STATUS_FAIL)
    }

    /// The five checksummed bytes.
    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        let [a, b, c, d] = self.args;
        [self.cmd, a, b, c, d]
    }

    pub fn checksum(&self) -> u8 {
        crc8(&self.payload())
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[..PAYLOAD_LEN].copy_from_slice(&self.payload());
        out[PAYLOAD_LEN] = self.checksum();
        out
    }

    /// Parse and verify wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_LEN {
            return Err(FrameError::TooShort {
                actual: bytes.len(),
            });
        }
        let computed = crc8(&bytes[..PAYLOAD_LEN]);
        let received = bytes[PAYLOAD_LEN];
        if computed != received {
            return Err(FrameError::BadChecksum { computed, received });
        }
        Ok(Self::new(bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]))
    }

    pub fn a(&self) -> u8 {
        self.args[0]
    }

    pub fn b(&self) -> u8 {
        self.args[1]
    }

    pub fn c(&self) -> u8 {
        self.args[2]
    }

    pub fn d(&self) -> u8 {
        self.args[3]
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.args;
        write!(
            f,
            "Frame({:02X} {:02X} {:02X} {:02X} {:02X})",
            self.cmd, a, b, c, d
        )
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.encode().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc8_known_values() {
        let test_cases: [(&[u8], u8); 4] = [
            (&[0x10, 0, 0, 0, 0], 0x32),
            (b"123456789", 0xF4),
            (&[0x11, 0, 0, 0, 0xAA], 0x0F),
            (b"", 0x00),
        ];
        for (data, expected) in test_cases {
            assert_eq!(crc8(data), expected, "data {:02X?}", data);
        }
    }

    #[test]
    fn test_encode_appends_checksum() {
        let bytes = Frame::new(0x10, 0, 0, 0, 0).encode();
        assert_eq!(bytes, [0x10, 0, 0, 0, 0, 0x32]);
        assert_eq!(Frame::decode(&bytes), Ok(Frame::new(0x10, 0, 0, 0, 0)));
    }

    #[test]
    fn test_decode_reports_both_checksums() {
        let err = Frame::decode(&[0x10, 0, 0, 0, 0, 0x33]).unwrap_err();
        assert_eq!(
            err,
            FrameError::BadChecksum {
                computed: 0x32,
                received: 0x33
            }
        );
        assert_eq!(
            Frame::decode(&[0x10, 0, 0]),
            Err(FrameError::TooShort { actual: 3 })
        );
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(Frame::new(0x10, 0, 0, 0, 0).to_string(), "10 00 00 00 00 32");
    }

    proptest! {
        #[test]
        fn prop_single_bit_flip_is_detected(
            payload in any::<[u8; 5]>(),
            bit in 0usize..40,
        ) {
            let mut corrupted = payload;
            corrupted[bit / 8] ^= 1 << (bit % 8);
            prop_assert_ne!(crc8(&payload), crc8(&corrupted));
        }

        #[test]
        fn prop_checksum_is_pure(payload in any::<[u8; 5]>()) {
            prop_assert_eq!(crc8(&payload), crc8(&payload));
        }
    }
}
