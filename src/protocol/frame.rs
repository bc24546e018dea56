//! Frame encoding and decoding for the P-Pump protocol.
//!
//! Every message in either direction is exactly 12 bytes:
//! ```text
//! ┌──────┬────────┬──────┬──────┬──────────┬────────────┬───────────────┬──────────┐
//! │ 0x02 │ target │ type │ rsvd │ location │ rsvd ×2    │ value (BE)    │ checksum │
//! │  0   │   1    │  2   │  3   │    4     │   5..=6    │    7..=10     │    11    │
//! └──────┴────────┴──────┴──────┴──────────┴────────────┴───────────────┴──────────┘
//! ```
//! The checksum is the XOR of the 11 preceding bytes.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::FrameError;
use crate::protocol::MessageType;

/// Start-of-frame byte.
pub const SYNC_BYTE: u8 = 0x02;

/// Length of every frame on the wire.
pub const FRAME_LEN: usize = 12;

/// Length of a frame without its checksum.
pub const PAYLOAD_LEN: usize = FRAME_LEN - 1;

/// Target id that addresses every pump on the link.
pub const BROADCAST_TARGET: u8 = 0;

const VALUE_OFFSET: usize = 7;

/// Computes the XOR checksum over a payload.
#[must_use]
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, b| acc ^ b)
}

/// A single 12-byte protocol frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Builds an outgoing frame.
    ///
    /// Location and value are only meaningful for reads and writes; for any
    /// other message type both fields are left zero.
    #[must_use]
    pub fn build(message_type: MessageType, location: u8, value: i32, target_id: u8) -> Self {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        buf.put_u8(SYNC_BYTE);
        buf.put_u8(target_id);
        buf.put_u8(message_type.into());
        buf.put_u8(0);
        if message_type.addresses_register() {
            buf.put_u8(location);
            buf.put_bytes(0, 2);
            buf.put_i32(value);
        } else {
            buf.put_bytes(0, 7);
        }

        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&buf);
        Self::from_payload(payload)
    }

    /// Seals an 11-byte payload with its checksum.
    #[must_use]
    pub fn from_payload(payload: [u8; PAYLOAD_LEN]) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..PAYLOAD_LEN].copy_from_slice(&payload);
        bytes[PAYLOAD_LEN] = checksum(&payload);
        Self(bytes)
    }

    /// Parses a received frame.
    ///
    /// Only the length is checked here; use [`Frame::verify_checksum`] to
    /// validate the trailing byte.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::WrongLength`] unless `bytes` is exactly
    /// [`FRAME_LEN`] long.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let array: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| FrameError::WrongLength {
            expected: FRAME_LEN,
            got: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Checks the trailing checksum against the payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ChecksumMismatch`] if they disagree.
    pub fn verify_checksum(&self) -> Result<(), FrameError> {
        let expected = checksum(&self.0[..PAYLOAD_LEN]);
        if expected == self.checksum() {
            Ok(())
        } else {
            Err(FrameError::ChecksumMismatch {
                expected,
                actual: self.checksum(),
            })
        }
    }

    /// Pump addressed by (or answering) this frame.
    #[must_use]
    pub const fn target_id(&self) -> u8 {
        self.0[1]
    }

    /// Raw message type byte.
    #[must_use]
    pub const fn message_type(&self) -> u8 {
        self.0[2]
    }

    /// Register location byte.
    #[must_use]
    pub const fn location(&self) -> u8 {
        self.0[4]
    }

    /// Value field as a big-endian signed integer.
    #[must_use]
    pub fn value(&self) -> i32 {
        (&self.0[VALUE_OFFSET..PAYLOAD_LEN]).get_i32()
    }

    /// Value field as a big-endian unsigned integer.
    #[must_use]
    pub fn raw_value(&self) -> u32 {
        (&self.0[VALUE_OFFSET..PAYLOAD_LEN]).get_u32()
    }

    /// Trailing checksum byte.
    #[must_use]
    pub const fn checksum(&self) -> u8 {
        self.0[PAYLOAD_LEN]
    }

    /// Returns byte `index` of the frame.
    ///
    /// # Panics
    ///
    /// Panics if `index >= FRAME_LEN`.
    #[must_use]
    pub(crate) const fn byte(&self, index: usize) -> u8 {
        self.0[index]
    }

    /// The frame as sent on the wire.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", hex::encode(self.0))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
