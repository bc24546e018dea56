//! Classification of frames received from the pump.

use std::fmt;

use crate::protocol::Frame;

/// Response type byte of a read reply carrying a value.
const RESPONSE_READ_VALUE: u8 = 0x01;
/// Response type byte of a write acknowledgment.
const RESPONSE_ACK: u8 = 0x02;
/// Response type byte of a rejected command.
const RESPONSE_ERROR: u8 = 0x03;
/// Response type byte of a firmware version report.
const RESPONSE_FIRMWARE: u8 = 0x04;

/// Reason given by the pump when it rejects a command (byte 3 of an error frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    /// The pump computed a different checksum.
    ChecksumError,
    /// Message type or register not understood.
    UnknownCommand,
    /// Register out of range or value rejected.
    InvalidDataOrAddress,
    /// Any other reason byte.
    CommunicationsTimeout,
}

impl ErrorReason {
    /// Parses the reason byte. Unknown bytes map to `CommunicationsTimeout`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::ChecksumError,
            2 => Self::UnknownCommand,
            3 => Self::InvalidDataOrAddress,
            _ => Self::CommunicationsTimeout,
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ChecksumError => "checksum error",
            Self::UnknownCommand => "command unknown",
            Self::InvalidDataOrAddress => "invalid data, out of range address or value",
            Self::CommunicationsTimeout => "communications timeout failure",
        })
    }
}

/// Interpreted meaning of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseOutcome {
    /// Write acknowledged.
    Ack,
    /// Value returned by a read.
    ReadValue(u32),
    /// Command rejected.
    ProtocolError(ErrorReason),
    /// Firmware version, most significant part first.
    FirmwareVersion([u8; 4]),
    /// Message type not defined by the protocol.
    Unrecognized(u8),
}

impl fmt::Display for ResponseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => f.write_str("pump response: OK"),
            Self::ReadValue(value) => write!(f, "read request response: {value}"),
            Self::ProtocolError(reason) => write!(f, "pump error: {reason}"),
            Self::FirmwareVersion([a, b, c, d]) => write!(f, "firmware version: {a}.{b}.{c}.{d}"),
            Self::Unrecognized(kind) => write!(f, "unidentifiable message type {kind}"),
        }
    }
}

/// Classifies a frame by its message type byte.
///
/// Total over all frames; never fails.
#[must_use]
pub fn interpret(frame: &Frame) -> ResponseOutcome {
    match frame.message_type() {
        RESPONSE_READ_VALUE => ResponseOutcome::ReadValue(frame.raw_value()),
        RESPONSE_ACK => ResponseOutcome::Ack,
        RESPONSE_ERROR => ResponseOutcome::ProtocolError(ErrorReason::from_byte(frame.byte(3))),
        RESPONSE_FIRMWARE => ResponseOutcome::FirmwareVersion([
            frame.byte(3),
            frame.byte(4),
            frame.byte(5),
            frame.byte(6),
        ]),
        other => ResponseOutcome::Unrecognized(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(kind: u8, byte3: u8, tail: [u8; 4]) -> Frame {
        Frame::from_payload([
            0x02, 0x00, kind, byte3, 0x51, 0x00, 0x00, tail[0], tail[1], tail[2], tail[3],
        ])
    }

    #[test]
    fn test_read_value_is_big_endian_u32() {
        let frame = frame_with(1, 0, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(interpret(&frame), ResponseOutcome::ReadValue(0x0102_0304));

        let frame = frame_with(1, 0, [0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(interpret(&frame), ResponseOutcome::ReadValue(u32::MAX - 1));
    }

    #[test]
    fn test_upper_bytes_weighted_correctly() {
        // byte 7 counts 256^3 and byte 8 counts 256^2
        let frame = frame_with(1, 0, [0x00, 0x01, 0x00, 0x00]);
        assert_eq!(interpret(&frame), ResponseOutcome::ReadValue(65_536));
        let frame = frame_with(1, 0, [0x01, 0x00, 0x00, 0x00]);
        assert_eq!(interpret(&frame), ResponseOutcome::ReadValue(16_777_216));
    }

    #[test]
    fn test_ack() {
        assert_eq!(interpret(&frame_with(2, 0, [0; 4])), ResponseOutcome::Ack);
    }

    #[test]
    fn test_error_reasons() {
        let cases = [
            (1, ErrorReason::ChecksumError),
            (2, ErrorReason::UnknownCommand),
            (3, ErrorReason::InvalidDataOrAddress),
            (4, ErrorReason::CommunicationsTimeout),
            (0, ErrorReason::CommunicationsTimeout),
            (200, ErrorReason::CommunicationsTimeout),
        ];
        for (byte, reason) in cases {
            assert_eq!(
                interpret(&frame_with(3, byte, [0; 4])),
                ResponseOutcome::ProtocolError(reason)
            );
        }
    }

    #[test]
    fn test_firmware_version() {
        let frame = Frame::from_payload([0x02, 0x00, 0x04, 1, 2, 0, 4, 0, 0, 0, 0]);
        let outcome = interpret(&frame);
        assert_eq!(outcome, ResponseOutcome::FirmwareVersion([1, 2, 0, 4]));
        assert_eq!(outcome.to_string(), "firmware version: 1.2.0.4");
    }

    #[test]
    fn test_unknown_types_are_unrecognized() {
        for kind in (0..=u8::MAX).filter(|k| !(1..=4).contains(k)) {
            assert_eq!(
                interpret(&frame_with(kind, 0xaa, [1, 2, 3, 4])),
                ResponseOutcome::Unrecognized(kind)
            );
        }
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(ResponseOutcome::Ack.to_string(), "pump response: OK");
        assert_eq!(
            ResponseOutcome::ProtocolError(ErrorReason::UnknownCommand).to_string(),
            "pump error: command unknown"
        );
    }
}
