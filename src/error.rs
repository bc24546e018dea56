//! Error types for the ppump library.

use thiserror::Error;

use crate::protocol::{ErrorReason, Register, ResponseOutcome};
use crate::types::ErrorCode;

/// The main error type for pump operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    /// The pump did not answer within the read timeout.
    #[error("no response from pump after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The pump rejected the last command.
    #[error("pump rejected command: {0}")]
    Protocol(ErrorReason),

    /// The pump answered with a frame of the wrong kind.
    #[error("unexpected response, expected {expected}: {outcome}")]
    UnexpectedResponse {
        expected: &'static str,
        outcome: ResponseOutcome,
    },

    /// A register returned a value outside its enumeration.
    #[error("register {register:?} returned out-of-range value {value}")]
    InvalidRegisterValue { register: Register, value: u32 },

    /// The pump entered its internal error mode and was forced back to idle.
    #[error("pump error (pump set to idle): {code}")]
    Device { code: ErrorCode },

    /// A write-then-confirm loop never observed the requested state.
    ///
    /// The pump has been forced to idle before this error is returned.
    #[error("could not {operation} after {attempts} attempts, probable hardware fault")]
    Convergence {
        operation: &'static str,
        attempts: u32,
    },

    /// Unknown flow unit literal.
    #[error("'{unit}' is not a valid flow unit, choose from: {choices}", choices = crate::units::FlowUnit::LITERALS.join(", "))]
    InvalidUnit { unit: String },

    /// Malformed `dd:hh:mm:ss` hold duration.
    #[error("invalid hold duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: &'static str },

    /// A converted target does not fit the 32-bit wire field.
    #[error("target {value} does not fit in a signed 32-bit register")]
    TargetOutOfRange { value: f64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,
}

/// Frame-specific errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is not exactly 12 bytes.
    #[error("frame must be {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },

    /// The pump stopped sending part way through a frame.
    #[error("incomplete frame: expected {expected} bytes, got {got}")]
    Incomplete { expected: usize, got: usize },

    /// Trailing checksum does not match the payload.
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Result type alias for pump operations.
pub type Result<T> = std::result::Result<T, Error>;
