//! Protocol definitions for P-Pump communication.
//!
//! This module contains the low-level protocol types including:
//! - Fixed 12-byte frame encoding/decoding
//! - Message types and register addresses
//! - Response classification

pub mod frame;
pub mod register;
pub mod response;

pub use frame::{BROADCAST_TARGET, FRAME_LEN, Frame, PAYLOAD_LEN, SYNC_BYTE, checksum};
pub use register::{MessageType, Register, RunCommand};
pub use response::{ErrorReason, ResponseOutcome, interpret};
