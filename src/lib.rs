//! # ppump
//!
//! A Rust driver for Dolomite Mitos P-Pump microfluidic pressure pumps.
//!
//! This library provides async communication with P-Pump devices over their
//! USB/Serial link, using the pump's fixed 12-byte register protocol.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Write-then-confirm state changes with a bounded attempt budget
//! - Pump fault codes decoded into typed errors, with the pump forced idle
//! - Event stream for presenting progress
//!
//! ## Quick Start
//!
//! ```no_run
//! use ppump::PPump;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ppump::Error> {
//!     let mut pump = PPump::serial("/dev/ttyUSB0");
//!     pump.connect().await?;
//!
//!     println!("Sensor: {}", pump.get_sensor().await?);
//!
//!     // Pump 5 ul/min for two minutes, then idle
//!     pump.set_flow(5.0, "ul/m", "00:00:02:00").await?;
//!
//!     pump.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Frame codec, registers and response classification
//! - [`types`] - Decoded register values (mode, faults, sensors)
//! - [`units`] - Flow unit and hold duration parsing
//! - [`transport`] - Transport implementations (currently USB/Serial)
//! - [`event`] - Event stream for observing pump activity
//! - [`commands`] - Register read/write commands
//! - [`client`] - High-level [`PPump`] client

pub mod client;
pub mod commands;
pub mod error;
pub mod event;
pub mod protocol;
pub mod transport;
pub mod types;
pub mod units;

// Re-exports for convenience
pub use client::{PPump, PumpConfig};
pub use error::{Error, FrameError, Result};
pub use event::{Event, EventDispatcher, Subscription};
pub use protocol::{ErrorReason, Frame, MessageType, Register, ResponseOutcome, RunCommand};
pub use transport::{SerialConfig, SerialTransport, Transport};
pub use types::{ControlType, ErrorCode, Pressures, PumpMode, SensorDescriptor, Temperatures};
pub use units::{FlowUnit, HoldDuration};
