//! Transport layer for P-Pump communication.
//!
//! [`Transport`] is the byte-level seam to the serial channel, and [`Link`]
//! layers the frame exchange discipline on top of it. Only USB/Serial is
//! implemented.

pub mod link;
pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;

/// Trait for transport implementations.
pub trait Transport: Send {
    /// Connects to the device.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Discards any bytes waiting in the input buffer, returning how many
    /// were dropped.
    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>>;

    /// Sends data to the device.
    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Receives exactly `len` bytes.
    ///
    /// Fails with [`crate::Error::Timeout`] if nothing arrives within
    /// `timeout`, and with [`crate::FrameError::Incomplete`] if the device
    /// stops part way.
    fn receive(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use link::{Link, LinkConfig};
pub use serial::{SerialConfig, SerialTransport};
