//! Frame exchange over a [`Transport`].

use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::{FRAME_LEN, Frame};
use crate::transport::Transport;

/// Default time to wait for a reply frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Default pause after writing a frame, giving the pump time to process it.
pub const DEFAULT_COMMAND_DELAY: Duration = Duration::from_millis(100);

/// Timing and validation settings for a [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Time to wait for a reply frame.
    pub read_timeout: Duration,
    /// Pause after each write before reading.
    pub command_delay: Duration,
    /// Reject replies whose checksum does not match.
    pub verify_checksums: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            command_delay: DEFAULT_COMMAND_DELAY,
            verify_checksums: true,
        }
    }
}

/// Owns a transport and performs one frame exchange at a time.
///
/// The link never retries; callers decide what a failed exchange means.
pub struct Link<T> {
    transport: T,
    config: LinkConfig,
}

impl<T: Transport> Link<T> {
    /// Creates a link over `transport`.
    #[must_use]
    pub const fn new(transport: T, config: LinkConfig) -> Self {
        Self { transport, config }
    }

    /// Writes `frame` and waits out the command delay.
    ///
    /// Bytes left in the input buffer by an earlier exchange are discarded
    /// first so that the next [`Link::read`] returns the reply to this frame.
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        let stale = self.transport.discard_input().await?;
        if stale > 0 {
            tracing::debug!("discarded {} stale bytes before exchange", stale);
        }

        tracing::trace!("-> {}", frame);
        self.transport
            .send(Bytes::copy_from_slice(frame.as_bytes()))
            .await?;

        if !self.config.command_delay.is_zero() {
            tokio::time::sleep(self.config.command_delay).await;
        }
        Ok(())
    }

    /// Reads one 12-byte frame.
    pub async fn read(&mut self, timeout: Duration) -> Result<Frame> {
        let bytes = self.transport.receive(FRAME_LEN, timeout).await?;
        let frame = Frame::parse(&bytes)?;
        tracing::trace!("<- {}", frame);
        if self.config.verify_checksums {
            frame.verify_checksum()?;
        }
        Ok(frame)
    }

    /// Returns the link configuration.
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the link, returning the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}
