//! Serial/USB transport implementation.
//!
//! The P-Pump ships with a USB to RS-232 converter; the link runs at
//! 115200 baud, 8 data bits, no parity, one stop bit.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits,
};

use crate::error::{Error, FrameError, Result};
use crate::transport::Transport;

/// Default baud rate for P-Pump devices.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }
}

/// Serial transport for P-Pump communication.
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub const fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Adopts a stream that was opened and configured elsewhere.
    #[must_use]
    pub fn from_stream(stream: SerialStream) -> Self {
        let port = tokio_serial::SerialPort::name(&stream).unwrap_or_default();
        let baud_rate = tokio_serial::SerialPort::baud_rate(&stream).unwrap_or(DEFAULT_BAUD_RATE);
        Self {
            config: SerialConfig { port, baud_rate },
            stream: Some(stream),
        }
    }

    fn stream_mut(&mut self) -> Result<&mut SerialStream> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to serial port: {}", self.config.port);

            let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .open_native_async()
                .map_err(Error::Serial)?;

            self.stream = Some(stream);
            tracing::info!("connected to serial port");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.take().is_some() {
                tracing::info!("disconnected from serial port: {}", self.config.port);
            }
            Ok(())
        })
    }

    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            let pending =
                tokio_serial::SerialPort::bytes_to_read(stream).map_err(Error::Serial)?;
            tokio_serial::SerialPort::clear(stream, ClearBuffer::Input).map_err(Error::Serial)?;
            Ok(pending as usize)
        })
    }

    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            tracing::trace!("sending {} bytes", data.len());
            stream.write_all(&data).await.map_err(Error::Io)?;
            stream.flush().await.map_err(Error::Io)?;
            Ok(())
        })
    }

    fn receive(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            read_exact_within(stream, len, timeout).await
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Reads exactly `len` bytes, giving up once `timeout` has elapsed.
pub(crate) async fn read_exact_within<R>(reader: &mut R, len: usize, timeout: Duration) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    let deadline = tokio::time::Instant::now() + timeout;

    while filled < len {
        match tokio::time::timeout_at(deadline, reader.read(&mut buf[filled..])).await {
            Ok(Ok(0)) => {
                if filled == 0 {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "serial port closed",
                    )));
                }
                break;
            }
            Ok(Ok(n)) => filled += n,
            Ok(Err(e)) => return Err(Error::Io(e)),
            Err(_) => break,
        }
    }

    if filled == 0 {
        return Err(Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        });
    }
    if filled < len {
        tracing::debug!("short read: {} of {} bytes", filled, len);
        return Err(FrameError::Incomplete {
            expected: len,
            got: filled,
        }
        .into());
    }

    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyUSB0").baud_rate(9600);
        assert_eq!(config.baud_rate, 9600);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut transport = SerialTransport::with_port("/dev/ttyUSB0");
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(Bytes::from_static(&[0x02])).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            transport.discard_input().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_read_exact_within_full() {
        let (mut device, mut host) = tokio::io::duplex(64);
        device.write_all(&[1, 2, 3, 4]).await.unwrap();

        let bytes = read_exact_within(&mut host, 4, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_exact_within_timeout() {
        let (_device, mut host) = tokio::io::duplex(64);

        let err = read_exact_within(&mut host, 12, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 2000 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_exact_within_short_read() {
        let (mut device, mut host) = tokio::io::duplex(64);
        device.write_all(&[0x02, 0x00, 0x01]).await.unwrap();

        let err = read_exact_within(&mut host, 12, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Frame(FrameError::Incomplete {
                expected: 12,
                got: 3
            })
        ));
    }
}
