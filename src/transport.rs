// Byte-stream transport contract consumed by the motion engine.
//
// The engine never owns transport lifecycle: it is handed an already
// connectable handle and only pushes frames through it. A serial port
// implementation is provided for real hardware; the simulator provides an
// in-memory one.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serialport::{self, SerialPort};
use tracing::debug;

/// Errors surfaced by a transport implementation.
///
/// Any of these is fatal to the executor's current drain.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Send timed out after {timeout_ms} ms")]
    SendTimeout { timeout_ms: u64 },

    #[error("Transport closed")]
    Closed,
}

/// Synchronous byte transport with caller-specified timeouts.
///
/// `receive` returns the bytes that arrived within the timeout, which may
/// be fewer than `n`; the caller decides whether a short read is an error.
/// With `blocking` false it returns whatever is immediately available.
pub trait Transport {
    fn send(&mut self, bytes: &[u8], timeout_ms: u64) -> Result<(), TransportError>;
    fn receive(&mut self, n: usize, timeout_ms: u64, blocking: bool)
        -> Result<Vec<u8>, TransportError>;
}

/// Default serial configuration for the motor controller link.
pub const DEFAULT_BAUDRATE: u32 = 38_400;

/// Serial-port transport for the real motor controller.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open a serial link at the default baudrate.
    pub fn open(port_name: &str) -> Result<Self, TransportError> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with a custom baudrate.
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(crate::config::RECEIVE_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }
}

impl Transport for SerialLink {
    fn send(&mut self, bytes: &[u8], timeout_ms: u64) -> Result<(), TransportError> {
        self.port.set_timeout(Duration::from_millis(timeout_ms))?;
        debug!("Serial send: {:02X?}", bytes);
        self.port.write_all(bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                TransportError::SendTimeout { timeout_ms }
            } else {
                TransportError::Io(e)
            }
        })?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(
        &mut self,
        n: usize,
        timeout_ms: u64,
        blocking: bool,
    ) -> Result<Vec<u8>, TransportError> {
        let timeout = if blocking {
            Duration::from_millis(timeout_ms)
        } else {
            Duration::from_millis(1)
        };
        self.port.set_timeout(timeout)?;

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(read) => filled += read,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(TransportError::Io(e)),
            }
            if !blocking || Instant::now() >= deadline {
                break;
            }
        }

        buf.truncate(filled);
        debug!("Serial receive: {:02X?}", buf);
        Ok(buf)
    }
}
