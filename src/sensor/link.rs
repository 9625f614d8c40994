//! Byte links to sensor boards.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::error::{SensorError, SensorResult};

/// A readable link that can report pending input without blocking.
pub trait SerialLink: Read + Send {
    /// Number of bytes that can be read right now.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the link can no longer be polled.
    fn bytes_available(&mut self) -> io::Result<usize>;
}

impl SerialLink for Box<dyn SerialLink> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }
}

/// A serial device opened through the `serialport` driver.
pub struct SerialPortLink {
    name: String,
    port: Box<dyn SerialPort>,
}

impl fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPortLink").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Open a serial device.
///
/// # Errors
///
/// Returns [`SensorError::Connect`] if the device does not exist, is busy, or
/// rejects the settings within `timeout`.
pub fn open_serial(path: &str, baud_rate: u32, timeout: Duration) -> SensorResult<SerialPortLink> {
    let port = serialport::new(path, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|e| SensorError::Connect {
            port: path.to_string(),
            reason: e.to_string(),
        })?;
    info!(port = path, baud_rate, "serial device opened");
    Ok(SerialPortLink {
        name: path.to_string(),
        port,
    })
}

impl SerialPortLink {
    /// Device path this link was opened from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A second handle on the same device, used for outbound writes while
    /// the receiver owns this one.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Io`] if the driver cannot duplicate the handle.
    pub fn try_clone_writer(&self) -> SensorResult<Box<dyn SerialPort>> {
        self.port.try_clone().map_err(|e| SensorError::Io(e.into()))
    }
}

impl Read for SerialPortLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialPortLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl SerialLink for SerialPortLink {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(usize::try_from(pending).unwrap_or(usize::MAX))
    }
}

type Shared = Arc<Mutex<VecDeque<u8>>>;

/// In-memory link for tests and dry runs: bytes written to its
/// [`MemoryFeed`] become readable on the link.
#[derive(Debug)]
pub struct MemoryLink {
    inbound: Shared,
}

/// Writing side of a [`MemoryLink`].
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    inbound: Shared,
}

impl MemoryLink {
    /// Create a link and the feed that fills it.
    #[must_use]
    pub fn pair() -> (Self, MemoryFeed) {
        let inbound = Shared::default();
        (
            Self {
                inbound: Arc::clone(&inbound),
            },
            MemoryFeed { inbound },
        )
    }
}

impl MemoryFeed {
    /// Make raw bytes readable.
    pub fn push(&self, bytes: &[u8]) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(bytes);
    }

    /// Make one newline-terminated line readable.
    pub fn line(&self, line: &str) {
        self.push(line.as_bytes());
        self.push(b"\n");
    }

    /// Bytes not yet read by the link.
    #[must_use]
    pub fn unread(&self) -> usize {
        self.inbound.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Read for MemoryLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        let n = buf.len().min(inbound.len());
        for (dst, src) in buf.iter_mut().zip(inbound.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl SerialLink for MemoryLink {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.inbound.lock().unwrap_or_else(PoisonError::into_inner).len())
    }
}
