//! The serial line source.
//!
//! `SerialSource` owns the open serial port and yields one newline-terminated
//! line per call. The `serialport` crate only offers blocking reads with a
//! finite timeout, so each read runs on the blocking thread pool and loops on
//! `TimedOut`, accumulating partial data until the newline arrives. The
//! observable behavior is a read that blocks until a full line is available,
//! with no overall deadline: an unresponsive device stalls the caller
//! indefinitely.
//!
//! Exactly one read is outstanding at a time; the next read is not issued
//! until the caller asks for the next line.

use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use async_trait::async_trait;
use serialport::SerialPort;
use thiserror::Error;
use tracing::debug;

use crate::config::serial::SerialConfig;

/// Poll interval for the underlying port. Reads loop on `TimedOut`, so this
/// only bounds how often the blocking thread wakes, not how long a line may
/// take to arrive.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Failure to open the serial device. Fatal at startup.
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to open serial port {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },
}

/// Anything that can produce newline-terminated lines for the bridge.
///
/// The seam exists so the bridge loop can be exercised with scripted input;
/// the production implementation is [`SerialSource`].
#[async_trait]
pub trait LineSource: Send {
    /// Blocks until one line (including its terminator) is available, the
    /// stream ends, or the device errors.
    async fn next_line(&mut self) -> io::Result<String>;
}

/// A line source backed by a real serial device.
pub struct SerialSource {
    device: String,
    // Taken while a blocking read is in flight, restored afterwards.
    reader: Option<BufReader<Box<dyn SerialPort>>>,
}

impl SerialSource {
    /// Opens the configured device.
    ///
    /// # Errors
    ///
    /// `SerialError::Open` with the device path and the underlying cause if
    /// the port cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self, SerialError> {
        let port = serialport::new(&config.device, config.baud_rate)
            .timeout(POLL_TIMEOUT)
            .open()
            .map_err(|source| SerialError::Open {
                device: config.device.clone(),
                source,
            })?;

        debug!("Opened serial port {} at {} baud", config.device, config.baud_rate);

        Ok(Self {
            device: config.device.clone(),
            reader: Some(BufReader::new(port)),
        })
    }

    /// The device path this source reads from.
    pub fn device(&self) -> &str {
        &self.device
    }
}

#[async_trait]
impl LineSource for SerialSource {
    async fn next_line(&mut self) -> io::Result<String> {
        let mut reader = self.reader.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "serial reader is gone")
        })?;

        let (reader, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = read_one_line(&mut reader);
            (reader, outcome)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        self.reader = Some(reader);
        outcome
    }
}

/// Reads bytes up to and including the next newline.
///
/// `TimedOut` and `Interrupted` resume the read with the partial line kept;
/// any other error is surfaced to the caller. The sensor speaks ASCII, but a
/// glitched byte stream must not kill the read, so invalid UTF-8 is replaced
/// rather than rejected; the decoder will refuse the garbled token.
fn read_one_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut buf = Vec::new();
    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial stream closed",
                ))
            }
            Ok(_) => return Ok(String::from_utf8_lossy(&buf).into_owned()),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                continue
            }
            Err(e) => return Err(e),
        }
    }
}
