//! Links to the board
//!
//! Requests go out one line at a time and replies come back as a byte
//! stream that [`crate::ArduDisc`] splits into lines. The board sits on a
//! USB serial port, or behind a TCP bridge such as `ardudisc serve --listen`.
//! Both are plain byte streams, so one [`StreamTransport`] carries either.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{HostError, Result};

/// Terminator the firmware splits requests on
pub const REQUEST_TERMINATOR: &[u8] = b"\n";

/// Baud rate of the board firmware
pub const DEFAULT_BAUD: u32 = 115_200;

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 256;

/// A link carrying the board's line protocol
pub trait Transport {
    /// Send one request; trailing whitespace is replaced by the terminator
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Append whatever arrives within `wait` to `rx`
    ///
    /// Returns the number of bytes appended, 0 if nothing came.
    fn receive(&mut self, rx: &mut Vec<u8>, wait: Duration) -> Result<usize>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_line(&mut self, line: &str) -> Result<()> {
        (**self).send_line(line)
    }

    fn receive(&mut self, rx: &mut Vec<u8>, wait: Duration) -> Result<usize> {
        (**self).receive(rx, wait)
    }
}

/// Streams whose reads can be bounded in time
pub trait ReadWait {
    /// Make the next reads give up after `wait`
    fn set_read_wait(&mut self, wait: Duration) -> io::Result<()>;
}

impl ReadWait for Box<dyn SerialPort> {
    fn set_read_wait(&mut self, wait: Duration) -> io::Result<()> {
        self.set_timeout(wait).map_err(io::Error::from)
    }
}

impl ReadWait for TcpStream {
    fn set_read_wait(&mut self, wait: Duration) -> io::Result<()> {
        // The socket API treats a zero timeout as an error
        self.set_read_timeout(Some(wait.max(Duration::from_millis(1))))
    }
}

/// The line protocol over any byte stream
pub struct StreamTransport<S> {
    stream: S,
    wait: Option<Duration>,
}

/// The board on a serial port
pub type SerialTransport = StreamTransport<Box<dyn SerialPort>>;

/// The board behind a TCP bridge
pub type TcpTransport = StreamTransport<TcpStream>;

impl<S: Read + Write + ReadWait> StreamTransport<S> {
    /// Wrap an already open stream
    pub fn new(stream: S) -> Self {
        Self { stream, wait: None }
    }
}

impl SerialTransport {
    /// Open a serial port, 8N1 without flow control
    ///
    /// Opening the port toggles DTR, which resets the board; the welcome
    /// line follows once the bootloader has finished.
    pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
        let baud = baud.unwrap_or(DEFAULT_BAUD);
        let port = serialport::new(device, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()?;
        log::info!("Opened {} at {} baud", device, baud);
        Ok(Self::new(port))
    }
}

impl TcpTransport {
    /// Connect to a bridge at `host:port`
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&addr)
            .and_then(|stream| {
                stream.set_nodelay(true)?;
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                Ok(stream)
            })
            .map_err(|e| HostError::ConnectionFailed(format!("{}: {}", addr, e)))?;
        log::info!("Connected to {}", addr);
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write + ReadWait> Transport for StreamTransport<S> {
    fn send_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end();
        let mut frame = Vec::with_capacity(line.len() + REQUEST_TERMINATOR.len());
        frame.extend_from_slice(line.as_bytes());
        frame.extend_from_slice(REQUEST_TERMINATOR);
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        Ok(())
    }

    fn receive(&mut self, rx: &mut Vec<u8>, wait: Duration) -> Result<usize> {
        if self.wait != Some(wait) {
            self.stream.set_read_wait(wait)?;
            self.wait = Some(wait);
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.stream.read(&mut chunk) {
            Ok(0) => Err(HostError::Closed),
            Ok(n) => {
                rx.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }
}
