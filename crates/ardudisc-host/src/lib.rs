//! ardudisc-host - Host-side access to ELB_ARDU_DISC4 boards
//!
//! This crate talks to the board firmware over its line protocol: it opens
//! a serial port (or a TCP bridge), checks the welcome line, and runs SPI
//! transactions and pulser commands. On top of that sit the MCP48FxBx4 DAC
//! driver and the board-level helpers that turn thresholds and timings into
//! DAC writes.
//!
//! # Supported Transports
//!
//! - Serial port: `dev=/dev/ttyACM0`, `dev=COM4:115200`
//! - TCP socket: `ip=host:port`
//!
//! # Example
//!
//! ```no_run
//! use ardudisc_host::{open, Board};
//!
//! let device = open("dev=/dev/ttyACM0")?;
//! let mut board = Board::new(device)?;
//! for channel in 0..4 {
//!     board.set_threshold_volts(channel, 1.0)?;
//! }
//! board.set_pulser(true)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod board;
pub mod dac;
pub mod device;
pub mod error;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-exports
pub use board::Board;
pub use dac::{DacModel, Mcp48Dac, SpiIo, VrefOption};
pub use device::ArduDisc;
pub use error::{HostError, Result};
pub use protocol::SpiReply;
pub use transport::{SerialTransport, StreamTransport, TcpTransport, Transport};

/// Where the board is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyACM0" or "COM4")
        device: String,
        /// Baud rate (None for the firmware default)
        baud: Option<u32>,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl Connection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyACM0` - Serial with default baud
    /// - `dev=/dev/ttyACM0:115200` - Serial with specified baud
    /// - `ip=host:port` - TCP connection
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(dev) = s.strip_prefix("dev=") {
            // A trailing `:<digits>` is the baud rate; anything else is part
            // of the path
            match dev.rsplit_once(':') {
                Some((device, baud_str))
                    if !baud_str.is_empty() && baud_str.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    let baud = baud_str
                        .parse()
                        .map_err(|_| format!("Invalid baud rate: {}", baud_str))?;
                    Ok(Connection::Serial {
                        device: device.to_string(),
                        baud: Some(baud),
                    })
                }
                _ => Ok(Connection::Serial {
                    device: dev.to_string(),
                    baud: None,
                }),
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip
                .rsplit_once(':')
                .ok_or_else(|| "Missing port in ip= parameter".to_string())?;
            let port = port_str
                .parse()
                .map_err(|_| format!("Invalid port: {}", port_str))?;
            Ok(Connection::Tcp {
                host: host.to_string(),
                port,
            })
        } else {
            Err(format!(
                "Invalid connection string: {}. Use dev=... or ip=...",
                s
            ))
        }
    }

    /// Open the transport
    pub fn open_transport(&self) -> Result<Box<dyn Transport>> {
        Ok(match self {
            Connection::Serial { device, baud } => {
                Box::new(SerialTransport::open(device, *baud)?)
            }
            Connection::Tcp { host, port } => Box::new(TcpTransport::connect(host, *port)?),
        })
    }
}

/// Connect to a board given a connection string
pub fn open(options: &str) -> Result<ArduDisc<Box<dyn Transport>>> {
    let conn = Connection::parse(options).map_err(HostError::InvalidParameter)?;
    ArduDisc::new(conn.open_transport()?)
}
