//! Error types for host-side board access

use thiserror::Error;

/// Errors talking to an ELB_ARDU_DISC4 board
#[derive(Debug, Error)]
pub enum HostError {
    /// Failed to connect to the board
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The board closed the connection
    #[error("Connection closed by board")]
    Closed,

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    /// No matching reply within the timeout
    #[error("Timeout waiting for {0} reply")]
    Timeout(String),

    /// The welcome line does not identify a supported board
    #[error("Incompatible hardware, welcome message was: {0:?}")]
    Incompatible(String),

    /// A reply line could not be parsed
    #[error("Malformed reply: {0:?}")]
    MalformedReply(String),

    /// A DAC flagged the command byte as invalid
    #[error("DAC on chip select {cs} rejected command 0x{command:02X}")]
    DacRejected {
        /// Chip-select index of the DAC
        cs: u8,
        /// Command byte that was sent
        command: u8,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::IoError(e.to_string())
    }
}
