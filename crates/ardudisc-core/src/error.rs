//! Error types for ardudisc-core
//!
//! Command handling itself never fails: malformed or unknown input is
//! dropped and out-of-range values are coerced. The only errors are a broken
//! byte stream and mistakes in the static command table.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Stream errors
    /// Reading from or writing to the command stream failed
    Io(embedded_io::ErrorKind),

    // Registry errors
    /// The command registry has no room for another pattern
    RegistryFull,
    /// A pattern with the same segments is already registered
    DuplicatePattern,
    /// Pattern has more segments than the matcher supports
    PatternTooDeep,
    /// Pattern contains no segments or an empty segment
    EmptyPattern,

    // Identity errors
    /// An identification field does not fit its fixed-size buffer
    FieldTooLong,
    /// An identification field contains a comma
    InvalidField,

    // Response errors
    /// A response line does not fit the response buffer
    ResponseTooLong,
}

impl Error {
    /// Convert any `embedded-io` error into a core error
    pub fn io<E: embedded_io::Error>(err: E) -> Self {
        Self::Io(err.kind())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "stream I/O error: {:?}", kind),
            Self::RegistryFull => write!(f, "command registry is full"),
            Self::DuplicatePattern => write!(f, "command pattern registered twice"),
            Self::PatternTooDeep => write!(f, "command pattern has too many segments"),
            Self::EmptyPattern => write!(f, "command pattern is empty"),
            Self::FieldTooLong => write!(f, "identification field too long"),
            Self::InvalidField => write!(f, "identification field contains a comma"),
            Self::ResponseTooLong => write!(f, "response line too long"),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
