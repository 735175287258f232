//! Bounded accumulation of input bytes into lines

use heapless::Vec;

/// Default line capacity in bytes, excluding the terminator
pub const DEFAULT_LINE_CAPACITY: usize = 64;

/// Line terminator for requests
const TERMINATOR: u8 = b'\n';

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Byte stored (or ignored), no complete line yet
    Pending,
    /// A terminator arrived; the line is ready in the buffer
    Complete,
    /// A terminator arrived after an overlong line, which was thrown away
    Discarded,
}

/// Fixed-capacity line buffer
///
/// When a line outgrows the buffer, everything up to and including the next
/// terminator is dropped and accumulation starts over.
#[derive(Debug, Default)]
pub struct LineBuffer<const N: usize = DEFAULT_LINE_CAPACITY> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte from the stream
    pub fn push(&mut self, byte: u8) -> Feed {
        match byte {
            TERMINATOR if self.overflowed => {
                self.overflowed = false;
                self.buf.clear();
                Feed::Discarded
            }
            TERMINATOR => Feed::Complete,
            b'\r' => Feed::Pending,
            _ if self.overflowed => Feed::Pending,
            _ => {
                if self.buf.push(byte).is_err() {
                    log::warn!("scpi: input line exceeds {} bytes, discarding", N);
                    self.overflowed = true;
                    self.buf.clear();
                }
                Feed::Pending
            }
        }
    }

    /// Take the completed line out of the buffer, leaving it empty
    pub fn take(&mut self) -> Vec<u8, N> {
        core::mem::take(&mut self.buf)
    }

    /// Bytes accumulated so far
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Whether the current line is being discarded
    pub fn is_discarding(&self) -> bool {
        self.overflowed
    }
}
