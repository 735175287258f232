//! In-memory serial link between a host and the emulated firmware

use std::collections::VecDeque;

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

/// Firmware side of a serial port
///
/// Bytes pushed with [`SimSerial::push_input`] are what the firmware reads;
/// what it writes is collected until [`SimSerial::take_output`].
#[derive(Debug, Default)]
pub struct SimSerial {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl SimSerial {
    /// Empty link
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the firmware to read
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Bytes queued but not yet read by the firmware
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Drain everything the firmware has written
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Drain the firmware output as text, lossily
    pub fn take_output_string(&mut self) -> String {
        String::from_utf8_lossy(&self.take_output()).into_owned()
    }
}

impl ErrorType for SimSerial {
    type Error = ErrorKind;
}

impl Read for SimSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.input.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl ReadReady for SimSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.input.is_empty())
    }
}

impl Write for SimSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
