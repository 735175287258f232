//! Hardware abstraction traits
//!
//! The firmware core drives three kinds of hardware: the chip-select output
//! lines, a byte-oriented SPI controller and the timer that generates the
//! test pulse. Board support code (or the simulator) implements these traits;
//! everything above them is hardware independent.
//!
//! None of these operations can fail. SPI has no acknowledge phase in this
//! protocol, so a garbled transfer simply returns garbage bytes.

use crate::pulser::PulserConfig;
use crate::spi::SpiSettings;

/// Logic level of a digital output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Driven low (chip select asserted)
    Low,
    /// Driven high (chip select idle)
    High,
}

impl Level {
    /// Level that asserts an active-low chip select
    pub const fn asserted(active: bool) -> Self {
        if active {
            Level::Low
        } else {
            Level::High
        }
    }
}

/// A single chip-select output
pub trait SelectLine {
    /// Drive the line to `level`
    fn set_level(&mut self, level: Level);
}

/// SPI controller used by the transaction engine
///
/// The engine brackets every transfer with `begin_transaction` /
/// `end_transaction`, mirroring how a shared bus is claimed and released on
/// the microcontroller.
pub trait SpiBus {
    /// One-time controller setup at startup
    fn init(&mut self) {}

    /// Claim the bus and apply clock rate, bit order and mode
    fn begin_transaction(&mut self, settings: &SpiSettings);

    /// Full-duplex transfer of a single byte
    fn transfer(&mut self, byte: u8) -> u8;

    /// Full-duplex transfer of a 16-bit word
    ///
    /// The default implementation sends the high byte first, which is what a
    /// most-significant-bit-first bus expects. Controllers configured for
    /// LSB-first transfers override this.
    fn transfer16(&mut self, word: u16) -> u16 {
        let [hi, lo] = word.to_be_bytes();
        let hi = self.transfer(hi);
        let lo = self.transfer(lo);
        u16::from_be_bytes([hi, lo])
    }

    /// Release the bus
    fn end_transaction(&mut self);
}

/// Free-running PWM timer feeding the test pulser output
pub trait PulseTimer {
    /// Configure period and duty cycle without starting the output
    fn init(&mut self, config: &PulserConfig);

    /// Start toggling the output
    fn start(&mut self);

    /// Stop toggling, leaving the output at its last level
    fn stop(&mut self);
}
