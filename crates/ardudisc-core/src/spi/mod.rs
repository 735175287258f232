//! SPI types and the 24-bit transaction engine
//!
//! Every peripheral on the board speaks the same frame: an 8-bit command
//! byte followed by a 16-bit payload, clocked at 1 MHz in mode 0 with the
//! most significant bit first.

pub mod bitbang;
mod engine;

pub use bitbang::{BitbangPins, BitbangSpi};
pub use engine::SpiEngine;

/// Bit order on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// SPI clock mode (CPOL/CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpiMode {
    /// Clock idle low, sample on rising edge
    Mode0,
    /// Clock idle low, sample on falling edge
    Mode1,
    /// Clock idle high, sample on falling edge
    Mode2,
    /// Clock idle high, sample on rising edge
    Mode3,
}

impl SpiMode {
    /// Clock polarity: level of SCK while idle
    pub const fn cpol(self) -> bool {
        matches!(self, SpiMode::Mode2 | SpiMode::Mode3)
    }

    /// Clock phase: data sampled on the second edge of each bit
    pub const fn cpha(self) -> bool {
        matches!(self, SpiMode::Mode1 | SpiMode::Mode3)
    }

    /// Whether MISO is sampled on a rising SCK edge
    pub const fn samples_on_rising_edge(self) -> bool {
        self.cpol() == self.cpha()
    }
}

/// Settings applied when a transaction claims the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpiSettings {
    /// SCK frequency in Hz
    pub clock_hz: u32,
    /// Bit order on the wire
    pub bit_order: BitOrder,
    /// Clock polarity and phase
    pub mode: SpiMode,
}

/// Settings used for every DAC transaction
pub const TRANSACTION_SETTINGS: SpiSettings = SpiSettings {
    clock_hz: 1_000_000,
    bit_order: BitOrder::MsbFirst,
    mode: SpiMode::Mode0,
};

/// Bytes read back during one 24-bit transaction
///
/// Neither field is interpreted: they are whatever the peripheral drove on
/// MISO during the command and payload phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpiResponse {
    /// Read back while the command byte was sent
    pub echo: u8,
    /// Read back while the payload was sent
    pub data: u16,
}

impl SpiResponse {
    /// Echo byte and data word packed as `(echo << 16) | data`
    pub const fn combined(self) -> u32 {
        ((self.echo as u32) << 16) | self.data as u32
    }

    /// Split a packed 24-bit value back into its parts
    pub const fn from_combined(value: u32) -> Self {
        Self {
            echo: (value >> 16) as u8,
            data: value as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_packing() {
        let resp = SpiResponse {
            echo: 0x10,
            data: 1000,
        };
        assert_eq!(resp.combined(), (0x10 << 16) | 1000);
        assert_eq!(SpiResponse::from_combined(resp.combined()), resp);
        assert_eq!(SpiResponse::from_combined(0x01FF_FFFF).echo, 0xFF);
    }

    #[test]
    fn test_mode_bits() {
        assert!(!SpiMode::Mode0.cpol() && !SpiMode::Mode0.cpha());
        assert!(!SpiMode::Mode1.cpol() && SpiMode::Mode1.cpha());
        assert!(SpiMode::Mode2.cpol() && !SpiMode::Mode2.cpha());
        assert!(SpiMode::Mode3.cpol() && SpiMode::Mode3.cpha());
        assert!(SpiMode::Mode0.samples_on_rising_edge());
        assert!(!SpiMode::Mode2.samples_on_rising_edge());
    }
}
