//! Bit-banged SPI bus
//!
//! For boards (or test rigs) without a hardware SPI block, [`BitbangSpi`]
//! implements [`SpiBus`] on top of three GPIOs and a delay. Chip select is
//! not part of this: the transaction engine drives select lines itself.
//!
//! All four clock modes and both bit orders are supported, so the same
//! implementation can talk to other parts than the board's MCP48 DACs.

use super::{BitOrder, SpiSettings, TRANSACTION_SETTINGS};
use crate::hw::SpiBus;

/// Trait for the low-level pin operations needed to bitbang SPI
pub trait BitbangPins {
    /// Set clock line value
    fn set_sck(&mut self, high: bool);

    /// Set MOSI line value
    fn set_mosi(&mut self, high: bool);

    /// Get MISO line value
    fn get_miso(&mut self) -> bool;

    /// Busy-wait for the given number of nanoseconds
    fn delay_ns(&mut self, ns: u32);

    /// Optional: Set SCK and MOSI atomically (optimization)
    ///
    /// Default implementation calls `set_sck` then `set_mosi`.
    fn set_sck_set_mosi(&mut self, sck: bool, mosi: bool) {
        self.set_sck(sck);
        self.set_mosi(mosi);
    }

    /// Optional: Set SCK and get MISO atomically (optimization)
    ///
    /// Default implementation calls `set_sck` then `get_miso`.
    fn set_sck_get_miso(&mut self, sck: bool) -> bool {
        self.set_sck(sck);
        self.get_miso()
    }
}

/// Software SPI controller
pub struct BitbangSpi<P> {
    pins: P,
    settings: SpiSettings,
    half_period_ns: u32,
}

impl<P: BitbangPins> BitbangSpi<P> {
    /// Wrap a set of pins using the DAC transaction settings
    pub fn new(pins: P) -> Self {
        Self::with_settings(pins, TRANSACTION_SETTINGS)
    }

    /// Wrap a set of pins and park SCK at the idle level of `settings`
    pub fn with_settings(pins: P, settings: SpiSettings) -> Self {
        let mut spi = Self {
            pins,
            settings,
            half_period_ns: 0,
        };
        spi.apply(&settings);
        spi
    }

    /// Currently applied settings
    pub fn settings(&self) -> &SpiSettings {
        &self.settings
    }

    /// Half of one SCK period in nanoseconds
    pub fn half_period_ns(&self) -> u32 {
        self.half_period_ns
    }

    /// Give the pins back
    pub fn release(self) -> P {
        self.pins
    }

    fn apply(&mut self, settings: &SpiSettings) {
        self.settings = *settings;
        // half_period = 1 / (2 * frequency) in seconds
        self.half_period_ns = 500_000_000 / settings.clock_hz.max(1);
        self.pins.set_sck(settings.mode.cpol());
    }

    /// Shift one bit out and one bit in
    fn clock_bit(&mut self, out: bool) -> bool {
        let idle = self.settings.mode.cpol();
        let half = self.half_period_ns;
        if self.settings.mode.cpha() {
            // Data changes on the leading edge, sampled on the trailing one
            self.pins.set_sck_set_mosi(!idle, out);
            self.pins.delay_ns(half);
            let bit = self.pins.set_sck_get_miso(idle);
            self.pins.delay_ns(half);
            bit
        } else {
            self.pins.set_mosi(out);
            self.pins.delay_ns(half);
            let bit = self.pins.set_sck_get_miso(!idle);
            self.pins.delay_ns(half);
            self.pins.set_sck(idle);
            bit
        }
    }
}

impl<P: BitbangPins> SpiBus for BitbangSpi<P> {
    fn init(&mut self) {
        self.pins.set_mosi(false);
        self.pins.set_sck(self.settings.mode.cpol());
    }

    fn begin_transaction(&mut self, settings: &SpiSettings) {
        self.apply(settings);
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        let mut read = 0u8;
        for i in 0..8 {
            let shift = match self.settings.bit_order {
                BitOrder::MsbFirst => 7 - i,
                BitOrder::LsbFirst => i,
            };
            if self.clock_bit((byte >> shift) & 1 != 0) {
                read |= 1 << shift;
            }
        }
        read
    }

    fn transfer16(&mut self, word: u16) -> u16 {
        match self.settings.bit_order {
            BitOrder::MsbFirst => {
                let [hi, lo] = word.to_be_bytes();
                let hi = self.transfer(hi);
                let lo = self.transfer(lo);
                u16::from_be_bytes([hi, lo])
            }
            BitOrder::LsbFirst => {
                let [lo, hi] = word.to_le_bytes();
                let lo = self.transfer(lo);
                let hi = self.transfer(hi);
                u16::from_le_bytes([lo, hi])
            }
        }
    }

    fn end_transaction(&mut self) {
        self.pins.set_sck(self.settings.mode.cpol());
    }
}
