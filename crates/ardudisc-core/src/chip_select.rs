//! Chip-select multiplexer
//!
//! The board has eight SPI peripherals sharing one bus, each with its own
//! active-low select line. The logical index of each line is part of the
//! host protocol: host software addresses DACs by index, so the order of
//! [`CS_PINS`] and [`DacSelect`] must never change.

use crate::hw::{Level, SelectLine};

/// Number of chip-select lines on the board
pub const CS_COUNT: usize = 8;

/// Physical pin numbers of the select lines, in logical index order
pub const CS_PINS: [u8; CS_COUNT] = [2, 3, 4, 5, 6, 7, 8, 10];

/// The peripheral behind each chip-select index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DacSelect {
    /// Logic timing, current DAC
    LogicTimingI = 0,
    /// Pulse width, current DAC
    PulseI = 1,
    /// Delay, current DAC
    DelayI = 2,
    /// Channel hysteresis DAC
    ChannelHysteresis = 3,
    /// Channel threshold DAC
    ChannelThreshold = 4,
    /// Logic timing, threshold DAC
    LogicTimingTh = 5,
    /// Pulse width, threshold DAC
    PulseTh = 6,
    /// Delay, threshold DAC
    DelayTh = 7,
}

impl DacSelect {
    /// All selects in index order
    pub const ALL: [DacSelect; CS_COUNT] = [
        DacSelect::LogicTimingI,
        DacSelect::PulseI,
        DacSelect::DelayI,
        DacSelect::ChannelHysteresis,
        DacSelect::ChannelThreshold,
        DacSelect::LogicTimingTh,
        DacSelect::PulseTh,
        DacSelect::DelayTh,
    ];

    /// Look up a select by its logical index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Logical chip-select index
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Physical pin driving this select
    pub const fn pin(self) -> u8 {
        CS_PINS[self as usize]
    }

    /// Resolution of the DAC fitted at this position
    ///
    /// The threshold DAC is an MCP48FVB24 (12 bit), all others are
    /// MCP48FVB14 (10 bit).
    pub const fn dac_resolution(self) -> u8 {
        match self {
            DacSelect::ChannelThreshold => 12,
            _ => 10,
        }
    }

    /// Short human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            DacSelect::LogicTimingI => "logic-timing-i",
            DacSelect::PulseI => "pulse-i",
            DacSelect::DelayI => "delay-i",
            DacSelect::ChannelHysteresis => "channel-hysteresis",
            DacSelect::ChannelThreshold => "channel-threshold",
            DacSelect::LogicTimingTh => "logic-timing-th",
            DacSelect::PulseTh => "pulse-th",
            DacSelect::DelayTh => "delay-th",
        }
    }

    /// Parse a name as produced by [`DacSelect::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|sel| sel.name().eq_ignore_ascii_case(name))
    }
}

/// Drives the eight select lines, asserting at most one at a time
pub struct ChipSelectMux<L> {
    lines: [L; CS_COUNT],
}

impl<L: SelectLine> ChipSelectMux<L> {
    /// Take ownership of the lines (in logical index order) and drive them
    /// all to the idle level
    pub fn new(lines: [L; CS_COUNT]) -> Self {
        let mut mux = Self { lines };
        mux.deselect_all();
        mux
    }

    /// Map a requested index onto a real line
    ///
    /// Out-of-range indices are logged and fall back to line 0. The
    /// transaction still goes ahead.
    pub fn resolve(&self, index: u8) -> usize {
        if (index as usize) < CS_COUNT {
            index as usize
        } else {
            log::error!("Invalid CS Index: {}", index);
            0
        }
    }

    /// Assert or release the select line at `index`
    pub fn select(&mut self, index: u8, asserted: bool) {
        let line = self.resolve(index);
        self.drive(line, asserted);
    }

    /// Return every line to the idle (high) level
    pub fn deselect_all(&mut self) {
        for line in self.lines.iter_mut() {
            line.set_level(Level::High);
        }
    }

    /// Drive an already resolved line
    pub(crate) fn drive(&mut self, line: usize, asserted: bool) {
        self.lines[line].set_level(Level::asserted(asserted));
    }

    /// Access a line by resolved position
    pub fn line(&self, index: usize) -> Option<&L> {
        self.lines.get(index)
    }

    /// Give the lines back
    pub fn into_lines(self) -> [L; CS_COUNT] {
        self.lines
    }
}
