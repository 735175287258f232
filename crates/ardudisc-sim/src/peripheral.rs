//! Emulated SPI peripherals
//!
//! A peripheral sees the bus one byte at a time while its select line is
//! low, exactly like the real part: `select`, then a run of `exchange`
//! calls, then `deselect`.

use ardudisc_core::chip_select::DacSelect;

/// A device hanging off one chip-select line
pub trait Peripheral {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Select line went low
    fn select(&mut self) {}

    /// Shift one byte in and return the byte shifted out
    fn exchange(&mut self, byte: u8) -> u8;

    /// Select line went high
    fn deselect(&mut self) {}

    /// Read an internal register, if the peripheral has any
    fn register(&self, _address: u8) -> Option<u16> {
        None
    }
}

/// Echoes every byte it receives in the same transfer
#[derive(Debug, Default)]
pub struct Loopback;

impl Peripheral for Loopback {
    fn name(&self) -> &str {
        "loopback"
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        byte
    }
}

/// Nothing populated: MISO floats high
#[derive(Debug, Default)]
pub struct Silent;

impl Peripheral for Silent {
    fn name(&self) -> &str {
        "silent"
    }

    fn exchange(&mut self, _byte: u8) -> u8 {
        0xFF
    }
}

/// Register addresses of the MCP48FxBx4
pub mod mcp48 {
    /// Volatile DAC registers, one per channel
    pub const DAC_CHANNELS: [u8; 4] = [0x00, 0x01, 0x02, 0x03];
    /// Voltage reference selection
    pub const VREF: u8 = 0x08;
    /// Power-down control
    pub const POWER_DOWN: u8 = 0x09;
    /// Gain and status
    pub const GAIN_STATUS: u8 = 0x0A;

    /// Write command bits
    pub const CMD_WRITE: u8 = 0b00;
    /// Read command bits
    pub const CMD_READ: u8 = 0b11;

    /// Split a command byte into register address and command bits
    pub const fn decode(byte: u8) -> (u8, u8) {
        (byte >> 3, (byte >> 1) & 0b11)
    }

    /// Build a command byte
    pub const fn encode(address: u8, command: u8) -> u8 {
        (address << 3) | (command << 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Command,
    High,
    Low,
    Done,
}

/// DAC resolutions the MCP48FxBx4 family comes in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacResolution {
    /// 10 bits, MCP48FVB14
    Bits10,
    /// 12 bits, MCP48FVB24
    Bits12,
}

impl DacResolution {
    /// The part fitted on `select` of the real board
    pub const fn for_select(select: DacSelect) -> Self {
        match select.dac_resolution() {
            12 => DacResolution::Bits12,
            _ => DacResolution::Bits10,
        }
    }

    /// Resolution in bits
    pub const fn bits(self) -> u8 {
        match self {
            DacResolution::Bits10 => 10,
            DacResolution::Bits12 => 12,
        }
    }

    /// Mask of the bits a channel register keeps
    pub const fn mask(self) -> u16 {
        (1u16 << self.bits()) - 1
    }

    const fn part_name(self) -> &'static str {
        match self {
            DacResolution::Bits10 => "mcp48fvb14",
            DacResolution::Bits12 => "mcp48fvb24",
        }
    }
}

/// Register model of a Microchip MCP48FxBx4 quad DAC
///
/// Only the parts the board uses are modelled: the 24-bit frame (command
/// byte then 16-bit data word), writes and reads of the volatile
/// registers, and the command-error flag in bit 0 of the first byte
/// returned (1 when the command was valid).
#[derive(Debug)]
pub struct Mcp48Dac {
    resolution: DacResolution,
    registers: [u16; 16],
    phase: Phase,
    address: u8,
    command: u8,
    valid: bool,
    high: u8,
    writes: usize,
}

impl Mcp48Dac {
    /// New DAC of the given resolution
    pub fn new(resolution: DacResolution) -> Self {
        Self {
            resolution,
            registers: [0; 16],
            phase: Phase::Done,
            address: 0,
            command: 0,
            valid: false,
            high: 0,
            writes: 0,
        }
    }

    /// DAC resolution
    pub fn resolution(&self) -> DacResolution {
        self.resolution
    }

    /// Number of completed register writes
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn is_valid(address: u8, command: u8) -> bool {
        let known = mcp48::DAC_CHANNELS.contains(&address)
            || matches!(address, mcp48::VREF | mcp48::POWER_DOWN | mcp48::GAIN_STATUS);
        known && matches!(command, mcp48::CMD_WRITE | mcp48::CMD_READ)
    }

    fn store(&mut self, value: u16) {
        let value = if mcp48::DAC_CHANNELS.contains(&self.address) {
            value & self.resolution.mask()
        } else {
            value
        };
        log::trace!(
            "mcp48: register {:#04x} <- {:#06x}",
            self.address,
            value
        );
        self.registers[self.address as usize] = value;
        self.writes += 1;
    }
}

impl Peripheral for Mcp48Dac {
    fn name(&self) -> &str {
        self.resolution.part_name()
    }

    fn select(&mut self) {
        self.phase = Phase::Command;
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        match self.phase {
            Phase::Command => {
                let (address, command) = mcp48::decode(byte);
                self.address = address;
                self.command = command;
                self.valid = Self::is_valid(address, command);
                if !self.valid {
                    log::warn!("mcp48: invalid command byte {:#04x}", byte);
                }
                self.phase = Phase::High;
                if self.valid {
                    0xFF
                } else {
                    0xFE
                }
            }
            Phase::High => {
                self.high = byte;
                self.phase = Phase::Low;
                if self.valid && self.command == mcp48::CMD_READ {
                    (self.registers[self.address as usize] >> 8) as u8
                } else {
                    0xFF
                }
            }
            Phase::Low => {
                self.phase = Phase::Done;
                if !self.valid {
                    return 0xFF;
                }
                if self.command == mcp48::CMD_READ {
                    self.registers[self.address as usize] as u8
                } else {
                    self.store(u16::from_be_bytes([self.high, byte]));
                    0xFF
                }
            }
            // Extra clocks beyond the 24-bit frame are ignored
            Phase::Done => 0xFF,
        }
    }

    fn deselect(&mut self) {
        if self.phase != Phase::Done && self.phase != Phase::Command {
            log::debug!("mcp48: frame aborted after partial transfer");
        }
        self.phase = Phase::Done;
    }

    fn register(&self, address: u8) -> Option<u16> {
        self.registers.get(address as usize).copied()
    }
}
