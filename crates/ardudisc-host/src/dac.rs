//! Driver for the Microchip MCP48FxBx4 quad DACs on the board
//!
//! Every frame is one 24-bit SPI transaction: a command byte
//! (`register << 3 | command << 1`) followed by a 16-bit data word. Bit 0
//! of the first byte clocked back is the device's command-valid flag.

use crate::device::ArduDisc;
use crate::error::{HostError, Result};
use crate::protocol::SpiReply;
use crate::transport::Transport;

/// Volatile DAC register of each channel (already shifted into place)
pub const REG_CHANNEL: [u8; 4] = [0x00, 0x08, 0x10, 0x18];
/// Voltage reference register
pub const REG_VREF: u8 = 0x40;
/// Power-down register
pub const REG_POWER_DOWN: u8 = 0x48;
/// Gain and status register
pub const REG_GAIN_STATUS: u8 = 0x50;
/// Write command bits
pub const CMD_WRITE: u8 = 0x00;
/// Read command bits
pub const CMD_READ: u8 = 0x06;

/// Channels per device
pub const CHANNELS: usize = 4;

/// Something that can run a 24-bit SPI transaction on a chip select
pub trait SpiIo {
    /// Send `command` and `payload` to the peripheral on `cs_index`
    fn transfer24(&mut self, cs_index: u8, command: u8, payload: u16) -> Result<SpiReply>;
}

impl<T: Transport> SpiIo for ArduDisc<T> {
    fn transfer24(&mut self, cs_index: u8, command: u8, payload: u16) -> Result<SpiReply> {
        self.spi_send(cs_index, command, payload)
    }
}

/// Reference voltage selection, two bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VrefOption {
    /// Supply voltage
    Vdd = 0b00,
    /// Internal 1.22 V band gap
    Internal1V22 = 0b01,
    /// External reference, unbuffered
    ExtUnbuffered = 0b10,
    /// External reference, buffered
    ExtBuffered = 0b11,
}

/// Which part is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DacModel {
    /// 10-bit MCP48FVB14
    Mcp48Fvb14,
    /// 12-bit MCP48FVB24
    Mcp48Fvb24,
}

impl DacModel {
    /// Resolution in bits
    pub const fn resolution(self) -> u8 {
        match self {
            DacModel::Mcp48Fvb14 => 10,
            DacModel::Mcp48Fvb24 => 12,
        }
    }

    /// Part for a given resolution
    pub fn from_resolution(bits: u8) -> Option<Self> {
        match bits {
            10 => Some(DacModel::Mcp48Fvb14),
            12 => Some(DacModel::Mcp48Fvb24),
            _ => None,
        }
    }

    /// Largest code the DAC accepts
    pub const fn max_value(self) -> u16 {
        (1 << self.resolution()) - 1
    }
}

/// One DAC on a chip select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mcp48Dac {
    model: DacModel,
    cs_index: u8,
    verify: bool,
}

impl Mcp48Dac {
    /// DAC of `model` on chip select `cs_index`
    pub fn new(model: DacModel, cs_index: u8) -> Self {
        Self {
            model,
            cs_index,
            verify: true,
        }
    }

    /// Skip the command-valid check, for a bus with no DAC answering
    /// (e.g. probing with a logic analyzer)
    pub fn without_verify(mut self) -> Self {
        self.verify = false;
        self
    }

    /// Fitted part
    pub fn model(&self) -> DacModel {
        self.model
    }

    /// Chip-select index
    pub fn cs_index(&self) -> u8 {
        self.cs_index
    }

    /// Set the reference of each channel
    pub fn set_refs<S: SpiIo>(&self, spi: &mut S, refs: [VrefOption; CHANNELS]) -> Result<()> {
        let word = refs
            .iter()
            .enumerate()
            .fold(0u16, |word, (i, r)| word | (*r as u16) << (i * 2));
        self.write(spi, CMD_WRITE | REG_VREF, word)
    }

    /// Same reference for every channel
    pub fn set_all_refs_same<S: SpiIo>(&self, spi: &mut S, vref: VrefOption) -> Result<()> {
        self.set_refs(spi, [vref; CHANNELS])
    }

    /// Set the output code of one channel
    pub fn set_channel<S: SpiIo>(&self, spi: &mut S, channel: usize, value: u16) -> Result<()> {
        let register = self.channel_register(channel)?;
        if value > self.model.max_value() {
            return Err(HostError::InvalidParameter(format!(
                "DAC value {} out of range 0..={}",
                value,
                self.model.max_value()
            )));
        }
        self.write(spi, CMD_WRITE | register, value)
    }

    /// Read back the output code of one channel
    pub fn read_channel<S: SpiIo>(&self, spi: &mut S, channel: usize) -> Result<u16> {
        let register = self.channel_register(channel)?;
        let reply = self.transfer(spi, CMD_READ | register, 0)?;
        Ok(reply.response().data & self.model.max_value())
    }

    fn channel_register(&self, channel: usize) -> Result<u8> {
        REG_CHANNEL
            .get(channel)
            .copied()
            .ok_or_else(|| HostError::InvalidParameter(format!("Invalid channel {}", channel)))
    }

    fn write<S: SpiIo>(&self, spi: &mut S, command: u8, word: u16) -> Result<()> {
        self.transfer(spi, command, word).map(|_| ())
    }

    fn transfer<S: SpiIo>(&self, spi: &mut S, command: u8, word: u16) -> Result<SpiReply> {
        let reply = spi.transfer24(self.cs_index, command, word)?;
        if self.verify && reply.response().echo & 0x01 == 0 {
            return Err(HostError::DacRejected {
                cs: self.cs_index,
                command,
            });
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records frames and answers each with a fixed echo byte
    struct RecordingSpi {
        frames: Vec<(u8, u8, u16)>,
        echo: u8,
    }

    impl RecordingSpi {
        fn new() -> Self {
            Self {
                frames: Vec::new(),
                echo: 0xFF,
            }
        }
    }

    impl SpiIo for RecordingSpi {
        fn transfer24(&mut self, cs_index: u8, command: u8, payload: u16) -> Result<SpiReply> {
            self.frames.push((cs_index, command, payload));
            Ok(SpiReply {
                cs_index,
                command,
                payload,
                result: (u32::from(self.echo) << 16) | 0xFFFF,
            })
        }
    }

    #[test]
    fn test_models() {
        assert_eq!(DacModel::Mcp48Fvb14.resolution(), 10);
        assert_eq!(DacModel::Mcp48Fvb24.resolution(), 12);
        assert_eq!(DacModel::Mcp48Fvb14.max_value(), 1023);
        assert_eq!(DacModel::Mcp48Fvb24.max_value(), 4095);
        assert_eq!(DacModel::from_resolution(12), Some(DacModel::Mcp48Fvb24));
        assert_eq!(DacModel::from_resolution(8), None);
    }

    #[test]
    fn test_set_all_refs_same() {
        let mut spi = RecordingSpi::new();
        let dac = Mcp48Dac::new(DacModel::Mcp48Fvb14, 3);
        dac.set_all_refs_same(&mut spi, VrefOption::ExtBuffered).unwrap();
        assert_eq!(spi.frames, [(3, 0b0100_0000, 0xFF)]);
    }

    #[test]
    fn test_set_refs_packs_two_bits_per_channel() {
        let mut spi = RecordingSpi::new();
        let dac = Mcp48Dac::new(DacModel::Mcp48Fvb14, 0);
        dac.set_refs(
            &mut spi,
            [
                VrefOption::Vdd,
                VrefOption::Internal1V22,
                VrefOption::ExtUnbuffered,
                VrefOption::ExtBuffered,
            ],
        )
        .unwrap();
        assert_eq!(spi.frames[0].2, 0b11_10_01_00);
    }

    #[test]
    fn test_set_channel_encoding() {
        for model in [DacModel::Mcp48Fvb14, DacModel::Mcp48Fvb24] {
            let mut spi = RecordingSpi::new();
            let dac = Mcp48Dac::new(model, 4);
            for channel in 0..CHANNELS {
                dac.set_channel(&mut spi, channel, model.max_value()).unwrap();
            }
            let commands: Vec<u8> = spi.frames.iter().map(|f| f.1).collect();
            assert_eq!(commands, [0x00, 0x08, 0x10, 0x18]);
            assert!(spi.frames.iter().all(|f| f.2 == model.max_value()));
        }
    }

    #[test]
    fn test_set_channel_validates() {
        let mut spi = RecordingSpi::new();
        let dac = Mcp48Dac::new(DacModel::Mcp48Fvb14, 0);
        assert!(matches!(
            dac.set_channel(&mut spi, 4, 0),
            Err(HostError::InvalidParameter(_))
        ));
        assert!(matches!(
            dac.set_channel(&mut spi, 0, 1024),
            Err(HostError::InvalidParameter(_))
        ));
        assert!(spi.frames.is_empty());
    }

    #[test]
    fn test_command_error_flag() {
        let mut spi = RecordingSpi::new();
        spi.echo = 0xFE;
        let dac = Mcp48Dac::new(DacModel::Mcp48Fvb14, 6);
        assert!(matches!(
            dac.set_channel(&mut spi, 1, 5),
            Err(HostError::DacRejected { cs: 6, command: 0x08 })
        ));
        dac.without_verify().set_channel(&mut spi, 1, 5).unwrap();
    }
}
