//! Board-level control: what each DAC channel means on the ELB_ARDU_DISC4
//!
//! Four discriminator channels each get a threshold (12-bit DAC), a
//! hysteresis, and delay / pulse-width settings split over a current DAC
//! and a threshold DAC. Two logic timing channels share the logic-timing
//! DACs: DAC channel `2n` is the delay and `2n + 1` the pulse width of
//! logic channel `n`.

use ardudisc_core::chip_select::{DacSelect, CS_COUNT};

use crate::dac::{DacModel, Mcp48Dac, VrefOption};
use crate::device::ArduDisc;
use crate::error::{HostError, Result};
use crate::transport::Transport;

/// Threshold at DAC code 0, before attenuation
pub const THRESHOLD_MIN_V: f64 = -2.5;
/// Threshold at full-scale DAC code, before attenuation
pub const THRESHOLD_MAX_V: f64 = 2.5;
/// Input attenuation in front of the comparators
pub const ATTENUATION: f64 = 0.72;
/// Number of logic timing channels
pub const LOGIC_CHANNELS: usize = 2;

/// Span of settable thresholds at the input, in volts
pub fn threshold_span_v() -> f64 {
    (THRESHOLD_MAX_V - THRESHOLD_MIN_V) / ATTENUATION
}

/// DAC code for an input threshold in volts
///
/// The span is centred on 0 V: the lowest allowed threshold maps to code 0
/// and the highest to full scale.
pub fn threshold_code(volts: f64, model: DacModel) -> Result<u16> {
    let span = threshold_span_v();
    let half = span / 2.0;
    if !(-half..=half).contains(&volts) {
        return Err(HostError::InvalidParameter(format!(
            "Invalid threshold: {} V. Allowed range: {:.3} V ... {:.3} V",
            volts, -half, half
        )));
    }

    let max = model.max_value();
    let code = ((volts + half) / span * f64::from(max)) as i64;
    Ok(code.clamp(0, i64::from(max)) as u16)
}

/// Driver for the DAC fitted on `select`
pub fn dac_for(select: DacSelect) -> Mcp48Dac {
    let model = DacModel::from_resolution(select.dac_resolution()).unwrap_or(DacModel::Mcp48Fvb14);
    Mcp48Dac::new(model, select.index())
}

/// An initialised board
pub struct Board<T: Transport> {
    device: ArduDisc<T>,
    dacs: [Mcp48Dac; CS_COUNT],
}

impl<T: Transport> Board<T> {
    /// Take over a connected board and point every DAC at the external
    /// buffered reference
    pub fn new(device: ArduDisc<T>) -> Result<Self> {
        Self::with_verify(device, true)
    }

    /// Like [`Board::new`], choosing whether DAC writes check the
    /// command-valid flag in the reply
    ///
    /// Boards with a logic analyser on the SPI lines instead of real DACs
    /// never set the flag, so they need `verify` off.
    pub fn with_verify(device: ArduDisc<T>, verify: bool) -> Result<Self> {
        let dacs = DacSelect::ALL.map(|select| {
            let dac = dac_for(select);
            if verify {
                dac
            } else {
                dac.without_verify()
            }
        });
        if !verify {
            log::warn!("DAC command verification disabled");
        }
        let mut board = Self { device, dacs };
        for dac in board.dacs {
            dac.set_all_refs_same(&mut board.device, VrefOption::ExtBuffered)?;
        }
        log::debug!("All DAC references set to external buffered");
        Ok(board)
    }

    /// Driver of one DAC
    pub fn dac(&self, select: DacSelect) -> &Mcp48Dac {
        &self.dacs[select.index() as usize]
    }

    /// Set one channel of one DAC to a raw code
    pub fn set_dac(&mut self, select: DacSelect, channel: usize, value: u16) -> Result<()> {
        let dac = self.dacs[select.index() as usize];
        log::debug!("{} channel {} <- {}", select.name(), channel, value);
        dac.set_channel(&mut self.device, channel, value)
    }

    /// Read back one channel of one DAC
    pub fn read_dac(&mut self, select: DacSelect, channel: usize) -> Result<u16> {
        let dac = self.dacs[select.index() as usize];
        dac.read_channel(&mut self.device, channel)
    }

    /// Channel threshold as a raw code
    pub fn set_threshold(&mut self, channel: usize, value: u16) -> Result<()> {
        self.set_dac(DacSelect::ChannelThreshold, channel, value)
    }

    /// Channel threshold in volts; returns the code written
    pub fn set_threshold_volts(&mut self, channel: usize, volts: f64) -> Result<u16> {
        let code = threshold_code(volts, self.dac(DacSelect::ChannelThreshold).model())?;
        self.set_threshold(channel, code)?;
        Ok(code)
    }

    /// Channel hysteresis as a raw code
    pub fn set_hysteresis(&mut self, channel: usize, value: u16) -> Result<()> {
        self.set_dac(DacSelect::ChannelHysteresis, channel, value)
    }

    /// Channel delay, current DAC
    pub fn set_channel_delay_current(&mut self, channel: usize, value: u16) -> Result<()> {
        self.set_dac(DacSelect::DelayI, channel, value)
    }

    /// Channel delay, threshold DAC
    pub fn set_channel_delay_threshold(&mut self, channel: usize, value: u16) -> Result<()> {
        self.set_dac(DacSelect::DelayTh, channel, value)
    }

    /// Channel pulse width, current DAC
    pub fn set_channel_pulse_width_current(&mut self, channel: usize, value: u16) -> Result<()> {
        self.set_dac(DacSelect::PulseI, channel, value)
    }

    /// Channel pulse width, threshold DAC
    pub fn set_channel_pulse_width_threshold(&mut self, channel: usize, value: u16) -> Result<()> {
        self.set_dac(DacSelect::PulseTh, channel, value)
    }

    /// Logic channel delay, current DAC
    pub fn set_logic_delay_current(&mut self, channel: usize, value: u16) -> Result<()> {
        let dac_channel = logic_dac_channel(channel)?;
        self.set_dac(DacSelect::LogicTimingI, dac_channel, value)
    }

    /// Logic channel delay, threshold DAC
    pub fn set_logic_delay_threshold(&mut self, channel: usize, value: u16) -> Result<()> {
        let dac_channel = logic_dac_channel(channel)?;
        self.set_dac(DacSelect::LogicTimingTh, dac_channel, value)
    }

    /// Logic channel pulse width, current DAC
    pub fn set_logic_pulse_width_current(&mut self, channel: usize, value: u16) -> Result<()> {
        let dac_channel = logic_dac_channel(channel)? + 1;
        self.set_dac(DacSelect::LogicTimingI, dac_channel, value)
    }

    /// Logic channel pulse width, threshold DAC
    pub fn set_logic_pulse_width_threshold(&mut self, channel: usize, value: u16) -> Result<()> {
        let dac_channel = logic_dac_channel(channel)? + 1;
        self.set_dac(DacSelect::LogicTimingTh, dac_channel, value)
    }

    /// Switch the test pulser
    pub fn set_pulser(&mut self, on: bool) -> Result<()> {
        self.device.set_pulser(on)
    }

    /// The underlying connection
    pub fn device_mut(&mut self) -> &mut ArduDisc<T> {
        &mut self.device
    }

    /// Give back the connection
    pub fn into_device(self) -> ArduDisc<T> {
        self.device
    }
}

/// Delay channel on a logic-timing DAC for logic channel `channel`
fn logic_dac_channel(channel: usize) -> Result<usize> {
    if channel >= LOGIC_CHANNELS {
        return Err(HostError::InvalidParameter(format!(
            "Invalid timing channel {}",
            channel
        )));
    }
    Ok(channel * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimLink;
    use ardudisc_sim::SimBoard;

    fn board() -> (Board<SimLink>, SimBoard) {
        let link = SimLink::boot(SimBoard::elb_ardu_disc4());
        let sim = link.board().clone();
        let board = Board::new(ArduDisc::new(link).unwrap()).unwrap();
        (board, sim)
    }

    #[test]
    fn test_verify_choice_on_board_without_dacs() {
        // Loopback echoes the command byte, whose valid flag is clear
        let device = ArduDisc::new(SimLink::boot(SimBoard::loopback())).unwrap();
        assert!(matches!(
            Board::with_verify(device, true),
            Err(HostError::DacRejected { cs: 0, command: 0x40 })
        ));

        let device = ArduDisc::new(SimLink::boot(SimBoard::loopback())).unwrap();
        let mut board = Board::with_verify(device, false).unwrap();
        board.set_threshold(2, 1234).unwrap();
    }

    #[test]
    fn test_threshold_codes() {
        let model = DacModel::Mcp48Fvb24;
        let half = threshold_span_v() / 2.0;
        assert_eq!(threshold_code(-half, model).unwrap(), 0);
        assert_eq!(threshold_code(half, model).unwrap(), 4095);
        assert_eq!(threshold_code(0.0, model).unwrap(), 2047);
        assert_eq!(threshold_code(1.0, model).unwrap(), 2637);
        assert!(threshold_code(3.5, model).is_err());
        assert!(threshold_code(-3.5, model).is_err());
        assert!(threshold_code(f64::NAN, model).is_err());
    }

    #[test]
    fn test_init_sets_external_buffered_refs() {
        let (_board, sim) = board();
        for index in 0..CS_COUNT {
            assert_eq!(sim.register(index, 0x08), Some(0x00FF), "select {}", index);
        }
    }

    #[test]
    fn test_threshold_volts_reaches_dac() {
        let (mut board, sim) = board();
        let code = board.set_threshold_volts(2, 1.0).unwrap();
        assert_eq!(code, 2637);
        assert_eq!(sim.register(DacSelect::ChannelThreshold.index() as usize, 2), Some(2637));
        assert_eq!(board.read_dac(DacSelect::ChannelThreshold, 2).unwrap(), 2637);
    }

    #[test]
    fn test_logic_timing_mapping() {
        let (mut board, sim) = board();
        board.set_logic_delay_current(1, 100).unwrap();
        board.set_logic_pulse_width_current(1, 200).unwrap();
        board.set_logic_pulse_width_threshold(0, 300).unwrap();

        let logic_i = DacSelect::LogicTimingI.index() as usize;
        let logic_th = DacSelect::LogicTimingTh.index() as usize;
        assert_eq!(sim.register(logic_i, 2), Some(100));
        assert_eq!(sim.register(logic_i, 3), Some(200));
        assert_eq!(sim.register(logic_th, 1), Some(300));

        assert!(matches!(
            board.set_logic_delay_threshold(2, 1),
            Err(HostError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_channel_timing_and_hysteresis() {
        let (mut board, sim) = board();
        board.set_hysteresis(0, 10).unwrap();
        board.set_channel_delay_current(1, 11).unwrap();
        board.set_channel_delay_threshold(2, 12).unwrap();
        board.set_channel_pulse_width_current(3, 13).unwrap();
        board.set_channel_pulse_width_threshold(0, 14).unwrap();

        let reg = |select: DacSelect, channel: u8| sim.register(select.index() as usize, channel);
        assert_eq!(reg(DacSelect::ChannelHysteresis, 0), Some(10));
        assert_eq!(reg(DacSelect::DelayI, 1), Some(11));
        assert_eq!(reg(DacSelect::DelayTh, 2), Some(12));
        assert_eq!(reg(DacSelect::PulseI, 3), Some(13));
        assert_eq!(reg(DacSelect::PulseTh, 0), Some(14));

        // 10-bit part: 1024 does not fit
        assert!(board.set_hysteresis(0, 1024).is_err());
    }

    #[test]
    fn test_pulser() {
        let (mut board, sim) = board();
        board.set_pulser(true).unwrap();
        assert!(sim.timer().running);
    }
}
