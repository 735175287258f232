//! Shared board state and the hardware handles the firmware drives

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ardudisc_core::chip_select::{DacSelect, CS_COUNT};
use ardudisc_core::hw::{Level, PulseTimer, SelectLine, SpiBus};
use ardudisc_core::pulser::PulserConfig;
use ardudisc_core::spi::SpiSettings;

use crate::peripheral::{DacResolution, Loopback, Mcp48Dac, Peripheral, Silent};

/// Byte read back when no peripheral drives MISO
pub const FLOATING_BUS: u8 = 0xFF;

/// What the pulser timer has been told
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    /// Configuration from the last `init`, if any
    pub config: Option<PulserConfig>,
    /// Whether the output is toggling
    pub running: bool,
    /// Number of `start` calls
    pub starts: usize,
}

struct BoardState {
    levels: [Level; CS_COUNT],
    history: Vec<(usize, Level)>,
    peripherals: Vec<Box<dyn Peripheral>>,
    settings: Option<SpiSettings>,
    transactions: usize,
    timer: TimerState,
}

impl BoardState {
    fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, level)| **level == Level::Low)
            .map(|(index, _)| index)
    }
}

/// Emulated ELB_ARDU_DISC4 board
///
/// Cloning gives another handle to the same board. Hand the pieces from
/// [`SimBoard::select_lines`], [`SimBoard::spi_bus`] and
/// [`SimBoard::pulse_timer`] to the firmware and keep a clone to inspect
/// what it did.
#[derive(Clone)]
pub struct SimBoard(Rc<RefCell<BoardState>>);

impl SimBoard {
    /// Board with one peripheral per chip select, in chip-select order
    pub fn new(peripherals: [Box<dyn Peripheral>; CS_COUNT]) -> Self {
        Self(Rc::new(RefCell::new(BoardState {
            levels: [Level::High; CS_COUNT],
            history: Vec::new(),
            peripherals: peripherals.into(),
            settings: None,
            transactions: 0,
            timer: TimerState::default(),
        })))
    }

    /// The real board: an MCP48FVB24 on the channel threshold select and
    /// MCP48FVB14 parts everywhere else
    pub fn elb_ardu_disc4() -> Self {
        Self::new(DacSelect::ALL.map(|select| {
            Box::new(Mcp48Dac::new(DacResolution::for_select(select))) as Box<dyn Peripheral>
        }))
    }

    /// Every select wired to a loopback peripheral
    pub fn loopback() -> Self {
        Self::new(core::array::from_fn(|_| Box::new(Loopback) as Box<dyn Peripheral>))
    }

    /// Nothing populated
    pub fn empty() -> Self {
        Self::new(core::array::from_fn(|_| Box::new(Silent) as Box<dyn Peripheral>))
    }

    /// Swap the peripheral on one select; out-of-range indices are ignored
    pub fn set_peripheral(&self, index: usize, peripheral: Box<dyn Peripheral>) {
        let mut state = self.0.borrow_mut();
        if let Some(slot) = state.peripherals.get_mut(index) {
            *slot = peripheral;
        } else {
            log::warn!("sim: no chip select {}", index);
        }
    }

    /// The eight select lines, in chip-select order
    pub fn select_lines(&self) -> [SimSelectLine; CS_COUNT] {
        core::array::from_fn(|index| SimSelectLine {
            index,
            board: self.clone(),
        })
    }

    /// The SPI controller
    pub fn spi_bus(&self) -> SimSpiBus {
        SimSpiBus {
            board: self.clone(),
        }
    }

    /// The pulser timer
    pub fn pulse_timer(&self) -> SimPulseTimer {
        SimPulseTimer {
            board: self.clone(),
        }
    }

    /// Current select line levels
    pub fn levels(&self) -> [Level; CS_COUNT] {
        self.0.borrow().levels
    }

    /// Every level change, in order
    pub fn history(&self) -> Vec<(usize, Level)> {
        self.0.borrow().history.clone()
    }

    /// Forget the recorded history
    pub fn clear_history(&self) {
        self.0.borrow_mut().history.clear();
    }

    /// Completed bus transactions
    pub fn transactions(&self) -> usize {
        self.0.borrow().transactions
    }

    /// Pulser timer state
    pub fn timer(&self) -> TimerState {
        self.0.borrow().timer
    }

    /// Read a register of the peripheral on `index`
    pub fn register(&self, index: usize, address: u8) -> Option<u16> {
        self.0.borrow().peripherals.get(index)?.register(address)
    }

    /// Name of the peripheral on `index`
    pub fn peripheral_name(&self, index: usize) -> Option<String> {
        self.0
            .borrow()
            .peripherals
            .get(index)
            .map(|p| p.name().to_string())
    }
}

impl fmt::Debug for SimBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        let names: Vec<&str> = state.peripherals.iter().map(|p| p.name()).collect();
        f.debug_struct("SimBoard")
            .field("levels", &state.levels)
            .field("peripherals", &names)
            .field("timer", &state.timer)
            .finish()
    }
}

/// One chip-select output
pub struct SimSelectLine {
    index: usize,
    board: SimBoard,
}

impl SelectLine for SimSelectLine {
    fn set_level(&mut self, level: Level) {
        let mut state = self.board.0.borrow_mut();
        let previous = state.levels[self.index];
        state.levels[self.index] = level;
        state.history.push((self.index, level));

        match (previous, level) {
            (Level::High, Level::Low) => state.peripherals[self.index].select(),
            (Level::Low, Level::High) => state.peripherals[self.index].deselect(),
            _ => {}
        }
    }
}

/// The SPI controller; MISO comes from whichever peripheral is selected
pub struct SimSpiBus {
    board: SimBoard,
}

impl SpiBus for SimSpiBus {
    fn begin_transaction(&mut self, settings: &SpiSettings) {
        let mut state = self.board.0.borrow_mut();
        if state.settings.is_some() {
            log::warn!("sim: bus claimed twice");
        }
        state.settings = Some(*settings);
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        let mut state = self.board.0.borrow_mut();
        if state.settings.is_none() {
            log::warn!("sim: transfer outside a bus transaction");
        }

        let selected: Vec<usize> = state.selected().collect();
        if selected.len() > 1 {
            log::warn!("sim: bus contention on selects {:?}", selected);
        }

        // Open-drain view of contention: any low bit wins
        selected.iter().fold(FLOATING_BUS, |miso, &index| {
            miso & state.peripherals[index].exchange(byte)
        })
    }

    fn end_transaction(&mut self) {
        let mut state = self.board.0.borrow_mut();
        if state.settings.take().is_none() {
            log::warn!("sim: bus released without being claimed");
        }
        state.transactions += 1;
    }
}

/// The test pulser timer
pub struct SimPulseTimer {
    board: SimBoard,
}

impl PulseTimer for SimPulseTimer {
    fn init(&mut self, config: &PulserConfig) {
        self.board.0.borrow_mut().timer.config = Some(*config);
    }

    fn start(&mut self) {
        let mut state = self.board.0.borrow_mut();
        state.timer.running = true;
        state.timer.starts += 1;
    }

    fn stop(&mut self) {
        self.board.0.borrow_mut().timer.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::mcp48;

    #[test]
    fn test_floating_bus_reads_ones() {
        let board = SimBoard::loopback();
        let mut bus = board.spi_bus();
        bus.begin_transaction(&ardudisc_core::spi::TRANSACTION_SETTINGS);
        assert_eq!(bus.transfer(0x12), FLOATING_BUS);
        bus.end_transaction();
    }

    #[test]
    fn test_routes_to_selected_peripheral() {
        let board = SimBoard::elb_ardu_disc4();
        let mut lines = board.select_lines();
        let mut bus = board.spi_bus();

        bus.begin_transaction(&ardudisc_core::spi::TRANSACTION_SETTINGS);
        lines[4].set_level(Level::Low);
        bus.transfer(mcp48::encode(1, mcp48::CMD_WRITE));
        bus.transfer16(0x0ABC);
        lines[4].set_level(Level::High);
        bus.end_transaction();

        assert_eq!(board.register(4, 1), Some(0x0ABC));
        assert_eq!(board.register(3, 1), Some(0));
        assert_eq!(board.transactions(), 1);
        assert_eq!(board.history(), vec![(4, Level::Low), (4, Level::High)]);
    }

    #[test]
    fn test_preset_resolutions() {
        let board = SimBoard::elb_ardu_disc4();
        assert_eq!(board.peripheral_name(4).as_deref(), Some("mcp48fvb24"));
        assert_eq!(board.peripheral_name(0).as_deref(), Some("mcp48fvb14"));
        assert_eq!(board.peripheral_name(8), None);
    }

    #[test]
    fn test_timer_state() {
        let board = SimBoard::empty();
        let mut timer = board.pulse_timer();
        timer.init(&PulserConfig::default());
        timer.start();
        assert!(board.timer().running);
        timer.stop();
        let state = board.timer();
        assert!(!state.running);
        assert_eq!(state.starts, 1);
        assert_eq!(state.config, Some(PulserConfig::default()));
    }
}
