//! ardudisc-sim - In-memory ELB_ARDU_DISC4 board emulator
//!
//! This crate emulates the board around the firmware: eight chip-select
//! lines, an SPI bus with one peripheral per select and the pulser timer.
//! The firmware core runs against it unmodified, which makes it the
//! hardware double for tests and the backend of `ardudisc serve`.
//!
//! ```
//! use ardudisc_sim::{SimBoard, SimSerial};
//!
//! let board = SimBoard::elb_ardu_disc4();
//! let mut instrument = ardudisc_sim::instrument(&board, Default::default()).unwrap();
//! let mut serial = SimSerial::new();
//!
//! serial.push_input(b"SYST:SPI:SEN 4,8,1234\n");
//! instrument.poll(&mut serial).unwrap();
//! assert_eq!(serial.take_output_string(), "SPIRESP,4,8,1234,16777215\n");
//! assert_eq!(board.register(4, 1), Some(1234));
//! ```

pub mod board;
pub mod peripheral;
pub mod serial;

pub use board::{SimBoard, SimPulseTimer, SimSelectLine, SimSpiBus, TimerState, FLOATING_BUS};
pub use peripheral::{DacResolution, Loopback, Mcp48Dac, Peripheral, Silent};
pub use serial::SimSerial;

use ardudisc_core::instrument::{Instrument, InstrumentConfig};

/// Firmware instance running on a simulated board
pub type SimInstrument = Instrument<SimSpiBus, SimSelectLine, SimPulseTimer>;

/// Boot the firmware on `board`
pub fn instrument(
    board: &SimBoard,
    config: InstrumentConfig,
) -> ardudisc_core::Result<SimInstrument> {
    log::debug!("sim: booting firmware on {:?}", board);
    Instrument::new(
        config,
        board.spi_bus(),
        board.select_lines(),
        board.pulse_timer(),
    )
}
