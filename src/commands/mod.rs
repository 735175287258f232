//! CLI command implementations
//!
//! ## Serve
//!
//! `serve` runs the firmware core on an emulated board and wires it to a
//! byte stream: stdin/stdout, a serial port or TCP clients.
//!
//! ## Client commands
//!
//! Everything else connects to a board (real, or one being served) and
//! drives it through `ardudisc-host`.

mod client;
pub mod serve;

pub use client::{run_dac, run_idn, run_pulser, run_raw, run_selects, run_spi, run_threshold};
