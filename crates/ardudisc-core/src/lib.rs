//! ardudisc-core - Firmware core for the ELB_ARDU_DISC4 discriminator board
//!
//! This crate implements the command side of the board firmware: a SCPI-style
//! line protocol that drives eight chip-selected SPI DACs and a test pulser.
//! It is `no_std` compatible and talks to the hardware only through the
//! traits in [`hw`], so the same code runs on a microcontroller, against the
//! simulator in `ardudisc-sim`, or inside host-side tests.
//!
//! # Features
//!
//! - `std` - Enable standard library support and `std::error::Error`
//!
//! # Example
//!
//! ```ignore
//! use ardudisc_core::instrument::{Instrument, InstrumentConfig};
//!
//! let mut instrument = Instrument::new(InstrumentConfig::default(), bus, lines, timer)?;
//! instrument.start(&mut serial)?;
//! loop {
//!     instrument.poll(&mut serial)?;
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chip_select;
pub mod error;
pub mod hw;
pub mod identity;
pub mod instrument;
pub mod pulser;
pub mod scpi;
pub mod spi;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
