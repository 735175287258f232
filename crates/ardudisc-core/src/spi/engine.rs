//! The 24-bit SPI transaction engine

use super::{SpiResponse, TRANSACTION_SETTINGS};
use crate::chip_select::ChipSelectMux;
use crate::hw::{SelectLine, SpiBus};

/// Owns the SPI bus and the select lines and runs one transaction at a time
///
/// Holding both behind `&mut self` is what guarantees exclusive bus access:
/// a transaction always completes before the next one can start.
pub struct SpiEngine<B, L> {
    bus: B,
    mux: ChipSelectMux<L>,
}

impl<B: SpiBus, L: SelectLine> SpiEngine<B, L> {
    /// Create an engine; the mux has already driven every line idle
    pub fn new(bus: B, mux: ChipSelectMux<L>) -> Self {
        Self { bus, mux }
    }

    /// Startup: all select lines idle, controller configured
    pub fn init(&mut self) {
        self.mux.deselect_all();
        self.bus.init();
    }

    /// Send `command` and `payload` to the peripheral at `cs_index`
    ///
    /// The select line is released before returning, whatever was read back.
    pub fn transact(&mut self, cs_index: u8, command: u8, payload: u16) -> SpiResponse {
        let line = self.mux.resolve(cs_index);

        self.bus.begin_transaction(&TRANSACTION_SETTINGS);
        self.mux.drive(line, true);
        let echo = self.bus.transfer(command);
        let data = self.bus.transfer16(payload);
        self.mux.drive(line, false);
        self.bus.end_transaction();

        log::trace!(
            "spi: cs={} cmd={:#04x} payload={:#06x} -> echo={:#04x} data={:#06x}",
            line,
            command,
            payload,
            echo,
            data
        );

        SpiResponse { echo, data }
    }

    /// The underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The chip-select mux
    pub fn mux(&self) -> &ChipSelectMux<L> {
        &self.mux
    }

    /// Split the engine back into bus and mux
    pub fn into_parts(self) -> (B, ChipSelectMux<L>) {
        (self.bus, self.mux)
    }
}
