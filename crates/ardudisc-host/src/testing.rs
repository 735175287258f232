//! Transports for tests: the real firmware on a simulated board, and a
//! fixed script of board output

use std::collections::VecDeque;
use std::time::Duration;

use ardudisc_core::instrument::InstrumentConfig;
use ardudisc_sim::{SimBoard, SimInstrument, SimSerial};

use crate::error::{HostError, Result};
use crate::transport::{Transport, REQUEST_TERMINATOR};

/// Firmware running on a [`SimBoard`], reached through its serial link
pub struct SimLink {
    board: SimBoard,
    instrument: SimInstrument,
    serial: SimSerial,
}

impl SimLink {
    /// Boot the firmware; its welcome line is waiting to be read
    pub fn boot(board: SimBoard) -> Self {
        let mut instrument = ardudisc_sim::instrument(&board, InstrumentConfig::default())
            .expect("command table compiles");
        let mut serial = SimSerial::new();
        instrument.start(&mut serial).expect("sim serial never fails");
        Self {
            board,
            instrument,
            serial,
        }
    }

    pub fn board(&self) -> &SimBoard {
        &self.board
    }
}

impl Transport for SimLink {
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.serial.push_input(line.trim_end().as_bytes());
        self.serial.push_input(REQUEST_TERMINATOR);
        self.instrument
            .poll(&mut self.serial)
            .map_err(|e| HostError::IoError(e.to_string()))?;
        Ok(())
    }

    fn receive(&mut self, rx: &mut Vec<u8>, _wait: Duration) -> Result<usize> {
        let output = self.serial.take_output();
        rx.extend_from_slice(&output);
        Ok(output.len())
    }
}

/// Plays back fixed board output, recording what was sent
pub struct ScriptedLink {
    script: VecDeque<u8>,
    sent: Vec<u8>,
}

impl ScriptedLink {
    pub fn new(script: &[u8]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            sent: Vec::new(),
        }
    }

    pub fn sent_str(&self) -> &str {
        std::str::from_utf8(&self.sent).expect("requests are ASCII")
    }
}

impl Transport for ScriptedLink {
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.extend_from_slice(line.trim_end().as_bytes());
        self.sent.extend_from_slice(REQUEST_TERMINATOR);
        Ok(())
    }

    fn receive(&mut self, rx: &mut Vec<u8>, _wait: Duration) -> Result<usize> {
        let n = self.script.len();
        rx.extend(self.script.drain(..));
        Ok(n)
    }
}
