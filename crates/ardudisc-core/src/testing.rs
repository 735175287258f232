//! Hardware doubles shared by the unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::chip_select::CS_COUNT;
use crate::hw::{Level, PulseTimer, SelectLine, SpiBus};
use crate::pulser::PulserConfig;
use crate::spi::SpiSettings;

/// Everything the doubles observed, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Line(usize, Level),
    Begin(SpiSettings),
    Transfer(u8),
    End,
    TimerInit(PulserConfig),
    TimerStart,
    TimerStop,
}

#[derive(Debug)]
struct Inner {
    levels: [Level; CS_COUNT],
    events: Vec<Event>,
}

/// Shared event log
#[derive(Debug, Clone)]
pub struct LineLog(Rc<RefCell<Inner>>);

impl Default for LineLog {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(Inner {
            levels: [Level::High; CS_COUNT],
            events: Vec::new(),
        })))
    }
}

impl LineLog {
    pub fn levels(&self) -> [Level; CS_COUNT] {
        self.0.borrow().levels
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }
}

pub struct RecordingLine {
    index: usize,
    log: LineLog,
}

impl RecordingLine {
    pub fn bank(log: &LineLog) -> [RecordingLine; CS_COUNT] {
        core::array::from_fn(|index| RecordingLine {
            index,
            log: log.clone(),
        })
    }
}

impl SelectLine for RecordingLine {
    fn set_level(&mut self, level: Level) {
        self.log.0.borrow_mut().levels[self.index] = level;
        self.log.push(Event::Line(self.index, level));
    }
}

/// Bus whose peripheral returns every byte it is sent
pub struct LoopbackBus {
    log: LineLog,
}

impl LoopbackBus {
    pub fn new(log: &LineLog) -> Self {
        Self { log: log.clone() }
    }
}

impl SpiBus for LoopbackBus {
    fn begin_transaction(&mut self, settings: &SpiSettings) {
        self.log.push(Event::Begin(*settings));
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        self.log.push(Event::Transfer(byte));
        byte
    }

    fn end_transaction(&mut self) {
        self.log.push(Event::End);
    }
}

pub struct RecordingTimer {
    log: LineLog,
}

impl RecordingTimer {
    pub fn new(log: &LineLog) -> Self {
        Self { log: log.clone() }
    }
}

impl PulseTimer for RecordingTimer {
    fn init(&mut self, config: &PulserConfig) {
        self.log.push(Event::TimerInit(*config));
    }

    fn start(&mut self) {
        self.log.push(Event::TimerStart);
    }

    fn stop(&mut self) {
        self.log.push(Event::TimerStop);
    }
}

/// Duplex byte stream: scripted input, captured output
#[derive(Default)]
pub struct TestStream {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl TestStream {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn output_str(&self) -> &str {
        std::str::from_utf8(&self.output).expect("output is ASCII")
    }
}

impl embedded_io::ErrorType for TestStream {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for TestStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.input.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.input.pop_front().unwrap_or(0);
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for TestStream {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.input.is_empty())
    }
}

impl embedded_io::Write for TestStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
