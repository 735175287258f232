//! The board's command loop
//!
//! [`Instrument`] owns every piece of firmware state: the compiled command
//! registry, the SPI engine with its chip-select mux, the pulser and the
//! line buffer. Bytes go in through [`Instrument::poll`] or
//! [`Instrument::feed`], responses come out on the writer passed along.
//!
//! Handlers never fail. Unknown commands are dropped, numbers that do not
//! parse read as 0, and out-of-range values are coerced. A caller only sees
//! an error when the byte stream fails or a response outgrows its buffer.

use core::fmt::{self, Write as _};

use embedded_io::{Read, ReadReady, Write};
use heapless::String;

use crate::chip_select::{ChipSelectMux, CS_COUNT};
use crate::error::{Error, Result};
use crate::hw::{PulseTimer, SelectLine, SpiBus};
use crate::identity::{Identity, FIELD_CAPACITY};
use crate::pulser::{Pulser, PulserAction, PulserConfig, PulserState};
use crate::scpi::{
    split_messages, Feed, LineBuffer, Message, Parameters, Registry, TableEntry,
    DEFAULT_LINE_CAPACITY,
};
use crate::spi::SpiEngine;

/// Longest response line without the terminator
///
/// Sized for a full identity line: four fields and three commas.
const RESPONSE_CAPACITY: usize = 4 * FIELD_CAPACITY + 8;

/// Bytes pulled from the stream per read in [`Instrument::poll`]
const READ_CHUNK: usize = 32;

/// Response terminator, shared by every handler
pub const RESPONSE_TERMINATOR: &str = "\n";

/// Handler selected by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `*IDN?`
    Identify,
    /// `SYSTem:SPI:SENd <index>,<command>,<payload>`
    SpiSend,
    /// `SYSTem:PULser:ENAble` / `SYSTem:PULser:DISable`
    Pulser,
}

/// The board's command set
pub const COMMAND_TABLE: &[TableEntry<Command>] = &[
    TableEntry::Command("*IDN?", Command::Identify),
    TableEntry::TreeBase("SYSTem:SPI"),
    TableEntry::Command(":SENd", Command::SpiSend),
    TableEntry::TreeBase("SYSTem:PULser"),
    TableEntry::Command(":DISable", Command::Pulser),
    TableEntry::Command(":ENAble", Command::Pulser),
];

/// Startup configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentConfig {
    /// Identification line reported by `*IDN?` and at startup
    pub identity: Identity,
    /// Pulser timer setup
    pub pulser: PulserConfig,
}

/// Firmware state plus the command loop
pub struct Instrument<B, L, T, const N: usize = DEFAULT_LINE_CAPACITY> {
    registry: Registry<Command>,
    engine: SpiEngine<B, L>,
    pulser: Pulser<T>,
    identity: Identity,
    line: LineBuffer<N>,
}

impl<B, L, T, const N: usize> Instrument<B, L, T, N>
where
    B: SpiBus,
    L: SelectLine,
    T: PulseTimer,
{
    /// Bring up the hardware and compile the command table
    ///
    /// On return every select line is idle, the SPI controller is set up and
    /// the pulser timer is configured but stopped.
    pub fn new(config: InstrumentConfig, bus: B, lines: [L; CS_COUNT], timer: T) -> Result<Self> {
        let registry = Registry::from_table(COMMAND_TABLE)?;

        let mut engine = SpiEngine::new(bus, ChipSelectMux::new(lines));
        engine.init();
        let pulser = Pulser::new(timer, config.pulser);

        log::debug!(
            "instrument: {} commands, pulser {} Hz",
            registry.len(),
            config.pulser.frequency_hz()
        );

        Ok(Self {
            registry,
            engine,
            pulser,
            identity: config.identity,
            line: LineBuffer::new(),
        })
    }

    /// Announce the board: write the identity line unprompted
    pub fn start<W: Write>(&mut self, out: &mut W) -> Result<()> {
        log::info!("instrument: ready as {}", self.identity);
        self.identify(out)
    }

    /// Drain whatever input is ready and dispatch completed lines
    ///
    /// Never blocks waiting for input. Returns the number of lines
    /// dispatched.
    pub fn poll<S>(&mut self, stream: &mut S) -> Result<usize>
    where
        S: Read + ReadReady + Write,
    {
        let mut dispatched = 0;
        let mut chunk = [0u8; READ_CHUNK];
        while stream.read_ready().map_err(Error::io)? {
            let n = stream.read(&mut chunk).map_err(Error::io)?;
            if n == 0 {
                break;
            }
            dispatched += self.feed(&chunk[..n], stream)?;
        }
        Ok(dispatched)
    }

    /// Feed raw input bytes, dispatching each line as it completes
    ///
    /// Returns the number of lines dispatched.
    pub fn feed<W: Write>(&mut self, bytes: &[u8], out: &mut W) -> Result<usize> {
        let mut dispatched = 0;
        for &byte in bytes {
            match self.line.push(byte) {
                Feed::Pending => {}
                Feed::Discarded => log::debug!("instrument: dropped overlong line"),
                Feed::Complete => {
                    let line = self.line.take();
                    self.process_line(&line, out)?;
                    dispatched += 1;
                }
            }
        }
        Ok(dispatched)
    }

    /// Dispatch one complete line, without its terminator
    pub fn process_line<W: Write>(&mut self, line: &[u8], out: &mut W) -> Result<()> {
        let Ok(line) = core::str::from_utf8(line) else {
            log::debug!("instrument: dropping non-ASCII line");
            return Ok(());
        };

        for unit in split_messages(line) {
            self.dispatch(unit, out)?;
        }
        Ok(())
    }

    fn dispatch<W: Write>(&mut self, unit: &str, out: &mut W) -> Result<()> {
        let Some(message) = Message::parse(unit) else {
            log::debug!("instrument: malformed header in {:?}", unit);
            return Ok(());
        };

        match self.registry.lookup(&message.header) {
            Some(Command::Identify) => self.identify(out),
            Some(Command::SpiSend) => self.spi_send(&message.params, out),
            Some(Command::Pulser) => self.pulser_control(message.header.last(), out),
            None => {
                log::debug!("instrument: no handler for {:?}", unit);
                Ok(())
            }
        }
    }

    fn identify<W: Write>(&mut self, out: &mut W) -> Result<()> {
        respond(out, format_args!("{}", self.identity))
    }

    fn spi_send<W: Write>(&mut self, params: &Parameters<'_>, out: &mut W) -> Result<()> {
        log::info!("SPI IO");

        let cs_index = params.int(0) as u8;
        let command = params.int(1).clamp(0, 0xff) as u8;
        let payload = params.int(2) as u16;
        log::debug!(
            "spi send: index {} command {} payload {}",
            cs_index,
            command,
            payload
        );

        let response = self.engine.transact(cs_index, command, payload);

        respond(
            out,
            format_args!(
                "SPIRESP,{},{},{},{}",
                cs_index,
                command,
                payload,
                response.combined()
            ),
        )
    }

    fn pulser_control<W: Write>(&mut self, last_segment: &str, out: &mut W) -> Result<()> {
        match PulserAction::from_segment(last_segment) {
            Some(PulserAction::Enable) => {
                self.pulser.enable();
                respond(out, format_args!("Pulser,1"))
            }
            Some(PulserAction::Disable) => {
                self.pulser.disable();
                respond(out, format_args!("Pulser,0"))
            }
            None => respond(out, format_args!("Invalid Parameter")),
        }
    }

    /// Current identity
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether the pulser is running
    pub fn pulser_state(&self) -> PulserState {
        self.pulser.state()
    }

    /// The pulser
    pub fn pulser(&self) -> &Pulser<T> {
        &self.pulser
    }

    /// The SPI engine (bus and chip-select mux)
    pub fn engine(&self) -> &SpiEngine<B, L> {
        &self.engine
    }

    /// The compiled command registry
    pub fn registry(&self) -> &Registry<Command> {
        &self.registry
    }

    /// Bytes of an incomplete line waiting for its terminator
    pub fn pending_input(&self) -> &[u8] {
        self.line.pending()
    }
}

/// Format one response line and write it out with the terminator
fn respond<W: Write>(out: &mut W, args: fmt::Arguments<'_>) -> Result<()> {
    let mut line: String<RESPONSE_CAPACITY> = String::new();
    if line.write_fmt(args).is_err() {
        log::error!("instrument: response exceeds {} bytes", RESPONSE_CAPACITY);
        return Err(Error::ResponseTooLong);
    }
    out.write_all(line.as_bytes()).map_err(Error::io)?;
    out.write_all(RESPONSE_TERMINATOR.as_bytes()).map_err(Error::io)?;
    out.flush().map_err(Error::io)
}
