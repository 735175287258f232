//! Serve the firmware on an emulated board
//!
//! The firmware core only knows `embedded-io` streams; the adapters here
//! bridge it to stdin/stdout, a serial port and TCP sockets.

use std::io::{self, BufRead};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::Duration;

use ardudisc_host::Connection;
use ardudisc_sim::SimInstrument;
use embedded_io::{ErrorKind, ErrorType};

use crate::config::BoardConfig;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Idle sleep between serial polls
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Map a std I/O error onto the kinds the firmware core knows
fn error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
        io::ErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
        io::ErrorKind::TimedOut => ErrorKind::TimedOut,
        io::ErrorKind::Interrupted => ErrorKind::Interrupted,
        io::ErrorKind::InvalidData => ErrorKind::InvalidData,
        _ => ErrorKind::Other,
    }
}

/// Output half of a std stream
struct IoWriter<W>(W);

impl<W: io::Write> ErrorType for IoWriter<W> {
    type Error = ErrorKind;
}

impl<W: io::Write> embedded_io::Write for IoWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).map_err(|e| error_kind(&e))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().map_err(|e| error_kind(&e))
    }
}

/// A serial port seen as a non-blocking firmware stream
struct SerialStream(Box<dyn serialport::SerialPort>);

impl ErrorType for SerialStream {
    type Error = ErrorKind;
}

impl embedded_io::Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match io::Read::read(&mut self.0, buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(error_kind(&e)),
        }
    }
}

impl embedded_io::ReadReady for SerialStream {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.0
            .bytes_to_read()
            .map(|n| n > 0)
            .map_err(|_| ErrorKind::Other)
    }
}

impl embedded_io::Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.0, buf).map_err(|e| error_kind(&e))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.0).map_err(|e| error_kind(&e))
    }
}

/// Boot the emulated board described by `config_path`
fn boot(
    config_path: Option<&Path>,
    loopback: bool,
) -> Result<SimInstrument, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => BoardConfig::from_toml_file(path)?,
        None => BoardConfig::default(),
    };
    if loopback {
        config = config.with_loopback();
    }

    let board = config.build_board();
    for index in 0..config.peripherals.len() {
        if let Some(name) = board.peripheral_name(index) {
            log::debug!("CS{}: {}", index, name);
        }
    }

    Ok(ardudisc_sim::instrument(&board, config.instrument)?)
}

/// Run `serve`
pub fn run_serve(
    device: Option<&str>,
    listen: Option<&str>,
    config: Option<&Path>,
    loopback: bool,
) -> CmdResult {
    let mut instrument = boot(config, loopback)?;

    match (device, listen) {
        (Some(device), _) => serve_serial(&mut instrument, device),
        (None, Some(addr)) => serve_tcp(&mut instrument, addr),
        (None, None) => serve_stdio(&mut instrument),
    }
}

fn serve_stdio(instrument: &mut SimInstrument) -> CmdResult {
    log::info!("Serving on stdin/stdout");
    let mut out = IoWriter(io::stdout().lock());
    instrument.start(&mut out)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let chunk = input.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        let n = chunk.len();
        instrument.feed(chunk, &mut out)?;
        input.consume(n);
    }

    log::info!("stdin closed");
    Ok(())
}

fn serve_serial(instrument: &mut SimInstrument, device: &str) -> CmdResult {
    let (path, baud) = match Connection::parse(&format!("dev={}", device))? {
        Connection::Serial { device, baud } => (device, baud),
        Connection::Tcp { .. } => return Err(format!("Not a serial device: {}", device).into()),
    };
    let baud = baud.unwrap_or(ardudisc_host::transport::DEFAULT_BAUD);

    log::info!("Serving on {} at {} baud", path, baud);
    let port = serialport::new(&path, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(Duration::from_millis(10))
        .open()?;

    let mut stream = SerialStream(port);
    instrument.start(&mut stream)?;
    loop {
        if instrument.poll(&mut stream)? == 0 {
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn serve_tcp(instrument: &mut SimInstrument, addr: &str) -> CmdResult {
    let listener = TcpListener::bind(addr)?;
    log::info!("Listening on {}", listener.local_addr()?);

    // One client at a time, like a single serial port
    for client in listener.incoming() {
        let mut socket = match client {
            Ok(socket) => socket,
            Err(e) => {
                log::warn!("Accept failed: {}", e);
                continue;
            }
        };
        let peer = socket
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "?".to_string());
        log::info!("Client {} connected", peer);

        if let Err(e) = serve_client(instrument, &mut socket) {
            log::warn!("Client {}: {}", peer, e);
        }
        log::info!("Client {} disconnected", peer);
    }
    Ok(())
}

fn serve_client(instrument: &mut SimInstrument, socket: &mut std::net::TcpStream) -> CmdResult {
    let mut reader = socket.try_clone()?;
    let mut out = IoWriter(socket);
    instrument.start(&mut out)?;

    let mut buf = [0u8; 256];
    loop {
        let n = match io::Read::read(&mut reader, &mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        instrument.feed(&buf[..n], &mut out)?;
    }
}
