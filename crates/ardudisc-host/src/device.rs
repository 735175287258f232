//! Board connection
//!
//! [`ArduDisc`] wraps a transport with the line protocol: it checks the
//! welcome line on connect, sends requests and waits for the matching
//! reply, skipping anything unrelated that arrives in between.

use std::time::{Duration, Instant};

use ardudisc_core::identity::Identity;

use crate::error::{HostError, Result};
use crate::protocol::{
    parse_pulser_reply, pulser_request, spi_send_request, SpiReply, IDN_QUERY,
    PULSER_REPLY_PREFIX, SPI_REPLY_PREFIX,
};
use crate::transport::Transport;

/// How long to wait for a reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(4);

/// How long to wait for the welcome line after connecting
pub const WELCOME_TIMEOUT: Duration = Duration::from_secs(4);

/// Longest wait on the transport before re-checking the deadline
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Longest line kept while waiting for a terminator
const MAX_LINE: usize = 512;

/// Connection to an ELB_ARDU_DISC4 board
pub struct ArduDisc<T: Transport> {
    transport: T,
    identity: Identity,
    rx: Vec<u8>,
    timeout: Duration,
}

impl<T: Transport> ArduDisc<T> {
    /// Connect: wait for the welcome line and check it names a supported board
    pub fn new(transport: T) -> Result<Self> {
        Self::connect(transport, WELCOME_TIMEOUT)
    }

    /// Like [`ArduDisc::new`] with a custom welcome timeout
    pub fn connect(transport: T, welcome_timeout: Duration) -> Result<Self> {
        let mut device = Self {
            transport,
            identity: Identity::default(),
            rx: Vec::new(),
            timeout: DEFAULT_REPLY_TIMEOUT,
        };

        let welcome = device
            .wait_for("welcome", welcome_timeout, |line| !line.is_empty())?;
        device.identity = match Identity::parse(&welcome) {
            Some(identity) if identity.is_compatible() => identity,
            _ => return Err(HostError::Incompatible(welcome)),
        };
        log::info!("ELB_ARDU_DISC found: {}", device.identity);

        Ok(device)
    }

    /// Change the reply timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Identity from the welcome line
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Ask the board to identify itself
    pub fn identify(&mut self) -> Result<Identity> {
        self.send(IDN_QUERY)?;
        let line = self.wait_for("identification", self.timeout, |line| {
            Identity::parse(line).is_some()
        })?;
        Identity::parse(&line).ok_or(HostError::MalformedReply(line))
    }

    /// Run one 24-bit SPI transaction on chip select `cs_index`
    pub fn spi_send(&mut self, cs_index: u8, command: u8, payload: u16) -> Result<SpiReply> {
        self.send(&spi_send_request(cs_index, command, payload))?;
        let line = self.wait_for_prefix(SPI_REPLY_PREFIX)?;
        let reply = SpiReply::parse(&line)?;

        if (reply.cs_index, reply.command, reply.payload) != (cs_index, command, payload) {
            log::warn!(
                "SPI reply {:?} does not match request {}/{}/{}",
                line,
                cs_index,
                command,
                payload
            );
            return Err(HostError::MalformedReply(line));
        }

        log::debug!("SPI cs={} -> {:02X?}", cs_index, reply.bytes());
        Ok(reply)
    }

    /// Switch the test pulser on or off
    pub fn set_pulser(&mut self, on: bool) -> Result<()> {
        self.send(pulser_request(on))?;
        let line = self.wait_for_prefix(PULSER_REPLY_PREFIX)?;
        if parse_pulser_reply(&line)? != on {
            return Err(HostError::MalformedReply(line));
        }
        Ok(())
    }

    /// Send a raw line and return the next line the board sends back
    pub fn query(&mut self, line: &str) -> Result<String> {
        self.send(line)?;
        self.wait_for(line, self.timeout, |_| true)
    }

    /// Send a raw line without waiting for anything
    pub fn send(&mut self, line: &str) -> Result<()> {
        log::trace!("-> {}", line);
        self.transport.send_line(line)
    }

    /// Read the next line, or `None` if nothing complete arrives in time
    pub fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(pos) = self.rx.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.rx.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                log::trace!("<- {}", line);
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wait = (deadline - now).min(POLL_INTERVAL);
            self.transport.receive(&mut self.rx, wait)?;
            if self.rx.len() > MAX_LINE {
                log::warn!("Dropping {} bytes without line terminator", self.rx.len());
                self.rx.clear();
            }
        }
    }

    /// Wait for a line starting with `prefix`
    fn wait_for_prefix(&mut self, prefix: &str) -> Result<String> {
        self.wait_for(prefix, self.timeout, |line| line.starts_with(prefix))
    }

    /// Wait for a line accepted by `accept`, skipping the others
    fn wait_for(
        &mut self,
        what: &str,
        timeout: Duration,
        accept: impl Fn(&str) -> bool,
    ) -> Result<String> {
        let start = Instant::now();
        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            match self.read_line(remaining)? {
                Some(line) if accept(&line) => {
                    log::debug!("Answer {:?}, took {:?}", line, start.elapsed());
                    return Ok(line);
                }
                Some(line) => log::debug!("Skipping unrelated line {:?}", line),
                None => return Err(HostError::Timeout(what.to_string())),
            }
        }
    }

    /// Give back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }
}
