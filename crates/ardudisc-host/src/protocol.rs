//! Request lines and reply parsing
//!
//! Requests use the short command forms; the firmware matches them the
//! same as the long ones.

use ardudisc_core::spi::SpiResponse;

use crate::error::{HostError, Result};

/// Identification query
pub const IDN_QUERY: &str = "*IDN?";

/// Prefix of SPI transaction replies
pub const SPI_REPLY_PREFIX: &str = "SPIRESP";

/// Prefix of pulser replies
pub const PULSER_REPLY_PREFIX: &str = "Pulser";

/// Request line for one SPI transaction
pub fn spi_send_request(cs_index: u8, command: u8, payload: u16) -> String {
    format!("SYST:SPI:SEN {}, {}, {}", cs_index, command, payload)
}

/// Request line switching the test pulser
pub fn pulser_request(on: bool) -> &'static str {
    if on {
        "SYST:PUL:ENA"
    } else {
        "SYST:PUL:DIS"
    }
}

/// Parsed `SPIRESP,<index>,<command>,<payload>,<result>` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiReply {
    /// Chip-select index as echoed by the board
    pub cs_index: u8,
    /// Command byte as sent
    pub command: u8,
    /// Payload as sent
    pub payload: u16,
    /// `(echo << 16) | data`
    pub result: u32,
}

impl SpiReply {
    /// Parse a reply line
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = || HostError::MalformedReply(line.to_string());

        let mut fields = line.trim().split(',');
        if fields.next() != Some(SPI_REPLY_PREFIX) {
            return Err(malformed());
        }
        let mut next = || fields.next().map(str::trim).ok_or_else(malformed);
        let cs_index = next()?.parse().map_err(|_| malformed())?;
        let command = next()?.parse().map_err(|_| malformed())?;
        let payload = next()?.parse().map_err(|_| malformed())?;
        let result: u32 = next()?.parse().map_err(|_| malformed())?;
        if fields.next().is_some() || result > 0x00FF_FFFF {
            return Err(malformed());
        }

        Ok(Self {
            cs_index,
            command,
            payload,
            result,
        })
    }

    /// Split the result into the echo byte and the data word
    pub fn response(&self) -> SpiResponse {
        SpiResponse::from_combined(self.result)
    }

    /// The three bytes clocked back, in bus order
    pub fn bytes(&self) -> [u8; 3] {
        let response = self.response();
        let [hi, lo] = response.data.to_be_bytes();
        [response.echo, hi, lo]
    }
}

/// Parse `Pulser,1` / `Pulser,0` into the reported state
pub fn parse_pulser_reply(line: &str) -> Result<bool> {
    match line.trim().split_once(',') {
        Some((PULSER_REPLY_PREFIX, "1")) => Ok(true),
        Some((PULSER_REPLY_PREFIX, "0")) => Ok(false),
        _ => Err(HostError::MalformedReply(line.to_string())),
    }
}
