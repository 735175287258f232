//! Client commands against a connected board

use std::time::Duration;

use ardudisc_core::chip_select::{DacSelect, CS_COUNT};
use ardudisc_host::board::{dac_for, threshold_span_v};
use ardudisc_host::{open, Board};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Print the identification line
pub fn run_idn(connection: &str) -> CmdResult {
    let mut device = open(connection)?;
    let identity = device.identify()?;
    println!("{}", identity);
    Ok(())
}

/// Run one SPI transaction and show what came back
pub fn run_spi(connection: &str, cs: u8, command: u8, payload: u16) -> CmdResult {
    if usize::from(cs) >= CS_COUNT {
        log::warn!("Chip select {} is out of range, the board will use 0", cs);
    }

    let mut device = open(connection)?;
    let reply = device.spi_send(cs, command, payload)?;
    let response = reply.response();
    println!(
        "cs={} command=0x{:02X} payload=0x{:04X} -> echo=0x{:02X} data=0x{:04X} ({})",
        reply.cs_index, reply.command, reply.payload, response.echo, response.data, reply.result
    );
    Ok(())
}

/// Switch the test pulser
pub fn run_pulser(connection: &str, on: bool) -> CmdResult {
    let mut device = open(connection)?;
    device.set_pulser(on)?;
    println!("Pulser {}", if on { "on" } else { "off" });
    Ok(())
}

/// Send a raw line, optionally printing the reply
pub fn run_raw(connection: &str, line: &str, wait_for_reply: bool) -> CmdResult {
    let mut device = open(connection)?;
    if wait_for_reply {
        println!("{}", device.query(line)?);
    } else {
        device.send(line)?;
        // Give the board a moment before the port closes
        if let Some(extra) = device.read_line(Duration::from_millis(100))? {
            println!("{}", extra);
        }
    }
    Ok(())
}

fn parse_select(select: &str) -> Result<DacSelect, String> {
    DacSelect::from_name(select)
        .or_else(|| select.parse().ok().and_then(DacSelect::from_index))
        .ok_or_else(|| {
            let names: Vec<&str> = DacSelect::ALL.iter().map(|s| s.name()).collect();
            format!(
                "Unknown DAC {:?}. Use an index 0-7 or one of: {}",
                select,
                names.join(", ")
            )
        })
}

/// Set one DAC channel to a raw code
pub fn run_dac(
    connection: &str,
    select: &str,
    channel: usize,
    value: u16,
    verify: bool,
) -> CmdResult {
    let select = parse_select(select)?;
    let mut board = Board::with_verify(open(connection)?, verify)?;
    board.set_dac(select, channel, value)?;
    println!("{} channel {} = {}", select.name(), channel, value);
    Ok(())
}

/// Set a discriminator threshold in volts
pub fn run_threshold(connection: &str, channel: usize, volts: f64, verify: bool) -> CmdResult {
    let mut board = Board::with_verify(open(connection)?, verify)?;
    let code = board.set_threshold_volts(channel, volts)?;
    println!("Threshold channel {} = {} V (DAC code {})", channel, volts, code);
    Ok(())
}

/// List chip selects
pub fn run_selects() {
    println!("Chip selects:");
    println!();
    println!("{:<6} {:<4} {:<20} {:<12} {:>5}", "Index", "Pin", "Name", "DAC", "Bits");
    println!("{}", "-".repeat(51));
    for select in DacSelect::ALL {
        let dac = dac_for(select);
        println!(
            "{:<6} {:<4} {:<20} {:<12} {:>5}",
            select.index(),
            select.pin(),
            select.name(),
            format!("{:?}", dac.model()),
            dac.model().resolution()
        );
    }
    println!();
    let half = threshold_span_v() / 2.0;
    println!("Threshold range: {:.3} V ... {:.3} V", -half, half);
}
