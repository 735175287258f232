//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let n = parse_hex_u32(s)?;
    u8::try_from(n).map_err(|_| format!("{} does not fit in 8 bits", s))
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let n = parse_hex_u32(s)?;
    u16::try_from(n).map_err(|_| format!("{} does not fit in 16 bits", s))
}

const CONNECTION_HELP: &str = "Board connection [dev=<port>[:baud] | ip=<host>:<port>]";

#[derive(Parser)]
#[command(name = "ardudisc")]
#[command(
    author,
    version,
    about = "ELB_ARDU_DISC4 discriminator board tool",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Switch position for the test pulser
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Start the pulser
    On,
    /// Stop the pulser
    Off,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board firmware on an emulated board
    ///
    /// Without --device or --listen the firmware talks on stdin/stdout.
    Serve {
        /// Serve on a serial port (e.g. a virtual null-modem end) as DEV[:BAUD]
        #[arg(short, long, conflicts_with = "listen")]
        device: Option<String>,

        /// Accept TCP connections on ADDR (e.g. 127.0.0.1:5025)
        #[arg(short, long)]
        listen: Option<String>,

        /// Board description file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Put a loopback peripheral on every chip select
        #[arg(long)]
        loopback: bool,
    },

    /// Print the board identification
    Idn {
        #[arg(short, long, help = CONNECTION_HELP)]
        connection: String,
    },

    /// Run one 24-bit SPI transaction
    Spi {
        #[arg(short, long, help = CONNECTION_HELP)]
        connection: String,

        /// Chip-select index (0-7)
        #[arg(value_parser = parse_hex_u8)]
        cs: u8,

        /// Command byte (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u8)]
        command: u8,

        /// 16-bit payload (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u16)]
        payload: u16,
    },

    /// Switch the test pulser
    Pulser {
        #[arg(short, long, help = CONNECTION_HELP)]
        connection: String,

        /// Desired state
        #[arg(value_enum)]
        state: Switch,
    },

    /// Send a raw command line and print the reply
    Raw {
        #[arg(short, long, help = CONNECTION_HELP)]
        connection: String,

        /// Command line, e.g. "SYST:SPI:SEN 4,0x40,0xFF"
        line: String,

        /// Don't wait for a reply
        #[arg(long)]
        no_reply: bool,
    },

    /// Set one DAC channel to a raw code
    Dac {
        #[arg(short, long, help = CONNECTION_HELP)]
        connection: String,

        /// DAC by name (e.g. channel-threshold, delay-i) or chip-select index
        select: String,

        /// DAC channel (0-3)
        channel: usize,

        /// DAC code (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u16)]
        value: u16,

        /// Don't check the DAC's command-valid flag (no DACs answering)
        #[arg(long)]
        no_verify: bool,
    },

    /// Set a discriminator threshold in volts
    Threshold {
        #[arg(short, long, help = CONNECTION_HELP)]
        connection: String,

        /// Discriminator channel (0-3)
        channel: usize,

        /// Threshold in volts at the input
        #[arg(allow_negative_numbers = true)]
        volts: f64,

        /// Don't check the DAC's command-valid flag (no DACs answering)
        #[arg(long)]
        no_verify: bool,
    },

    /// List the chip selects and the DAC fitted on each
    Selects,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_hex_u8("0x10"), Ok(16));
        assert_eq!(parse_hex_u8("255"), Ok(255));
        assert!(parse_hex_u8("256").is_err());
        assert_eq!(parse_hex_u16("0XFFFF"), Ok(0xFFFF));
        assert!(parse_hex_u16("0x10000").is_err());
        assert!(parse_hex_u16("ten").is_err());
    }

    #[test]
    fn test_parse_spi() {
        let cli = Cli::try_parse_from([
            "ardudisc",
            "spi",
            "-c",
            "dev=/dev/ttyACM0",
            "2",
            "0x10",
            "1000",
        ])
        .unwrap();
        match cli.command {
            Commands::Spi {
                cs,
                command,
                payload,
                ..
            } => assert_eq!((cs, command, payload), (2, 16, 1000)),
            _ => panic!("expected spi"),
        }
    }

    #[test]
    fn test_negative_threshold() {
        let cli = Cli::try_parse_from([
            "ardudisc",
            "threshold",
            "-c",
            "ip=h:1",
            "1",
            "-0.5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Threshold { volts, no_verify: false, .. } if volts == -0.5
        ));
    }

    #[test]
    fn test_no_verify_flag() {
        let cli = Cli::try_parse_from([
            "ardudisc",
            "dac",
            "-c",
            "dev=/dev/ttyUSB0",
            "--no-verify",
            "delay-i",
            "3",
            "0x200",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Dac { channel: 3, value: 0x200, no_verify: true, .. }
        ));

        let cli = Cli::try_parse_from([
            "ardudisc",
            "threshold",
            "-c",
            "ip=h:1",
            "0",
            "0.25",
            "--no-verify",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Threshold { no_verify: true, .. }));
    }

    #[test]
    fn test_serve_device_conflicts_with_listen() {
        assert!(Cli::try_parse_from([
            "ardudisc",
            "serve",
            "--device",
            "/dev/pts/3",
            "--listen",
            "127.0.0.1:5025",
        ])
        .is_err());
    }
}
