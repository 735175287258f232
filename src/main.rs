//! ardudisc - host tool for the ELB_ARDU_DISC4 discriminator board
//!
//! The board runs a small SCPI-style firmware that moves 24-bit SPI frames
//! to the DACs on its eight chip selects and switches a test pulser. This
//! binary can:
//! - **serve** that firmware on an emulated board, over stdio, a serial
//!   port or TCP, for development without hardware
//! - act as a **client** for a real or served board: identify it, run raw
//!   SPI transactions, program DACs and discriminator thresholds

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands, Switch};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::Serve {
            device,
            listen,
            config,
            loopback,
        } => commands::serve::run_serve(
            device.as_deref(),
            listen.as_deref(),
            config.as_deref(),
            loopback,
        ),
        Commands::Idn { connection } => commands::run_idn(&connection),
        Commands::Spi {
            connection,
            cs,
            command,
            payload,
        } => commands::run_spi(&connection, cs, command, payload),
        Commands::Pulser { connection, state } => {
            commands::run_pulser(&connection, state == Switch::On)
        }
        Commands::Raw {
            connection,
            line,
            no_reply,
        } => commands::run_raw(&connection, &line, !no_reply),
        Commands::Dac {
            connection,
            select,
            channel,
            value,
            no_verify,
        } => commands::run_dac(&connection, &select, channel, value, !no_verify),
        Commands::Threshold {
            connection,
            channel,
            volts,
            no_verify,
        } => commands::run_threshold(&connection, channel, volts, !no_verify),
        Commands::Selects => {
            commands::run_selects();
            Ok(())
        }
    };

    result
}
