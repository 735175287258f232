//! Board description for `ardudisc serve`
//!
//! An optional TOML file overrides the identity, the pulser timing and what
//! sits on each chip select of the emulated board:
//!
//! ```toml
//! [identity]
//! serial = "#07"
//!
//! [pulser]
//! period_us = 1000
//! duty = 256
//!
//! [[select]]
//! index = 3
//! peripheral = "loopback"
//! ```

use std::fs;
use std::path::Path;

use ardudisc_core::chip_select::{DacSelect, CS_COUNT};
use ardudisc_core::identity::Identity;
use ardudisc_core::instrument::InstrumentConfig;
use ardudisc_core::pulser::PulserConfig;
use ardudisc_sim::{DacResolution, Loopback, Mcp48Dac, Peripheral, Silent, SimBoard};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a board file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// File is not valid TOML for a board description
    #[error("failed to parse board file: {0}")]
    Parse(#[from] toml::de::Error),
    /// Values parse but make no sense
    #[error("invalid board file: {0}")]
    Invalid(String),
}

/// What to fit on a chip select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeripheralKind {
    /// 10-bit quad DAC
    Mcp48fvb14,
    /// 12-bit quad DAC
    Mcp48fvb24,
    /// Echoes what it receives
    Loopback,
    /// Nothing fitted
    Silent,
}

impl PeripheralKind {
    /// What the real board has on `select`
    pub fn fitted(select: DacSelect) -> Self {
        match DacResolution::for_select(select) {
            DacResolution::Bits12 => PeripheralKind::Mcp48fvb24,
            DacResolution::Bits10 => PeripheralKind::Mcp48fvb14,
        }
    }

    fn build(self) -> Box<dyn Peripheral> {
        match self {
            PeripheralKind::Mcp48fvb14 => Box::new(Mcp48Dac::new(DacResolution::Bits10)),
            PeripheralKind::Mcp48fvb24 => Box::new(Mcp48Dac::new(DacResolution::Bits12)),
            PeripheralKind::Loopback => Box::new(Loopback),
            PeripheralKind::Silent => Box::new(Silent),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoardFile {
    identity: Option<IdentitySection>,
    pulser: Option<PulserSection>,
    #[serde(default)]
    select: Vec<SelectSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdentitySection {
    vendor: Option<String>,
    model: Option<String>,
    serial: Option<String>,
    firmware: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PulserSection {
    period_us: Option<u32>,
    duty: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectSection {
    index: usize,
    peripheral: PeripheralKind,
}

/// Everything needed to boot an emulated board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Firmware configuration
    pub instrument: InstrumentConfig,
    /// Peripheral on each chip select
    pub peripherals: [PeripheralKind; CS_COUNT],
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            instrument: InstrumentConfig::default(),
            peripherals: DacSelect::ALL.map(PeripheralKind::fitted),
        }
    }
}

impl BoardConfig {
    /// Load a board file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse a board description
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: BoardFile = toml::from_str(text)?;
        let mut config = Self::default();

        if let Some(id) = file.identity {
            let defaults = Identity::default();
            config.instrument.identity = Identity::new(
                id.vendor.as_deref().unwrap_or(defaults.vendor()),
                id.model.as_deref().unwrap_or(defaults.model()),
                id.serial.as_deref().unwrap_or(defaults.serial()),
                id.firmware.as_deref().unwrap_or(defaults.firmware()),
            )
            .map_err(|e| ConfigError::Invalid(format!("identity: {}", e)))?;
        }

        if let Some(pulser) = file.pulser {
            let defaults = PulserConfig::default();
            let pulser = PulserConfig {
                period_us: pulser.period_us.unwrap_or(defaults.period_us),
                duty: pulser.duty.unwrap_or(defaults.duty),
            };
            if pulser.period_us == 0 || pulser.duty > PulserConfig::DUTY_SCALE {
                return Err(ConfigError::Invalid(format!(
                    "pulser period must be non-zero and duty at most {}",
                    PulserConfig::DUTY_SCALE
                )));
            }
            config.instrument.pulser = pulser;
        }

        for select in file.select {
            let slot = config.peripherals.get_mut(select.index).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "chip select {} out of range 0..{}",
                    select.index, CS_COUNT
                ))
            })?;
            *slot = select.peripheral;
        }

        Ok(config)
    }

    /// Put a loopback peripheral on every select
    pub fn with_loopback(mut self) -> Self {
        self.peripherals = [PeripheralKind::Loopback; CS_COUNT];
        self
    }

    /// Build the emulated board
    pub fn build_board(&self) -> SimBoard {
        SimBoard::new(self.peripherals.map(PeripheralKind::build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_real_board() {
        let config = BoardConfig::default();
        assert_eq!(config.peripherals[4], PeripheralKind::Mcp48fvb24);
        assert_eq!(config.peripherals[0], PeripheralKind::Mcp48fvb14);
        let board = config.build_board();
        assert_eq!(board.peripheral_name(4).as_deref(), Some("mcp48fvb24"));
    }

    #[test]
    fn test_parse_full_file() {
        let config = BoardConfig::from_toml_str(
            r##"
            [identity]
            serial = "#07"

            [pulser]
            period_us = 1000
            duty = 256

            [[select]]
            index = 3
            peripheral = "loopback"
            "##,
        )
        .unwrap();

        assert_eq!(
            config.instrument.identity.to_string(),
            "ELB,ARDUDISC,#07,0.0.1"
        );
        assert_eq!(config.instrument.pulser.period_us, 1000);
        assert_eq!(config.instrument.pulser.duty, 256);
        assert_eq!(config.peripherals[3], PeripheralKind::Loopback);
        assert_eq!(config.peripherals[2], PeripheralKind::Mcp48fvb14);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(BoardConfig::from_toml_str("").unwrap(), BoardConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        for text in [
            "[[select]]\nindex = 8\nperipheral = \"silent\"",
            "[[select]]\nindex = 0\nperipheral = \"eeprom\"",
            "[pulser]\nperiod_us = 0",
            "[pulser]\nduty = 2000",
            "[identity]\nvendor = \"A,B\"",
            "[bogus]\nx = 1",
        ] {
            assert!(BoardConfig::from_toml_str(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_loopback_override() {
        let config = BoardConfig::default().with_loopback();
        assert!(config
            .peripherals
            .iter()
            .all(|p| *p == PeripheralKind::Loopback));
    }
}
