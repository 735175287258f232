//! Instrument identification
//!
//! The identity line `<vendor>,<model>,<serial>,<firmware>` answers `*IDN?`
//! and is also sent unprompted at startup, so a host can tell what it just
//! connected to.

use core::cmp::Ordering;
use core::fmt;

use heapless::String;

use crate::error::{Error, Result};

/// Capacity of each identification field
pub const FIELD_CAPACITY: usize = 24;

/// Firmware version reported by this build
pub const FIRMWARE_VERSION: &str = "0.0.1";

/// Oldest firmware the host tools work with
pub const MINIMUM_FIRMWARE_VERSION: FirmwareVersion = FirmwareVersion::new(0, 0, 1);

/// Vendor string of genuine boards
pub const VENDOR: &str = "ELB";

/// Model string of genuine boards
pub const MODEL: &str = "ARDUDISC";

/// Parsed identification line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    vendor: String<FIELD_CAPACITY>,
    model: String<FIELD_CAPACITY>,
    serial: String<FIELD_CAPACITY>,
    firmware: String<FIELD_CAPACITY>,
}

fn field(text: &str) -> Result<String<FIELD_CAPACITY>> {
    if text.contains(',') {
        return Err(Error::InvalidField);
    }
    let mut s = String::new();
    s.push_str(text).map_err(|_| Error::FieldTooLong)?;
    Ok(s)
}

impl Identity {
    /// Build an identity from its four fields
    ///
    /// Fields must fit [`FIELD_CAPACITY`] and must not contain commas.
    pub fn new(vendor: &str, model: &str, serial: &str, firmware: &str) -> Result<Self> {
        Ok(Self {
            vendor: field(vendor)?,
            model: field(model)?,
            serial: field(serial)?,
            firmware: field(firmware)?,
        })
    }

    /// Parse an identification line; surrounding whitespace is ignored
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.trim().split(',');
        let vendor = parts.next()?;
        let model = parts.next()?;
        let serial = parts.next()?;
        let firmware = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(vendor, model, serial, firmware).ok()
    }

    /// Vendor field
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Model field
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Serial number field
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Firmware version field, as reported
    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    /// Firmware version, if it has the `major.minor.patch` form
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        FirmwareVersion::parse(&self.firmware)
    }

    /// Whether this identifies a board the host tools can drive
    pub fn is_compatible(&self) -> bool {
        self.vendor == VENDOR
            && self.model == MODEL
            && self
                .firmware_version()
                .is_some_and(|v| v >= MINIMUM_FIRMWARE_VERSION)
    }
}

impl Default for Identity {
    /// `ELB,ARDUDISC,#00,<firmware version>`
    fn default() -> Self {
        let mut vendor = String::new();
        let mut model = String::new();
        let mut serial = String::new();
        let mut firmware = String::new();
        // All fit well within FIELD_CAPACITY
        let _ = vendor.push_str(VENDOR);
        let _ = model.push_str(MODEL);
        let _ = serial.push_str("#00");
        let _ = firmware.push_str(FIRMWARE_VERSION);
        Self {
            vendor,
            model,
            serial,
            firmware,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.vendor, self.model, self.serial, self.firmware
        )
    }
}

/// A `major.minor.patch` firmware version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirmwareVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Patch version
    pub patch: u16,
}

impl FirmwareVersion {
    /// Create a version
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse exactly three dot-separated decimal numbers
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let mut next = || -> Option<u16> {
            let part = parts.next()?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse().ok()
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return None;
        }
        Some(version)
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_line() {
        assert_eq!(
            std::format!("{}", Identity::default()),
            "ELB,ARDUDISC,#00,0.0.1"
        );
        assert!(Identity::default().is_compatible());
    }

    #[test]
    fn test_parse_round_trip() {
        let id = Identity::parse("ELB,ARDUDISC,#00,0.0.1\r\n").unwrap();
        assert_eq!(id.vendor(), "ELB");
        assert_eq!(id.model(), "ARDUDISC");
        assert_eq!(id.serial(), "#00");
        assert_eq!(id.firmware_version(), Some(FirmwareVersion::new(0, 0, 1)));
        assert_eq!(id, Identity::default());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(Identity::parse("ELB,ARDUDISC,#00").is_none());
        assert!(Identity::parse("ELB,ARDUDISC,#00,0.0.1,extra").is_none());
        assert!(Identity::parse("").is_none());
    }

    #[test]
    fn test_compatibility() {
        let check = |line: &str| Identity::parse(line).unwrap().is_compatible();
        assert!(check("ELB,ARDUDISC,#07,0.1.0"));
        assert!(!check("ACME,ARDUDISC,#00,0.0.1"));
        assert!(!check("ELB,OTHER,#00,0.0.1"));
        assert!(!check("ELB,ARDUDISC,#00,0.0.0"));
        assert!(!check("ELB,ARDUDISC,#00,v1"));
    }

    #[test]
    fn test_version_ordering() {
        let v = |s| FirmwareVersion::parse(s).unwrap();
        assert!(v("0.0.2") > v("0.0.1"));
        assert!(v("0.10.0") > v("0.9.9"));
        assert!(v("1.0.0") > v("0.99.99"));
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert!(FirmwareVersion::parse("1.2").is_none());
        assert!(FirmwareVersion::parse("1.2.3.4").is_none());
        assert!(FirmwareVersion::parse("1.-2.3").is_none());
    }

    #[test]
    fn test_new_rejects_bad_fields() {
        assert_eq!(
            Identity::new("A,B", "M", "S", "F").unwrap_err(),
            Error::InvalidField
        );
        let long = "X".repeat(FIELD_CAPACITY + 1);
        assert_eq!(
            Identity::new(&long, "M", "S", "F").unwrap_err(),
            Error::FieldTooLong
        );
        let full = "X".repeat(FIELD_CAPACITY);
        assert!(Identity::new(&full, &full, &full, &full).is_ok());
    }
}
