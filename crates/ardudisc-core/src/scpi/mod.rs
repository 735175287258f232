//! SCPI-style command parsing and dispatch
//!
//! Only the SCPI syntax is used, not the full standard:
//!
//! - headers are `:`-separated segments such as `SYSTem:SPI:SENd`,
//! - each segment has a mandatory uppercase prefix and an optional lowercase
//!   suffix, matched case-insensitively,
//! - a trailing `?` marks a query,
//! - parameters follow the header after whitespace, separated by commas,
//! - several commands on one line are separated by `;`.
//!
//! Patterns are compiled once at startup into a [`Registry`]. Matching is a
//! segment-by-segment comparison against those tables; nothing is built from
//! strings at runtime.

mod line;
mod parser;
mod pattern;
mod registry;

pub use line::{Feed, LineBuffer, DEFAULT_LINE_CAPACITY};
pub use parser::{parse_int, split_messages, Header, Message, Parameters, MAX_PARAMS};
pub use pattern::{Pattern, Segment, MAX_DEPTH};
pub use registry::{Registry, RegistryBuilder, TableEntry, MAX_COMMANDS};
