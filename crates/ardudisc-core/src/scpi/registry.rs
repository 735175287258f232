//! Command registry: compiled patterns mapped to command tags

use heapless::Vec;

use super::parser::Header;
use super::pattern::Pattern;
use crate::error::{Error, Result};

/// Maximum number of registered patterns
pub const MAX_COMMANDS: usize = 16;

/// One line of a declarative command table
///
/// A table is read top to bottom: `TreeBase` sets the prefix for the
/// `Command` entries after it, until the next `TreeBase`.
#[derive(Debug, Clone, Copy)]
pub enum TableEntry<C> {
    /// Set the tree base for the following commands (`""` resets it)
    TreeBase(&'static str),
    /// Register a pattern for a command tag
    Command(&'static str, C),
}

/// Builds a [`Registry`] one registration at a time
#[derive(Debug)]
pub struct RegistryBuilder<C> {
    base: &'static str,
    entries: Vec<(Pattern, C), MAX_COMMANDS>,
}

impl<C: Copy> RegistryBuilder<C> {
    /// Start with an empty registry and no tree base
    pub fn new() -> Self {
        Self {
            base: "",
            entries: Vec::new(),
        }
    }

    /// Prefix all following registrations with `base`
    pub fn set_tree_base(&mut self, base: &'static str) -> &mut Self {
        self.base = base;
        self
    }

    /// Register `pattern` (below the current tree base) for `command`
    pub fn register(&mut self, pattern: &'static str, command: C) -> Result<&mut Self> {
        let compiled = Pattern::compile(self.base, pattern)?;
        if self.entries.iter().any(|(p, _)| p.same_as(&compiled)) {
            return Err(Error::DuplicatePattern);
        }
        log::debug!("scpi: registered {}", compiled);
        self.entries
            .push((compiled, command))
            .map_err(|_| Error::RegistryFull)?;
        Ok(self)
    }

    /// Finish building
    pub fn build(self) -> Registry<C> {
        Registry {
            entries: self.entries,
        }
    }
}

impl<C: Copy> Default for RegistryBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable pattern table used for dispatch
#[derive(Debug)]
pub struct Registry<C> {
    entries: Vec<(Pattern, C), MAX_COMMANDS>,
}

impl<C: Copy> Registry<C> {
    /// Compile a declarative table
    pub fn from_table(table: &[TableEntry<C>]) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        for entry in table {
            match *entry {
                TableEntry::TreeBase(base) => {
                    builder.set_tree_base(base);
                }
                TableEntry::Command(pattern, command) => {
                    builder.register(pattern, command)?;
                }
            }
        }
        Ok(builder.build())
    }

    /// Find the command for a header
    ///
    /// If several patterns match, the one registered first wins.
    pub fn lookup(&self, header: &Header<'_>) -> Option<C> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(header))
            .map(|(_, command)| *command)
    }

    /// Registered patterns in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.entries.iter().map(|(pattern, _)| pattern)
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Cmd {
        Idn,
        Send,
        Pulse,
        Other,
    }

    const TABLE: &[TableEntry<Cmd>] = &[
        TableEntry::Command("*IDN?", Cmd::Idn),
        TableEntry::TreeBase("SYSTem:SPI"),
        TableEntry::Command(":SENd", Cmd::Send),
        TableEntry::TreeBase("SYSTem:PULser"),
        TableEntry::Command(":DISable", Cmd::Pulse),
        TableEntry::Command(":ENAble", Cmd::Pulse),
    ];

    fn lookup(registry: &Registry<Cmd>, text: &str) -> Option<Cmd> {
        registry.lookup(&Header::parse(text)?)
    }

    #[test]
    fn test_table_lookup() {
        let registry = Registry::from_table(TABLE).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(lookup(&registry, "*IDN?"), Some(Cmd::Idn));
        assert_eq!(lookup(&registry, "syst:spi:send"), Some(Cmd::Send));
        assert_eq!(lookup(&registry, "SYSTem:SPI:SENd"), Some(Cmd::Send));
        assert_eq!(lookup(&registry, "SYST:PUL:ENA"), Some(Cmd::Pulse));
        assert_eq!(lookup(&registry, "system:pulser:disable"), Some(Cmd::Pulse));
        assert_eq!(lookup(&registry, "FOO:BAR"), None);
        assert_eq!(lookup(&registry, "SENd"), None);
    }

    #[test]
    fn test_tree_base_is_registration_only() {
        let mut builder = RegistryBuilder::new();
        builder.set_tree_base("SYSTem:SPI");
        builder.register(":SENd", Cmd::Send).unwrap();
        builder.set_tree_base("");
        builder.register("SENd", Cmd::Other).unwrap();
        let registry = builder.build();

        // The base does not leak into matching: a bare SEND hits the second
        // registration, the full path hits the first
        assert_eq!(lookup(&registry, "SEND"), Some(Cmd::Other));
        assert_eq!(lookup(&registry, "SYST:SPI:SEND"), Some(Cmd::Send));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register("SYSTem:SPI:SENd", Cmd::Send).unwrap();
        builder.set_tree_base("SYSTem:SPI");
        assert_eq!(
            builder.register("SENd", Cmd::Other).unwrap_err(),
            Error::DuplicatePattern
        );
        // Query form is a different pattern
        builder.register("SENd?", Cmd::Other).unwrap();
    }

    #[test]
    fn test_first_registered_wins() {
        let mut builder = RegistryBuilder::new();
        builder.register("MEASure", Cmd::Send).unwrap();
        builder.register("MEASurement", Cmd::Other).unwrap();
        let registry = builder.build();

        // "MEAS" fits both patterns
        assert_eq!(lookup(&registry, "MEAS"), Some(Cmd::Send));
        assert_eq!(lookup(&registry, "MEASUREMENT"), Some(Cmd::Other));
    }

    #[test]
    fn test_registry_full() {
        const NAMES: [&str; MAX_COMMANDS + 1] = [
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
        ];
        let mut builder = RegistryBuilder::new();
        for name in &NAMES[..MAX_COMMANDS] {
            builder.register(*name, Cmd::Other).unwrap();
        }
        assert_eq!(
            builder.register(NAMES[MAX_COMMANDS], Cmd::Other).unwrap_err(),
            Error::RegistryFull
        );
    }
}
