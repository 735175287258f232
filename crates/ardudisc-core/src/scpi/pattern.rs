//! Command patterns and segment matching

use core::fmt;

use heapless::Vec;

use super::parser::Header;
use crate::error::{Error, Result};

/// Maximum number of segments in a header or pattern
pub const MAX_DEPTH: usize = 6;

/// One `:`-separated piece of a pattern, e.g. `SENd`
///
/// The mandatory prefix is every character before the first lowercase
/// letter (`SEN`), the optional suffix is the rest (`d`).
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    text: &'static str,
    prefix_len: usize,
}

impl Segment {
    /// Split a segment declaration into prefix and suffix
    pub fn new(text: &'static str) -> Self {
        let prefix_len = text
            .bytes()
            .position(|b| b.is_ascii_lowercase())
            .unwrap_or(text.len());
        Self { text, prefix_len }
    }

    /// The mandatory part, as declared
    pub fn prefix(&self) -> &'static str {
        &self.text[..self.prefix_len]
    }

    /// The optional part, as declared
    pub fn suffix(&self) -> &'static str {
        &self.text[self.prefix_len..]
    }

    /// Check whether a typed segment selects this one
    ///
    /// The input must be at least as long as the prefix and no longer than
    /// prefix plus suffix, and must start with the prefix (ignoring case).
    pub fn matches(&self, input: &str) -> bool {
        let len = input.len();
        len >= self.prefix_len
            && len <= self.text.len()
            && input.is_char_boundary(self.prefix_len)
            && input[..self.prefix_len].eq_ignore_ascii_case(self.prefix())
    }

    fn same_as(&self, other: &Segment) -> bool {
        self.prefix_len == other.prefix_len && self.text.eq_ignore_ascii_case(other.text)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// A compiled command pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    segments: Vec<Segment, MAX_DEPTH>,
    query: bool,
}

impl Pattern {
    /// Compile `pattern`, prefixed by the segments of `base`
    ///
    /// Leading, trailing and doubled `:` in either part are ignored, so
    /// `"SYSTem:SPI"` + `":SENd"` and `"SYSTem:SPI:SENd"` are the same
    /// pattern. A trailing `?` on `pattern` makes it a query.
    pub fn compile(base: &'static str, pattern: &'static str) -> Result<Self> {
        let (pattern, query) = match pattern.strip_suffix('?') {
            Some(stripped) => (stripped, true),
            None => (pattern, false),
        };

        let mut segments = Vec::new();
        for text in base
            .split(':')
            .chain(pattern.split(':'))
            .filter(|s| !s.is_empty())
        {
            segments
                .push(Segment::new(text))
                .map_err(|_| Error::PatternTooDeep)?;
        }

        if segments.is_empty() || segments.iter().any(|s| s.prefix_len == 0) {
            return Err(Error::EmptyPattern);
        }

        Ok(Self { segments, query })
    }

    /// Compiled segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this pattern is the query form (`?`)
    pub fn is_query(&self) -> bool {
        self.query
    }

    /// Check a parsed header against this pattern
    pub fn matches(&self, header: &Header<'_>) -> bool {
        self.query == header.is_query()
            && self.segments.len() == header.segments().len()
            && self
                .segments
                .iter()
                .zip(header.segments())
                .all(|(seg, input)| seg.matches(input))
    }

    /// Whether two patterns are the same exact declaration
    pub fn same_as(&self, other: &Pattern) -> bool {
        self.query == other.query
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a.same_as(b))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{}", seg)?;
        }
        if self.query {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(text: &str) -> Header<'_> {
        Header::parse(text).expect("valid header")
    }

    #[test]
    fn test_segment_split() {
        let seg = Segment::new("SENd");
        assert_eq!(seg.prefix(), "SEN");
        assert_eq!(seg.suffix(), "d");

        let seg = Segment::new("*IDN");
        assert_eq!(seg.prefix(), "*IDN");
        assert_eq!(seg.suffix(), "");
    }

    #[test]
    fn test_segment_length_bounds() {
        let seg = Segment::new("SYSTem");
        assert!(seg.matches("SYST"));
        assert!(seg.matches("syst"));
        assert!(seg.matches("SySt"));
        assert!(seg.matches("system"));
        assert!(seg.matches("SYSTE"));
        assert!(!seg.matches("SYS"));
        assert!(!seg.matches("SYSTEMS"));
        assert!(!seg.matches("SISTem"));
    }

    #[test]
    fn test_suffix_characters_not_compared() {
        // Only the mandatory prefix is checked; the length bound still applies
        let seg = Segment::new("PULser");
        assert!(seg.matches("PULxyz"));
        assert!(!seg.matches("PULxyzw"));
    }

    #[test]
    fn test_compile_with_base() {
        let pattern = Pattern::compile("SYSTem:SPI", ":SENd").unwrap();
        assert_eq!(pattern.segments().len(), 3);
        assert!(!pattern.is_query());
        assert_eq!(std::format!("{}", pattern), "SYSTem:SPI:SENd");

        let flat = Pattern::compile("", "SYSTem:SPI:SENd").unwrap();
        assert!(pattern.same_as(&flat));
    }

    #[test]
    fn test_compile_query() {
        let pattern = Pattern::compile("", "*IDN?").unwrap();
        assert!(pattern.is_query());
        assert_eq!(std::format!("{}", pattern), "*IDN?");
        assert!(pattern.matches(&header("*idn?")));
        assert!(!pattern.matches(&header("*IDN")));
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(Pattern::compile("", "").unwrap_err(), Error::EmptyPattern);
        assert_eq!(Pattern::compile("", "::").unwrap_err(), Error::EmptyPattern);
        assert_eq!(Pattern::compile("", "abc").unwrap_err(), Error::EmptyPattern);
        assert_eq!(
            Pattern::compile("A:B:C:D", ":E:F:G").unwrap_err(),
            Error::PatternTooDeep
        );
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let pattern = Pattern::compile("SYSTem:SPI", ":SENd").unwrap();
        assert!(pattern.matches(&header("SYSTem:SPI:SENd")));
        assert!(pattern.matches(&header("syst:spi:send")));
        assert!(pattern.matches(&header("SYST:SPI:SEN")));
        assert!(pattern.matches(&header(":SYSTEM:SPI:SEND")));
        assert!(!pattern.matches(&header("SYST:SPI")));
        assert!(!pattern.matches(&header("SYST:SPI:SEND:X")));
        assert!(!pattern.matches(&header("SYST:SPI:SEND?")));
    }
}
