//! Tokenizing command lines into header and parameters

use heapless::Vec;

use super::pattern::MAX_DEPTH;

/// Maximum number of parameters kept per command; extra ones are dropped
pub const MAX_PARAMS: usize = 8;

/// Split a line into its `;`-separated message units
///
/// Empty units (`;;`, trailing `;`) are skipped.
pub fn split_messages(line: &str) -> impl Iterator<Item = &str> {
    line.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// The command header as typed, split into segments
#[derive(Debug, Clone)]
pub struct Header<'a> {
    segments: Vec<&'a str, MAX_DEPTH>,
    query: bool,
}

impl<'a> Header<'a> {
    /// Parse a header such as `SYST:SPI:SEN` or `*IDN?`
    ///
    /// Returns `None` for headers no pattern could match: empty segments or
    /// more segments than any pattern can have.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.strip_prefix(':').unwrap_or(text);
        let (text, query) = match text.strip_suffix('?') {
            Some(stripped) => (stripped, true),
            None => (text, false),
        };

        let mut segments = Vec::new();
        for seg in text.split(':') {
            if seg.is_empty() {
                return None;
            }
            segments.push(seg).ok()?;
        }

        Some(Self { segments, query })
    }

    /// Segments as typed by the caller
    pub fn segments(&self) -> &[&'a str] {
        &self.segments
    }

    /// The final segment, e.g. `ENA` in `SYST:PUL:ENA`
    pub fn last(&self) -> &'a str {
        self.segments.last().copied().unwrap_or("")
    }

    /// Whether the header ended in `?`
    pub fn is_query(&self) -> bool {
        self.query
    }
}

/// Raw comma-separated parameter strings
///
/// Parameters are not interpreted here. Handlers convert them, typically
/// with [`Parameters::int`].
#[derive(Debug, Clone, Default)]
pub struct Parameters<'a> {
    items: Vec<&'a str, MAX_PARAMS>,
}

impl<'a> Parameters<'a> {
    /// Split parameter text on commas, trimming whitespace around each one
    pub fn parse(text: &'a str) -> Self {
        let mut items = Vec::new();
        let text = text.trim();
        if !text.is_empty() {
            for item in text.split(',') {
                if items.push(item.trim()).is_err() {
                    log::warn!("scpi: dropping parameters beyond {}", MAX_PARAMS);
                    break;
                }
            }
        }
        Self { items }
    }

    /// Parameter at `index`, if present
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.items.get(index).copied()
    }

    /// Parameter at `index` as an integer; missing or unparsable reads as 0
    pub fn int(&self, index: usize) -> i64 {
        self.get(index).map(parse_int).unwrap_or(0)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the raw parameter strings
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.items.iter().copied()
    }
}

/// One command: header plus parameters
#[derive(Debug, Clone)]
pub struct Message<'a> {
    /// Parsed header
    pub header: Header<'a>,
    /// Raw parameters
    pub params: Parameters<'a>,
}

impl<'a> Message<'a> {
    /// Split a message unit on the first whitespace run into header and
    /// parameter text
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        let (header, rest) = match text.find(|c: char| c.is_ascii_whitespace()) {
            Some(pos) => (&text[..pos], &text[pos..]),
            None => (text, ""),
        };

        Some(Self {
            header: Header::parse(header)?,
            params: Parameters::parse(rest),
        })
    }
}

/// Parse an integer the way C's `strtol(s, NULL, 0)` does
///
/// Leading whitespace and a sign are accepted; `0x`/`0X` selects hex, a
/// leading `0` octal, anything else decimal. Parsing stops at the first
/// character that is not a digit of the base. No digits at all yields 0,
/// and overflow saturates.
pub fn parse_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let bytes = s.as_bytes();
    let (radix, digits) = if bytes.len() > 2
        && bytes[0] == b'0'
        && (bytes[1] | 0x20) == b'x'
        && bytes[2].is_ascii_hexdigit()
    {
        (16, &s[2..])
    } else if bytes.first() == Some(&b'0') {
        (8, s)
    } else {
        (10, s)
    };

    let mut value: i64 = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        value = value.saturating_mul(radix as i64).saturating_add(digit as i64);
    }

    if negative {
        value.saturating_neg()
    } else {
        value
    }
}
