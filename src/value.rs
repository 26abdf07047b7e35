//! Typed values stored in table cells.
//!
//! A [`Value`] is the unit of data that flows between the parsers, the
//! storage layer and the evaluation engine. Every value has a canonical text
//! form (its [`Display`](fmt::Display) implementation) which is used both for
//! printing results and for encoding primary keys.
//!
//! # Comparison rules
//!
//! - Two `Null`s are equal; `Null` orders before every non-null value.
//! - `Int` and `Double` compare numerically, the integer promoted to `f64`.
//! - `Text` and `Char` compare as strings.
//! - `Date` compares by `(year, month, day)`.
//!
//! Any other pairing is incomparable: `==` is `false` and
//! [`PartialOrd::partial_cmp`] returns `None`, so `<`/`>` are `false` too.
use std::{cmp::Ordering, fmt};

/// Calendar date without validation of the month/day ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Reads a `YYYY-MM-DD` date.
    ///
    /// Returns `None` unless there are exactly three `-` separated numeric
    /// components.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('-');
        let year = parts.next()?.trim().parse().ok()?;
        let month = parts.next()?.trim().parse().ok()?;
        let day = parts.next()?.trim().parse().ok()?;

        if parts.next().is_some() {
            return None;
        }
        Some(Self { year, month, day })
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A single cell value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Double(f64),
    Char(char),
    Date(Date),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Double(_))
    }

    /// Numeric view of the value, promoting integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<TextRef<'_>> {
        match self {
            Self::Text(s) => Some(TextRef::Str(s)),
            Self::Char(c) => Some(TextRef::Char(*c)),
            _ => None,
        }
    }
}

/// Borrowed string view over `Text` and `Char` so the two can be compared
/// without allocating.
enum TextRef<'a> {
    Str(&'a str),
    Char(char),
}

impl TextRef<'_> {
    fn cmp(&self, other: &TextRef<'_>) -> Ordering {
        let mut a = [0; 4];
        let mut b = [0; 4];
        let left: &str = match self {
            TextRef::Str(s) => s,
            TextRef::Char(c) => c.encode_utf8(&mut a),
        };
        let right: &str = match other {
            TextRef::Str(s) => s,
            TextRef::Char(c) => c.encode_utf8(&mut b),
        };
        left.cmp(right)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Equal))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, _) => Some(Ordering::Less),
            (_, Self::Null) => Some(Ordering::Greater),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (a, b) => match (a.as_text(), b.as_text()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d:.2}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
