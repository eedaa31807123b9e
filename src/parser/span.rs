//! Source location tracking for the bracketed rule syntax

use nom_locate::LocatedSpan;
use std::fmt;

/// Type alias for located spans in the input
pub type Span<'a> = LocatedSpan<&'a str>;

/// Line and column of a point in rule text, both 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column, counted in characters
    pub column: usize,
}

impl Position {
    /// Position where `span` begins
    pub fn of(span: &Span<'_>) -> Self {
        Self {
            line: span.location_line(),
            column: span.get_utf8_column(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
