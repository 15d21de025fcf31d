// this_file: crates/core/src/location.rs

//! Source location metadata attached to events for diagnostics only.
//!
//! A [`Location`] never affects parse outcome — two otherwise-identical
//! event streams that differ only in their locations parse to the same
//! result. It exists purely so that [`crate::error::SpacTraceElement`] can
//! point a human at the right place in the source.

/// An optional bag of source-position fields.
///
/// All fields are optional because not every token source can supply all of
/// them (a pre-tokenized in-memory event list typically has none; a
/// line-oriented tokenizer has `line`/`column` but not `char_offset`, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Location {
    /// 1-based line number.
    pub line: Option<usize>,
    /// 1-based column number.
    pub column: Option<usize>,
    /// 0-based character offset from the start of the input.
    pub char_offset: Option<usize>,
}

impl Location {
    /// A location with no information at all.
    pub const UNKNOWN: Location = Location {
        line: None,
        column: None,
        char_offset: None,
    };

    /// Builds a location from a line/column pair.
    pub fn at(line: usize, column: usize) -> Self {
        Location {
            line: Some(line),
            column: Some(column),
            char_offset: None,
        }
    }

    /// Builds a location from a raw character offset.
    pub fn at_offset(char_offset: usize) -> Self {
        Location {
            line: None,
            column: None,
            char_offset: Some(char_offset),
        }
    }

    /// True if none of the fields carry information.
    pub fn is_unknown(&self) -> bool {
        self.line.is_none() && self.column.is_none() && self.char_offset.is_none()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column, self.char_offset) {
            (Some(line), Some(col), _) => write!(f, "{line}:{col}"),
            (None, None, Some(off)) => write!(f, "offset {off}"),
            _ => write!(f, "<unknown location>"),
        }
    }
}
