//! Source positions.
//!
//! Lines are 0-based. Columns count UTF-16 code units, which is what LSP
//! clients expect unless they negotiate otherwise.

use facet::Facet;
use std::fmt::{Display, Formatter};

/// A position in a text document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Facet)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: u32,
    /// Column in UTF-16 code units (0-indexed)
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Facet)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at a position
    pub fn point(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Range on a single line
    pub fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self {
            start: Position::new(line, start),
            end: Position::new(line, end),
        }
    }

    /// Smallest range covering both `self` and `other`
    pub fn cover(self, other: Range) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `position` falls inside this range (end inclusive, so a cursor
    /// right after the last character still counts)
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // 1-indexed for humans
        write!(
            f,
            "{}:{}",
            self.start.line + 1,
            self.start.character + 1
        )
    }
}

/// A range inside a specific document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Facet)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

impl Location {
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }
}

/// UTF-16 column of byte offset `byte` within `line`.
///
/// Offsets past the end of the line clamp to the line length.
pub fn column(line: &str, byte: usize) -> u32 {
    let byte = byte.min(line.len());
    utf16_len(&line[..byte])
}

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// Byte offset in `line` of UTF-16 column `character`, clamped to the line.
pub fn byte_offset(line: &str, character: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= character {
            return idx;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}

/// Split text into lines, accepting both `\n` and `\r\n` endings.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}
