//! Styling instructions produced by the scanner
//!
//! Defines color classes, spans, and scan progress.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// What a highlighted range represents; themes map each class to a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorClass {
    /// `<`, `>`, `/>`, `</` and the `=` between attribute name and value
    Delimiter,
    /// Element name in start and end tags
    ElementName,
    /// Attribute name
    AttributeName,
    /// Attribute value, without its quotes
    AttributeValue,
    /// Comment body
    Comment,
}

impl ColorClass {
    pub const ALL: [ColorClass; 5] = [
        ColorClass::Delimiter,
        ColorClass::ElementName,
        ColorClass::AttributeName,
        ColorClass::AttributeValue,
        ColorClass::Comment,
    ];

    /// Stable name used in theme files
    pub fn name(self) -> &'static str {
        match self {
            ColorClass::Delimiter => "delimiter",
            ColorClass::ElementName => "element-name",
            ColorClass::AttributeName => "attribute-name",
            ColorClass::AttributeValue => "attribute-value",
            ColorClass::Comment => "comment",
        }
    }
}

/// A single styling instruction: paint `len` bytes from `start` with `class`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorSpan {
    /// Byte offset into the snapshot
    pub start: usize,
    /// Length in bytes, always > 0
    pub len: usize,
    pub class: ColorClass,
}

impl ColorSpan {
    pub const fn new(start: usize, len: usize, class: ColorClass) -> Self {
        Self { start, len, class }
    }

    /// Exclusive end offset
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Percentage of the document scanned so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScanProgress(u8);

impl ScanProgress {
    pub const COMPLETE: ScanProgress = ScanProgress(100);

    /// Clamps to 100
    pub fn new(percent: u8) -> Self {
        Self(percent.min(100))
    }

    /// Progress of an in-flight scan at `line` of `total_lines`.
    ///
    /// Capped at 99: only a finished scan reports 100.
    pub fn at_line(line: usize, total_lines: usize) -> Self {
        if total_lines == 0 {
            return Self(0);
        }
        let percent = line.saturating_mul(100) / total_lines;
        Self(percent.min(99) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}
