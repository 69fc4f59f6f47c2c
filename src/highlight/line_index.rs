//! Line start table for a text snapshot
//!
//! The XML reader reports (line, column) for each token. Re-scanning the text
//! to turn those into flat offsets would cost O(document) per token, so the
//! table is built once per snapshot and queried in O(1).

use thiserror::Error;

/// A 1-based (line, column) position as reported by the XML reader.
///
/// Columns count bytes, so `column - 1` is the byte distance from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPos {
    pub line: usize,
    pub column: usize,
}

impl TextPos {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineIndexError {
    #[error("line {line} is outside the document ({line_count} lines)")]
    OutOfRange { line: usize, line_count: usize },
    #[error("position {line}:{column} lies past the end of the document ({len} bytes)")]
    PastEnd {
        line: usize,
        column: usize,
        len: usize,
    },
}

/// Maps 1-based line numbers to the byte offset where each line begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// `starts[n]` is the offset of line `n + 1`; `starts[0]` is always 0
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the table in a single pass over `text`
    pub fn build(text: &str) -> Self {
        let mut starts = Vec::with_capacity(text.len() / 32 + 1);
        starts.push(0);
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            starts,
            len: text.len(),
        }
    }

    /// Number of lines, counting a trailing empty line after a final newline
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Offset of the first byte of 1-based `line`
    pub fn offset_of_line(&self, line: usize) -> Result<usize, LineIndexError> {
        line.checked_sub(1)
            .and_then(|idx| self.starts.get(idx).copied())
            .ok_or(LineIndexError::OutOfRange {
                line,
                line_count: self.line_count(),
            })
    }

    /// Flat offset of a reader position: line start + column - 1
    pub fn offset_at(&self, pos: TextPos) -> Result<usize, LineIndexError> {
        let line_start = self.offset_of_line(pos.line)?;
        let offset = line_start + pos.column.saturating_sub(1);
        if pos.column == 0 || offset > self.len {
            return Err(LineIndexError::PastEnd {
                line: pos.line,
                column: pos.column,
                len: self.len,
            });
        }
        Ok(offset)
    }
}
