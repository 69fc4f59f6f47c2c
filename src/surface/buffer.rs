//! In-memory styled text buffer
//!
//! A [`Surface`] that keeps the document in a rope and the styling as one
//! color class per byte. Used by the command-line front end and the tests.

use std::ops::Range;

use ropey::Rope;

use super::Surface;
use crate::highlight::{ColorClass, ColorSpan, ScanProgress};

#[derive(Debug, Clone, Default)]
pub struct StyledBuffer {
    rope: Rope,
    /// One entry per byte of `rope`
    classes: Vec<Option<ColorClass>>,
    status: String,
    progress: Option<ScanProgress>,
    resets: usize,
    batches: usize,
}

impl StyledBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.set_text(text);
        buffer
    }

    /// Replace the whole document (a load); styling is cleared
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.classes = vec![None; text.len()];
    }

    /// Bring the buffer to `text` by replacing only the changed middle.
    ///
    /// Styling of the unchanged prefix and suffix is kept, so the display does
    /// not flash while the next pass runs.
    pub fn replace_text(&mut self, text: &str) {
        let old = self.rope.to_string();
        let (start, old_end, new_end) = changed_region(&old, text);
        if start == old_end && start == new_end {
            return;
        }
        self.remove(start..old_end);
        self.insert(start, &text[start..new_end]);
    }

    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Insert `text` at byte offset `at` (clamped, snapped to a char boundary).
    ///
    /// Inserted bytes are unstyled; existing styling shifts with its text.
    pub fn insert(&mut self, at: usize, text: &str) {
        let char_idx = self.rope.byte_to_char(at.min(self.rope.len_bytes()));
        let byte_idx = self.rope.char_to_byte(char_idx);
        self.rope.insert(char_idx, text);
        self.classes
            .splice(byte_idx..byte_idx, std::iter::repeat(None).take(text.len()));
    }

    /// Remove the bytes in `range` (clamped, snapped to char boundaries)
    pub fn remove(&mut self, range: Range<usize>) {
        let len = self.rope.len_bytes();
        let start_char = self.rope.byte_to_char(range.start.min(len));
        let end_char = self.rope.byte_to_char(range.end.min(len)).max(start_char);
        let start = self.rope.char_to_byte(start_char);
        let end = self.rope.char_to_byte(end_char);

        self.rope.remove(start_char..end_char);
        self.classes.drain(start..end);
    }

    pub fn class_at(&self, byte: usize) -> Option<ColorClass> {
        self.classes.get(byte).copied().flatten()
    }

    /// Maximal runs of equally-styled bytes, in document order
    pub fn styled_ranges(&self) -> Vec<(Range<usize>, ColorClass)> {
        let mut runs: Vec<(Range<usize>, ColorClass)> = Vec::new();
        for (offset, class) in self.classes.iter().enumerate() {
            let Some(class) = *class else { continue };
            match runs.last_mut() {
                Some((range, last)) if range.end == offset && *last == class => {
                    range.end = offset + 1;
                }
                _ => runs.push((offset..offset + 1, class)),
            }
        }
        runs
    }

    pub fn progress(&self) -> Option<ScanProgress> {
        self.progress
    }

    /// How many times styling was reset (one per highlight pass started)
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// How many batches were applied
    pub fn batch_count(&self) -> usize {
        self.batches
    }
}

/// Byte bounds of the differing middle: `(start, old_end, new_end)`.
///
/// Both ends fall on char boundaries of both strings.
fn changed_region(old: &str, new: &str) -> (usize, usize, usize) {
    let mut start = old
        .bytes()
        .zip(new.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(start) {
        start -= 1;
    }

    let max_suffix = old.len().min(new.len()) - start;
    let mut suffix = old
        .bytes()
        .rev()
        .zip(new.bytes().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(old.len() - suffix) {
        suffix -= 1;
    }

    (start, old.len() - suffix, new.len() - suffix)
}

impl Surface for StyledBuffer {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn reset_styling(&mut self) {
        self.classes.iter_mut().for_each(|c| *c = None);
        self.resets += 1;
    }

    fn apply_batch(&mut self, spans: &[ColorSpan]) {
        let len = self.classes.len();
        for span in spans {
            let end = span.end().min(len);
            let start = span.start.min(end);
            self.classes[start..end]
                .iter_mut()
                .for_each(|c| *c = Some(span.class));
        }
        self.batches += 1;
    }

    fn set_progress(&mut self, progress: Option<ScanProgress>) {
        self.progress = progress;
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }
}
