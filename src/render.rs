//! Terminal and JSON output of a highlighted buffer

use std::fmt::Write;

use serde::Serialize;

use crate::highlight::ColorClass;
use crate::surface::{StyledBuffer, Surface};
use crate::theme::Theme;

const RESET: &str = "\x1b[0m";

/// Clear screen and home the cursor (watch mode redraws)
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Render the buffer with 24-bit foreground colors
pub fn render_ansi(buffer: &StyledBuffer, theme: &Theme) -> String {
    let text = buffer.text();
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    let mut current: Option<ColorClass> = None;

    for (offset, ch) in text.char_indices() {
        let class = buffer.class_at(offset);
        if class != current {
            if current.is_some() {
                out.push_str(RESET);
            }
            if let Some(color) = class.and_then(|c| theme.color(c)) {
                let _ = write!(out, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b);
            }
            current = class;
        }
        out.push(ch);
    }

    if current.is_some() {
        out.push_str(RESET);
    }
    out
}

/// One styled run in JSON output
#[derive(Debug, Serialize)]
pub struct StyledRange<'a> {
    pub start: usize,
    pub end: usize,
    pub class: ColorClass,
    pub text: &'a str,
}

/// Styled runs as a pretty-printed JSON array
pub fn render_json(buffer: &StyledBuffer) -> Result<String, serde_json::Error> {
    let text = buffer.text();
    let ranges: Vec<StyledRange<'_>> = buffer
        .styled_ranges()
        .into_iter()
        .filter_map(|(range, class)| {
            Some(StyledRange {
                start: range.start,
                end: range.end,
                class,
                text: text.get(range)?,
            })
        })
        .collect();
    serde_json::to_string_pretty(&ranges)
}
