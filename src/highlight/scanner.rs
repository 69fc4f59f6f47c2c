//! Token-to-span mapping
//!
//! Walks a [`PullParser`] token stream over one snapshot and turns element,
//! attribute and comment tokens into [`ColorSpan`]s. Spans are handed out in
//! batches together with a progress figure, roughly
//! `flushes_per_document` times per document, so the (expensive) display
//! sink is invoked a bounded number of times regardless of document size.

use thiserror::Error;

use super::line_index::{LineIndex, LineIndexError, TextPos};
use super::reader::{DomReader, ParseError, PullParser, XmlAttribute, XmlToken};
use super::span::{ColorClass, ColorSpan, ScanProgress};

/// Tokens between two cancellation polls
pub const DEFAULT_POLL_INTERVAL: usize = 8;
/// Target number of batch flushes per document
pub const DEFAULT_FLUSHES_PER_DOCUMENT: usize = 48;
/// Never flush more often than every this many lines
pub const DEFAULT_MIN_REPORTING_INTERVAL: usize = 4;

/// Tuning knobs for a single scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub poll_interval: usize,
    pub flushes_per_document: usize,
    pub min_reporting_interval: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            flushes_per_document: DEFAULT_FLUSHES_PER_DOCUMENT,
            min_reporting_interval: DEFAULT_MIN_REPORTING_INTERVAL,
        }
    }
}

impl ScanSettings {
    /// Lines between two flushes for a document of `total_lines`
    pub fn reporting_interval(&self, total_lines: usize) -> usize {
        (total_lines / self.flushes_per_document.max(1))
            .max(self.min_reporting_interval)
            .max(1)
    }
}

/// How a scan ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every token was processed and the final batch flushed at 100%
    Completed,
    /// The cancel check fired; the rest of the document was skipped
    Preempted,
    /// The parser cannot report positions, so nothing can be highlighted
    NoPositionInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("{0}")]
    MalformedDocument(#[from] ParseError),
    #[error(transparent)]
    IndexOutOfRange(#[from] LineIndexError),
    #[error("expected {expected} at or after offset {offset}")]
    Misaligned {
        expected: &'static str,
        offset: usize,
    },
}

/// Scan `text` with the bundled [`DomReader`].
///
/// Blank documents are not parsed: they complete immediately at 100%.
pub fn scan<C, E>(
    text: &str,
    index: &LineIndex,
    settings: &ScanSettings,
    cancel: C,
    mut emit: E,
) -> Result<ScanOutcome, ScanError>
where
    C: FnMut() -> bool,
    E: FnMut(Vec<ColorSpan>, ScanProgress),
{
    if text.trim().is_empty() {
        emit(Vec::new(), ScanProgress::COMPLETE);
        return Ok(ScanOutcome::Completed);
    }

    let reader = DomReader::parse(text)?;
    XmlTokenScanner::new(text, index)
        .with_settings(*settings)
        .scan(reader, cancel, emit)
}

/// Maps tokens of one snapshot to spans
pub struct XmlTokenScanner<'a> {
    text: &'a str,
    index: &'a LineIndex,
    settings: ScanSettings,
}

impl<'a> XmlTokenScanner<'a> {
    pub fn new(text: &'a str, index: &'a LineIndex) -> Self {
        Self {
            text,
            index,
            settings: ScanSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Drive `parser` to the end of the document or until `cancel` returns true.
    ///
    /// `emit` receives each batch with the progress reached so far. The first
    /// token always triggers a (possibly empty) flush so the progress indicator
    /// appears promptly.
    pub fn scan<'t, P, C, E>(
        &self,
        parser: P,
        mut cancel: C,
        mut emit: E,
    ) -> Result<ScanOutcome, ScanError>
    where
        P: PullParser<'t>,
        C: FnMut() -> bool,
        E: FnMut(Vec<ColorSpan>, ScanProgress),
    {
        if !parser.has_line_info() {
            tracing::debug!("XML reader reports no line info, skipping highlight pass");
            return Ok(ScanOutcome::NoPositionInfo);
        }

        let total_lines = self.index.line_count();
        let interval = self.settings.reporting_interval(total_lines);
        let poll_interval = self.settings.poll_interval.max(1);

        let mut batch = Vec::new();
        let mut last_bucket: Option<usize> = None;
        let mut progress = ScanProgress::default();

        for (count, token) in parser.enumerate() {
            if count % poll_interval == 0 && cancel() {
                tracing::debug!("Highlight pass preempted after {} tokens", count);
                return Ok(ScanOutcome::Preempted);
            }

            let token = token?;
            let line = token.pos().line;
            let bucket = line / interval;
            if last_bucket.map_or(true, |last| bucket > last) {
                progress = progress.max(ScanProgress::at_line(line, total_lines));
                emit(std::mem::take(&mut batch), progress);
                last_bucket = Some(bucket);
            }

            self.push_spans(&token, &mut batch)?;
        }

        emit(batch, ScanProgress::COMPLETE);
        Ok(ScanOutcome::Completed)
    }

    fn push_spans(&self, token: &XmlToken<'_>, out: &mut Vec<ColorSpan>) -> Result<(), ScanError> {
        match token {
            XmlToken::StartElement {
                name,
                pos,
                attributes,
                empty,
            } => {
                let ix = self.offset_at(*pos)?;
                if ix == 0 {
                    return Err(ScanError::Misaligned {
                        expected: "'<'",
                        offset: ix,
                    });
                }
                push(out, ix - 1, 1, ColorClass::Delimiter);
                push(out, ix, name.len(), ColorClass::ElementName);

                let mut cursor = ix + name.len();
                for attr in attributes {
                    cursor = self.push_attribute(attr, out)?;
                }

                let gt = self.find_from(cursor, '>', "'>'")?;
                if *empty && gt > 0 {
                    push(out, gt - 1, 2, ColorClass::Delimiter);
                } else {
                    push(out, gt, 1, ColorClass::Delimiter);
                }
            }
            XmlToken::EndElement { name, pos } => {
                let ix = self.offset_at(*pos)?;
                if ix < 2 {
                    return Err(ScanError::Misaligned {
                        expected: "'</'",
                        offset: ix,
                    });
                }
                push(out, ix - 2, 2, ColorClass::Delimiter);
                push(out, ix, name.len(), ColorClass::ElementName);
                let gt = self.find_from(ix + name.len(), '>', "'>'")?;
                push(out, gt, 1, ColorClass::Delimiter);
            }
            XmlToken::Comment { body, pos } => {
                let ix = self.offset_at(*pos)?;
                push(out, ix, body.len(), ColorClass::Comment);
            }
            // Attributes are handled with their start tag; text stays unstyled
            XmlToken::Attribute(_)
            | XmlToken::Text { .. }
            | XmlToken::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }

    /// Push name, `=` and value spans; returns the offset just past the closing quote
    fn push_attribute(
        &self,
        attr: &XmlAttribute<'_>,
        out: &mut Vec<ColorSpan>,
    ) -> Result<usize, ScanError> {
        let ix = self.offset_at(attr.pos)?;
        push(out, ix, attr.name.len(), ColorClass::AttributeName);

        let eq = self.find_from(ix + attr.name.len(), '=', "'='")?;
        push(out, eq, 1, ColorClass::Delimiter);

        let value_start = self.find_from(eq + 1, attr.quote, "opening quote")? + 1;
        let value_len = self.value_len(value_start, &attr.value, attr.quote);
        push(out, value_start, value_len, ColorClass::AttributeValue);

        Ok(value_start + value_len + attr.quote.len_utf8())
    }

    /// Width of an attribute value in the source.
    ///
    /// The parser hands out the decoded value, which is shorter than the
    /// source whenever entities were used (`&quot;` decodes to one byte).
    fn value_len(&self, start: usize, decoded: &str, quote: char) -> usize {
        let rest = self.text.get(start..).unwrap_or_default();
        let closes_at = |len: usize| rest.get(len..).is_some_and(|tail| tail.starts_with(quote));

        if rest.starts_with(decoded) && closes_at(decoded.len()) {
            return decoded.len();
        }

        let escaped = escape_attribute_value(decoded, quote);
        if rest.starts_with(&escaped) && closes_at(escaped.len()) {
            return escaped.len();
        }

        // Parser-normalized whitespace or character references: the value
        // cannot contain its own quote unescaped, so the quote ends it.
        rest.find(quote).unwrap_or(decoded.len().min(rest.len()))
    }

    fn offset_at(&self, pos: TextPos) -> Result<usize, ScanError> {
        Ok(self.index.offset_at(pos)?)
    }

    fn find_from(&self, from: usize, needle: char, expected: &'static str) -> Result<usize, ScanError> {
        self.text
            .get(from..)
            .and_then(|rest| rest.find(needle))
            .map(|found| from + found)
            .ok_or(ScanError::Misaligned {
                expected,
                offset: from,
            })
    }
}

/// Zero-length spans carry no styling and are dropped
fn push(out: &mut Vec<ColorSpan>, start: usize, len: usize, class: ColorClass) {
    if len > 0 {
        out.push(ColorSpan::new(start, len, class));
    }
}

/// Re-escape a decoded attribute value the way it is usually written
fn escape_attribute_value(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' if quote == '"' => escaped.push_str("&quot;"),
            '\'' if quote == '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
