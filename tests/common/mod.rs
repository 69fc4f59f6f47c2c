//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::time::Duration;

use xmlcolor::highlight::{
    scan, ColorSpan, HighlightScheduler, Highlighter, LineIndex, ScanError, ScanOutcome,
    ScanProgress, ScanSettings, SchedulerSettings,
};
use xmlcolor::surface::{self, StyledBuffer, Surface, SurfaceEvent, SurfacePump};

/// Generous upper bound for any single pass in tests
pub const PASS_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of a synchronous scan with everything the sink received
pub struct ScanRun {
    pub outcome: Result<ScanOutcome, ScanError>,
    pub spans: Vec<ColorSpan>,
    pub reports: Vec<ScanProgress>,
}

/// Scan `text` to completion with default settings
pub fn scan_text(text: &str) -> ScanRun {
    scan_with(text, &ScanSettings::default())
}

pub fn scan_with(text: &str, settings: &ScanSettings) -> ScanRun {
    let index = LineIndex::build(text);
    let mut spans = Vec::new();
    let mut reports = Vec::new();
    let outcome = scan(
        text,
        &index,
        settings,
        || false,
        |batch, progress| {
            spans.extend(batch);
            reports.push(progress);
        },
    );
    ScanRun {
        outcome,
        spans,
        reports,
    }
}

/// Spans for `text`, panicking if the scan does not complete
pub fn spans_for(text: &str) -> Vec<ColorSpan> {
    let run = scan_text(text);
    assert_eq!(run.outcome, Ok(ScanOutcome::Completed), "scan of {:?}", text);
    run.spans
}

/// Text covered by each span, paired with its class name
pub fn covered<'a>(text: &'a str, spans: &[ColorSpan]) -> Vec<(&'a str, &'static str)> {
    spans
        .iter()
        .map(|s| (&text[s.range()], s.class.name()))
        .collect()
}

/// What a fresh, uninterrupted pass over `text` leaves in a buffer
pub fn expected_styling(text: &str) -> StyledBuffer {
    let mut buffer = StyledBuffer::from_text(text);
    buffer.reset_styling();
    buffer.apply_batch(&spans_for(text));
    buffer
}

/// A running worker over an in-memory buffer
pub struct Harness {
    pub pump: SurfacePump<StyledBuffer>,
    pub highlighter: Highlighter,
}

impl Harness {
    pub fn spawn(text: &str, quiet_period: Duration) -> Self {
        let settings = SchedulerSettings {
            quiet_period,
            ..SchedulerSettings::default()
        };
        let (ui, pump) = surface::channel(StyledBuffer::from_text(text));
        let highlighter = HighlightScheduler::new(ui, settings)
            .spawn()
            .expect("spawn highlight worker");
        Self { pump, highlighter }
    }

    pub fn buffer(&self) -> &StyledBuffer {
        self.pump.surface()
    }

    /// Edit the text on the UI side and tell the highlighter
    pub fn edit(&mut self, text: &str) {
        self.pump.surface_mut().replace_text(text);
        self.highlighter.text_changed();
    }

    /// Pump until a pass completes or fails
    pub fn finish_pass(&mut self) -> Vec<SurfaceEvent> {
        let events = self.pump.pump_until(PASS_TIMEOUT, |e| {
            e.is_pass_complete() || matches!(e, SurfaceEvent::Notified(_))
        });
        assert!(
            events
                .last()
                .is_some_and(|e| e.is_pass_complete() || matches!(e, SurfaceEvent::Notified(_))),
            "pass did not finish within {:?}",
            PASS_TIMEOUT
        );
        events
    }

    /// Pump whatever arrives during `window`
    pub fn drain_for(&mut self, window: Duration) -> Vec<SurfaceEvent> {
        self.pump.pump_until(window, |_| false)
    }
}

pub fn count(events: &[SurfaceEvent], want: &SurfaceEvent) -> usize {
    events.iter().filter(|e| *e == want).count()
}

pub fn completions(events: &[SurfaceEvent]) -> usize {
    events.iter().filter(|e| e.is_pass_complete()).count()
}

/// A document of `elements` lines, each a self-closing element with attributes
pub fn large_document(elements: usize) -> String {
    let mut doc = String::from("<?xml version=\"1.0\"?>\n<catalog>\n");
    for i in 0..elements {
        doc.push_str(&format!(
            "  <item id=\"{i}\" name='n&amp;{i}'><!-- #{i} --><v>{i}</v></item>\n"
        ));
    }
    doc.push_str("</catalog>\n");
    doc
}
