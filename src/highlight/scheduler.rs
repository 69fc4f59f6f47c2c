//! Background highlight loop
//!
//! One dedicated worker thread runs [`HighlightScheduler::run`] for the life
//! of the host. The editor only ever talks to it through a [`Highlighter`]
//! (to request work) and the surface channel (to receive results).
//!
//! ```text
//!            ┌──────────────────────── error ───────────────────────┐
//!            ▼                                                      │
//!  WaitingForWork ──signal──▶ Debouncing ──quiet──▶ Scanning ──done──┘
//!            ▲                    │  ▲                  │
//!            └── still typing ────┘  └──── preempted ───┘
//! ```

use std::cell::Cell;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::line_index::LineIndex;
use super::scanner::{self, ScanError, ScanOutcome, ScanSettings};
use super::signal::RestartSignal;
use crate::surface::{Disconnected, UiHandle};

/// Wait this long after the last keystroke before scanning
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(650);

/// Name of the worker thread
pub const WORKER_THREAD_NAME: &str = "xml-highlighter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub quiet_period: Duration,
    pub scan: ScanSettings,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            scan: ScanSettings::default(),
        }
    }
}

/// Loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    WaitingForWork,
    Debouncing,
    Scanning,
}

/// Time of the most recent user edit, shared with the editor
#[derive(Debug, Default)]
pub struct EditClock {
    last_edit: Mutex<Option<Instant>>,
}

impl EditClock {
    pub fn record(&self) {
        *self.last_edit.lock() = Some(Instant::now());
    }

    pub fn last_edit(&self) -> Option<Instant> {
        *self.last_edit.lock()
    }

    /// True when an edit happened less than `quiet_period` ago
    fn is_typing(&self, quiet_period: Duration) -> bool {
        self.last_edit()
            .is_some_and(|last| last.elapsed() < quiet_period)
    }
}

/// Editor-side handle: report edits and loads to the worker
#[derive(Debug, Clone)]
pub struct Highlighter {
    signal: Arc<RestartSignal>,
    edits: Arc<EditClock>,
}

impl Highlighter {
    /// The user changed the text; the pass waits for typing to pause
    pub fn text_changed(&self) {
        self.edits.record();
        self.signal.set();
    }

    /// A document was loaded or reloaded; highlight without debouncing
    /// unless the user has also typed recently
    pub fn document_loaded(&self) {
        self.signal.set();
    }

    pub fn signal(&self) -> &Arc<RestartSignal> {
        &self.signal
    }
}

/// Why a pass ended
enum PassEnd {
    Finished(ScanOutcome),
    Failed(ScanError),
}

pub struct HighlightScheduler {
    ui: UiHandle,
    signal: Arc<RestartSignal>,
    edits: Arc<EditClock>,
    settings: SchedulerSettings,
}

impl HighlightScheduler {
    pub fn new(ui: UiHandle, settings: SchedulerSettings) -> Self {
        Self {
            ui,
            signal: Arc::new(RestartSignal::new()),
            edits: Arc::new(EditClock::default()),
            settings,
        }
    }

    /// Handle for the editor side; may be taken before or after spawning
    pub fn highlighter(&self) -> Highlighter {
        Highlighter {
            signal: Arc::clone(&self.signal),
            edits: Arc::clone(&self.edits),
        }
    }

    /// Start the worker thread; it is never joined
    pub fn spawn(self) -> std::io::Result<Highlighter> {
        let highlighter = self.highlighter();
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run())?;
        Ok(highlighter)
    }

    /// The worker loop. Returns only once the surface side has been dropped.
    pub fn run(self) {
        tracing::debug!(
            "Highlight worker started (quiet period {:?})",
            self.settings.quiet_period
        );

        let mut state = SchedulerState::WaitingForWork;
        loop {
            let next = match state {
                SchedulerState::WaitingForWork => {
                    self.signal.wait_and_clear();
                    SchedulerState::Debouncing
                }
                SchedulerState::Debouncing => {
                    if self.settle() {
                        SchedulerState::Scanning
                    } else {
                        tracing::trace!("Edit still in progress, abandoning pass");
                        SchedulerState::WaitingForWork
                    }
                }
                SchedulerState::Scanning => match self.run_pass() {
                    Ok(PassEnd::Finished(ScanOutcome::Preempted)) => SchedulerState::Debouncing,
                    Ok(PassEnd::Finished(_)) => SchedulerState::WaitingForWork,
                    Ok(PassEnd::Failed(err)) => {
                        tracing::warn!("Highlight pass failed: {}", err);
                        if self.ui.notify(err.to_string()).is_err() {
                            break;
                        }
                        SchedulerState::WaitingForWork
                    }
                    Err(Disconnected) => break,
                },
            };
            tracing::trace!("Highlight worker {:?} -> {:?}", state, next);
            state = next;
        }

        tracing::debug!("Highlight surface dropped, worker exiting");
    }

    /// Debounce: returns false if the user kept typing through the quiet period
    fn settle(&self) -> bool {
        let quiet = self.settings.quiet_period;
        if !self.edits.is_typing(quiet) {
            return true;
        }
        thread::sleep(quiet);
        !self.edits.is_typing(quiet)
    }

    /// One snapshot, one index, one scan
    fn run_pass(&self) -> Result<PassEnd, Disconnected> {
        let started = Instant::now();
        let text = self.ui.text()?;
        let index = LineIndex::build(&text);
        self.ui.reset_styling()?;

        let disconnected = Cell::new(false);
        let result = scanner::scan(
            &text,
            &index,
            &self.settings.scan,
            || disconnected.get() || self.signal.try_consume(Duration::ZERO),
            |spans, progress| {
                if disconnected.get() {
                    return;
                }
                let flushed = if spans.is_empty() {
                    Ok(())
                } else {
                    self.ui.apply_batch(spans)
                };
                if flushed.and_then(|_| self.ui.report_progress(progress)).is_err() {
                    disconnected.set(true);
                }
            },
        );

        if disconnected.get() {
            return Err(Disconnected);
        }

        match result {
            Ok(outcome) => {
                tracing::debug!(
                    "Highlight pass {:?}: {} bytes, {} lines in {:?}",
                    outcome,
                    text.len(),
                    index.line_count(),
                    started.elapsed()
                );
                Ok(PassEnd::Finished(outcome))
            }
            Err(err) => Ok(PassEnd::Failed(err)),
        }
    }
}
