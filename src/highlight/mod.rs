//! Restartable XML highlighting engine
//!
//! Re-highlights a large, frequently-edited XML document on a background
//! thread without blocking the editor:
//! - Line index turning reader (line, column) positions into offsets
//! - Token scanner mapping elements, attributes and comments to color spans
//! - Cancel-and-restart scheduler with edit debouncing
//!
//! ## Architecture
//!
//! ```text
//! edit / load → Highlighter → RestartSignal → worker wakes → debounce (650ms)
//!             → snapshot text (UiHandle) → LineIndex → XmlTokenScanner
//!             → batches + progress (UiHandle) → SurfacePump on the UI thread
//! ```
//!
//! A newer edit sets the signal again; the scanner polls it every few tokens
//! and abandons the pass, and the loop starts over on the latest text.

mod line_index;
mod reader;
mod scanner;
mod scheduler;
mod signal;
mod span;

pub use line_index::{LineIndex, LineIndexError, TextPos};
pub use reader::{DomReader, ParseError, PullParser, XmlAttribute, XmlToken};
pub use scanner::{
    scan, ScanError, ScanOutcome, ScanSettings, XmlTokenScanner, DEFAULT_FLUSHES_PER_DOCUMENT,
    DEFAULT_MIN_REPORTING_INTERVAL, DEFAULT_POLL_INTERVAL,
};
pub use scheduler::{
    EditClock, HighlightScheduler, Highlighter, SchedulerSettings, SchedulerState,
    DEFAULT_QUIET_PERIOD, WORKER_THREAD_NAME,
};
pub use signal::RestartSignal;
pub use span::{ColorClass, ColorSpan, ScanProgress};
