//! UI-side collaborators of the highlight worker
//!
//! The worker never touches UI-owned state. It talks to the editor through a
//! [`UiHandle`], which posts requests on an mpsc channel; the UI thread drains
//! them with a [`SurfacePump`] and applies them to its [`Surface`].
//!
//! ```text
//! worker ── UiHandle ──(mpsc)──▶ SurfacePump ──▶ Surface (text, styling,
//!   ▲                                 │            progress, status)
//!   └────── reply (text / ack) ───────┘
//! ```
//!
//! Text reads, styling resets and batch applications block the worker until
//! the UI thread has performed them. Progress and status updates are posted
//! without waiting.

mod buffer;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::highlight::{ColorSpan, ScanProgress};

pub use buffer::StyledBuffer;

/// Status text shown while a pass is running
pub const FORMATTING_STATUS: &str = "Formatting...";

/// The editor widget as the highlighter sees it.
///
/// All methods run on the UI thread.
pub trait Surface {
    /// Full document text; called once per highlight pass
    fn text(&self) -> String;

    /// Clear all styling back to the default baseline
    fn reset_styling(&mut self);

    /// Paint each span, in order; later spans win where they overlap
    fn apply_batch(&mut self, spans: &[ColorSpan]);

    /// Show the progress indicator at the given value, or hide it
    fn set_progress(&mut self, progress: Option<ScanProgress>);

    fn status(&self) -> &str;

    fn set_status(&mut self, status: String);

    /// Number of lines, for the completion message
    fn line_count(&self) -> usize;
}

/// The UI side has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("highlight surface has been dropped")]
pub struct Disconnected;

enum UiRequest {
    Text(SyncSender<String>),
    ResetStyling(SyncSender<()>),
    ApplyBatch(Vec<ColorSpan>, SyncSender<()>),
    Progress(ScanProgress),
    Notify(String),
}

/// What the pump did for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    TextRead,
    StylingReset,
    /// Number of spans applied
    BatchApplied(usize),
    Progress(ScanProgress),
    Notified(String),
}

impl SurfaceEvent {
    /// A pass ran to completion
    pub fn is_pass_complete(&self) -> bool {
        matches!(self, SurfaceEvent::Progress(p) if p.is_complete())
    }
}

/// Worker-side handle marshaling every surface call onto the UI thread
#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<UiRequest>,
}

impl UiHandle {
    /// Snapshot of the document text
    pub fn text(&self) -> Result<String, Disconnected> {
        self.request(UiRequest::Text)
    }

    pub fn reset_styling(&self) -> Result<(), Disconnected> {
        self.request(UiRequest::ResetStyling)
    }

    pub fn apply_batch(&self, spans: Vec<ColorSpan>) -> Result<(), Disconnected> {
        self.request(|reply| UiRequest::ApplyBatch(spans, reply))
    }

    pub fn report_progress(&self, progress: ScanProgress) -> Result<(), Disconnected> {
        self.post(UiRequest::Progress(progress))
    }

    /// Show `message` in the status line (used for scan errors)
    pub fn notify(&self, message: impl Into<String>) -> Result<(), Disconnected> {
        self.post(UiRequest::Notify(message.into()))
    }

    fn post(&self, request: UiRequest) -> Result<(), Disconnected> {
        self.tx.send(request).map_err(|_| Disconnected)
    }

    /// Post and block until the UI thread replies
    fn request<T>(&self, make: impl FnOnce(SyncSender<T>) -> UiRequest) -> Result<T, Disconnected> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.post(make(reply_tx))?;
        reply_rx.recv().map_err(|_| Disconnected)
    }
}

/// Create a connected handle/pump pair around `surface`
pub fn channel<S: Surface>(surface: S) -> (UiHandle, SurfacePump<S>) {
    let (tx, rx) = mpsc::channel();
    let pump = SurfacePump {
        rx,
        surface,
        progress_visible: false,
    };
    (UiHandle { tx }, pump)
}

/// UI-thread end of the handoff; owns the surface
pub struct SurfacePump<S> {
    rx: Receiver<UiRequest>,
    surface: S,
    progress_visible: bool,
}

impl<S: Surface> SurfacePump<S> {
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access for edits; remember to tell the highlighter afterwards
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn is_progress_visible(&self) -> bool {
        self.progress_visible
    }

    /// Handle every request already queued, without blocking
    pub fn pump(&mut self) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        while let Ok(request) = self.rx.try_recv() {
            events.push(self.handle(request));
        }
        events
    }

    /// Handle exactly one request, waiting up to `timeout` for it
    pub fn pump_next(&mut self, timeout: Duration) -> Option<SurfaceEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(request) => Some(self.handle(request)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Handle requests until one yields an event matching `stop`, or `timeout` elapses.
    ///
    /// Returns every event handled; the last one matched `stop` unless time ran out.
    pub fn pump_until(
        &mut self,
        timeout: Duration,
        mut stop: impl FnMut(&SurfaceEvent) -> bool,
    ) -> Vec<SurfaceEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return events;
            }
            let Some(event) = self.pump_next(remaining) else {
                return events;
            };
            let done = stop(&event);
            events.push(event);
            if done {
                return events;
            }
        }
    }

    fn handle(&mut self, request: UiRequest) -> SurfaceEvent {
        match request {
            UiRequest::Text(reply) => {
                let _ = reply.send(self.surface.text());
                SurfaceEvent::TextRead
            }
            UiRequest::ResetStyling(reply) => {
                self.surface.reset_styling();
                let _ = reply.send(());
                SurfaceEvent::StylingReset
            }
            UiRequest::ApplyBatch(spans, reply) => {
                self.surface.apply_batch(&spans);
                let _ = reply.send(());
                SurfaceEvent::BatchApplied(spans.len())
            }
            UiRequest::Progress(progress) => {
                self.show_progress(progress);
                SurfaceEvent::Progress(progress)
            }
            UiRequest::Notify(message) => {
                self.surface.set_progress(None);
                self.progress_visible = false;
                self.surface.set_status(message.clone());
                SurfaceEvent::Notified(message)
            }
        }
    }

    /// Show the indicator on the first partial report; hide it at 100%.
    ///
    /// The completion message only replaces the status if it still reads
    /// "Formatting...", so a stale 100% cannot clobber a newer message.
    fn show_progress(&mut self, progress: ScanProgress) {
        if !progress.is_complete() {
            if !self.progress_visible {
                self.surface.set_status(FORMATTING_STATUS.to_string());
                self.progress_visible = true;
            }
            self.surface.set_progress(Some(progress));
            return;
        }

        self.surface.set_progress(None);
        self.progress_visible = false;
        if self.surface.status() == FORMATTING_STATUS {
            let lines = self.surface.line_count();
            self.surface
                .set_status(format!("Done formatting. {} lines", lines));
        }
    }
}
