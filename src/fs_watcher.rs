//! File watching for watch mode
//!
//! Uses the `notify` crate with debouncing to detect changes to the document
//! on disk. The parent directory is watched (non-recursively) so that editors
//! which save by writing a temp file and renaming it are still picked up.

use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

type DebounceResult = Result<Vec<DebouncedEvent>, notify::Error>;

/// Watches one document for modifications
pub struct DocumentWatcher {
    /// The debouncer handles watching and event coalescing
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    /// Receiver for debounced events
    rx: Receiver<DebounceResult>,
    path: PathBuf,
    file_name: OsString,
}

impl DocumentWatcher {
    /// Start watching `path`
    ///
    /// Events are debounced with a 100ms delay; the highlighter applies its
    /// own quiet period on top.
    pub fn new(path: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::generic("watched path has no file name"))?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut debouncer = new_debouncer(Duration::from_millis(100), tx)?;
        debouncer
            .watcher()
            .watch(&parent, notify::RecursiveMode::NonRecursive)?;

        tracing::info!("Watching {} for changes", path.display());

        Ok(Self {
            _debouncer: debouncer,
            rx,
            path: path.to_path_buf(),
            file_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain pending events (non-blocking); true if the document changed
    pub fn poll_changed(&self) -> bool {
        let mut changed = false;

        while let Ok(result) = self.rx.try_recv() {
            match result {
                Ok(events) => {
                    changed |= events.iter().any(|event| {
                        // Continuous events during active writes - wait for the settled one
                        event.kind != DebouncedEventKind::AnyContinuous
                            && self.is_document(&event.path)
                    });
                }
                Err(e) => {
                    tracing::warn!("File watcher error: {:?}", e);
                }
            }
        }

        if changed {
            tracing::debug!("{} changed on disk", self.path.display());
        }
        changed
    }

    fn is_document(&self, path: &Path) -> bool {
        path.file_name() == Some(self.file_name.as_os_str())
    }
}
