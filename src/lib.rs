//! xmlcolor - background XML syntax highlighting
//!
//! This crate provides a restartable highlighting engine for large,
//! frequently-edited XML documents, plus the in-memory surface, themes and
//! configuration used by the `xmlcolor` command-line front end.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod fs_watcher;
pub mod highlight;
pub mod render;
pub mod surface;
pub mod theme;
pub mod tracing;

// Re-export commonly used types
pub use config::HighlightConfig;
pub use highlight::{ColorClass, ColorSpan, HighlightScheduler, Highlighter, ScanProgress};
pub use surface::{StyledBuffer, Surface, SurfacePump, UiHandle};
pub use theme::Theme;
