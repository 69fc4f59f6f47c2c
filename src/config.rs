//! Highlighter configuration persistence
//!
//! Stores user preferences in `~/.config/xmlcolor/config.yaml`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::highlight::{
    ScanSettings, SchedulerSettings, DEFAULT_FLUSHES_PER_DOCUMENT, DEFAULT_MIN_REPORTING_INTERVAL,
    DEFAULT_POLL_INTERVAL, DEFAULT_QUIET_PERIOD,
};

/// Highlighter configuration that persists across sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Selected theme id (e.g., "classic", "dark")
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Milliseconds without edits before a pass starts
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Tokens between cancellation checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval: usize,

    /// Target number of batch flushes per document
    #[serde(default = "default_flushes_per_document")]
    pub flushes_per_document: usize,

    /// Minimum lines between flushes
    #[serde(default = "default_min_reporting_interval")]
    pub min_reporting_interval: usize,
}

fn default_theme() -> String {
    "classic".to_string()
}

fn default_quiet_period_ms() -> u64 {
    DEFAULT_QUIET_PERIOD.as_millis() as u64
}

fn default_poll_interval() -> usize {
    DEFAULT_POLL_INTERVAL
}

fn default_flushes_per_document() -> usize {
    DEFAULT_FLUSHES_PER_DOCUMENT
}

fn default_min_reporting_interval() -> usize {
    DEFAULT_MIN_REPORTING_INTERVAL
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            quiet_period_ms: default_quiet_period_ms(),
            poll_interval: default_poll_interval(),
            flushes_per_document: default_flushes_per_document(),
            min_reporting_interval: default_min_reporting_interval(),
        }
    }
}

impl HighlightConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`; missing or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Scheduler settings; zero counts fall back to the defaults
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        let or_default = |value: usize, default: usize| if value == 0 { default } else { value };
        SchedulerSettings {
            quiet_period: self.quiet_period(),
            scan: ScanSettings {
                poll_interval: or_default(self.poll_interval, DEFAULT_POLL_INTERVAL),
                flushes_per_document: or_default(
                    self.flushes_per_document,
                    DEFAULT_FLUSHES_PER_DOCUMENT,
                ),
                min_reporting_interval: or_default(
                    self.min_reporting_interval,
                    DEFAULT_MIN_REPORTING_INTERVAL,
                ),
            },
        }
    }
}
