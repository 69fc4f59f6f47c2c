//! Command-line argument parsing
//!
//! Supports:
//! - Highlighting a file once and printing it
//! - Watch mode, re-highlighting whenever the file changes
//! - Theme and debounce overrides on top of the config file

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::HighlightConfig;
use crate::highlight::SchedulerSettings;

/// Background XML syntax highlighter
#[derive(Parser, Debug)]
#[command(name = "xmlcolor", version, about = "Highlight XML documents in the terminal")]
pub struct CliArgs {
    /// XML file to highlight
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Keep running and re-highlight when the file changes
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Theme id (built-in or from the themes config directory)
    #[arg(short = 't', long, value_name = "ID")]
    pub theme: Option<String>,

    /// Milliseconds without changes before re-highlighting
    #[arg(long, value_name = "MS")]
    pub quiet_period_ms: Option<u64>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Ansi)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Text with 24-bit ANSI colors
    Ansi,
    /// Styled ranges as JSON
    Json,
}

/// Configuration derived from CLI arguments and the config file
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub file: PathBuf,
    pub watch: bool,
    pub theme: String,
    pub format: OutputFormat,
    pub settings: SchedulerSettings,
}

impl CliArgs {
    /// Merge parsed CLI args over the loaded config; flags win
    pub fn into_config(self, config: &HighlightConfig) -> Result<RunConfig, String> {
        if self.file.is_dir() {
            return Err(format!("{} is a directory", self.file.display()));
        }

        let mut settings = config.scheduler_settings();
        if let Some(ms) = self.quiet_period_ms {
            settings.quiet_period = Duration::from_millis(ms);
        }

        Ok(RunConfig {
            file: self.file,
            watch: self.watch,
            theme: self.theme.unwrap_or_else(|| config.theme.clone()),
            format: self.format,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("xmlcolor").chain(args.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn test_defaults_come_from_config() {
        let config = HighlightConfig {
            theme: "dark".into(),
            quiet_period_ms: 100,
            ..HighlightConfig::default()
        };
        let run = parse(&["doc.xml"]).into_config(&config).unwrap();
        assert_eq!(run.file, PathBuf::from("doc.xml"));
        assert_eq!(run.theme, "dark");
        assert_eq!(run.settings.quiet_period, Duration::from_millis(100));
        assert_eq!(run.format, OutputFormat::Ansi);
        assert!(!run.watch);
    }

    #[test]
    fn test_flags_override_config() {
        let run = parse(&["-w", "--theme", "classic", "--quiet-period-ms", "5", "-f", "json", "a.xml"])
            .into_config(&HighlightConfig::default())
            .unwrap();
        assert!(run.watch);
        assert_eq!(run.theme, "classic");
        assert_eq!(run.settings.quiet_period, Duration::from_millis(5));
        assert_eq!(run.format, OutputFormat::Json);
    }

    #[test]
    fn test_file_is_required() {
        assert!(CliArgs::try_parse_from(["xmlcolor"]).is_err());
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = std::env::temp_dir();
        let args = parse(&[dir.to_str().unwrap()]);
        assert!(args.into_config(&HighlightConfig::default()).is_err());
    }
}
