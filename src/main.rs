use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use xmlcolor::cli::{CliArgs, OutputFormat, RunConfig};
use xmlcolor::fs_watcher::DocumentWatcher;
use xmlcolor::highlight::HighlightScheduler;
use xmlcolor::render::{render_ansi, render_json, CLEAR_SCREEN};
use xmlcolor::surface::{self, StyledBuffer, SurfaceEvent, SurfacePump};
use xmlcolor::{HighlightConfig, Theme};

/// How long one-shot mode waits for the first pass
const PASS_TIMEOUT: Duration = Duration::from_secs(300);

/// Watch-mode tick between file checks
const WATCH_TICK: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let args = CliArgs::parse();
    xmlcolor::tracing::init();

    let config = HighlightConfig::load();
    let run = args
        .into_config(&config)
        .map_err(anyhow::Error::msg)?;

    let theme = match xmlcolor::theme::load_theme(&run.theme) {
        Ok(theme) => theme,
        Err(e) => {
            tracing::warn!("Failed to load theme '{}': {}, using default", run.theme, e);
            Theme::default()
        }
    };

    let text = read_document(&run.file)?;
    let (ui, mut pump) = surface::channel(StyledBuffer::from_text(&text));
    let highlighter = HighlightScheduler::new(ui, run.settings)
        .spawn()
        .context("Failed to start highlight worker")?;
    highlighter.document_loaded();

    if !run.watch {
        let events = pump.pump_until(PASS_TIMEOUT, ends_pass);
        report_failure(&events);
        return print(&pump, &theme, run.format, false);
    }

    let watcher = DocumentWatcher::new(&run.file)
        .with_context(|| format!("Failed to watch {}", run.file.display()))?;

    loop {
        if let Some(event) = pump.pump_next(WATCH_TICK) {
            match &event {
                SurfaceEvent::Notified(message) => eprintln!("{}", message),
                event if event.is_pass_complete() => print(&pump, &theme, run.format, true)?,
                _ => {}
            }
        }

        if watcher.poll_changed() {
            reload(&run, &mut pump, watcher.path())?;
            highlighter.text_changed();
        }
    }
}

fn ends_pass(event: &SurfaceEvent) -> bool {
    event.is_pass_complete() || matches!(event, SurfaceEvent::Notified(_))
}

fn report_failure(events: &[SurfaceEvent]) {
    match events.last() {
        Some(SurfaceEvent::Notified(message)) => eprintln!("{}", message),
        Some(event) if event.is_pass_complete() => {}
        _ => tracing::warn!("Highlighting did not finish in time, printing partial result"),
    }
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn reload(run: &RunConfig, pump: &mut SurfacePump<StyledBuffer>, path: &Path) -> Result<()> {
    match read_document(path) {
        Ok(text) => {
            tracing::debug!("Reloaded {} ({} bytes)", run.file.display(), text.len());
            pump.surface_mut().replace_text(&text);
            Ok(())
        }
        // Mid-save renames can briefly remove the file; the next event retries
        Err(e) if !path.exists() => {
            tracing::debug!("{:#}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn print(
    pump: &SurfacePump<StyledBuffer>,
    theme: &Theme,
    format: OutputFormat,
    redraw: bool,
) -> Result<()> {
    let buffer = pump.surface();
    let mut stdout = std::io::stdout().lock();
    if redraw && format == OutputFormat::Ansi {
        stdout.write_all(CLEAR_SCREEN.as_bytes())?;
    }
    match format {
        OutputFormat::Ansi => stdout.write_all(render_ansi(buffer, theme).as_bytes())?,
        OutputFormat::Json => {
            let json = render_json(buffer).context("Failed to serialize styled ranges")?;
            writeln!(stdout, "{}", json)?;
        }
    }
    stdout.flush()?;
    Ok(())
}
