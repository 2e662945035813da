//! Event and summary printing

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use pollwatch::{ChangeEvent, ChangeKind, PollWatcher, WatchError, WatcherDiagnostics};

/// How change events are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Root-relative path for display; the root itself shows as `.`
fn display_path(event: &ChangeEvent) -> String {
    if event.path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        event.path.display().to_string()
    }
}

/// Uncolored line for one event
pub fn format_change(event: &ChangeEvent, format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(format!("{:<7} {}", event.kind.as_str(), display_path(event))),
        Format::Json => serde_json::to_string(event).context("Failed to encode event as JSON"),
    }
}

pub fn print_change(event: &ChangeEvent, format: Format) -> Result<()> {
    if format == Format::Json {
        println!("{}", format_change(event, format)?);
        return Ok(());
    }

    let kind = format!("{:<7}", event.kind.as_str());
    match event.kind {
        ChangeKind::Rename => println!("{} {}", kind.yellow(), display_path(event)),
        ChangeKind::Change => println!("{} {}", kind.cyan(), display_path(event)),
    }
    Ok(())
}

pub fn print_error(err: &WatchError) {
    eprintln!("{} {}", "error".red().bold(), err);
}

pub fn print_banner(watcher: &PollWatcher) {
    let root = watcher
        .root()
        .map(|root| root.display().to_string())
        .unwrap_or_default();
    eprintln!(
        "{} {} ({} paths)",
        "Watching".bold(),
        root.cyan(),
        watcher.watched_paths().len()
    );
    eprintln!("{}", "Press Ctrl-C to stop".dimmed());
}

pub fn print_summary(stats: &WatcherDiagnostics) {
    eprintln!();
    eprintln!("{}", "Watcher Summary".bold());
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("Ticks processed: {}", stats.ticks_processed);
    eprintln!("Rescans:         {}", stats.rescans);
    eprintln!("Events emitted:  {}", stats.events_emitted);
    if stats.errors > 0 {
        eprintln!("Errors:          {}", stats.errors.to_string().red());
    } else {
        eprintln!("Errors:          {}", stats.errors);
    }
}
