//! pollwatch - print file changes under a directory

use anyhow::{Context, Result};
use clap::Parser;
use pollwatch::{PollWatcher, WatcherConfig};
use std::path::PathBuf;
use tracing::Level;

mod output;

use output::Format;

/// Watch a file or directory tree by polling and print every change
#[derive(Parser, Debug)]
#[command(name = "pollwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File or directory to watch
    path: PathBuf,

    /// Polling interval per path in milliseconds (default: 5007)
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Traverse symbolic links to directories
    #[arg(long)]
    follow_symlinks: bool,

    /// Gitignore-style pattern to exclude (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Skip .git, .hg, .jj and .svn directories
    #[arg(long)]
    ignore_vcs: bool,

    /// TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Consume changes with a pull reader instead of handlers
    #[arg(long)]
    pull: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Log engine activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file (if any) with command-line overrides applied
    fn resolve_config(&self) -> Result<WatcherConfig> {
        let mut config = match &self.config {
            Some(path) => WatcherConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => WatcherConfig::default(),
        };

        if let Some(interval_ms) = self.interval_ms {
            config.poll_interval_ms = interval_ms;
        }
        if self.follow_symlinks {
            config.follow_symlinks = true;
        }
        if self.ignore_vcs {
            config.ignore.ignore_vcs = true;
        }
        config.ignore.patterns.extend(self.ignore.iter().cloned());

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn format(&self) -> Format {
        if self.json {
            Format::Json
        } else {
            Format::Text
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries events, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let config = cli.resolve_config()?;
    let watcher = pollwatch::watch(&cli.path, config)
        .await
        .with_context(|| format!("Failed to watch {}", cli.path.display()))?;

    let format = cli.format();
    if format == Format::Text {
        output::print_banner(&watcher);
    }

    if cli.pull {
        run_pull(&watcher, format).await?;
    } else {
        run_push(&watcher, format).await?;
    }

    if format == Format::Text {
        output::print_summary(&watcher.diagnostics());
    }
    Ok(())
}

/// Print from handlers until Ctrl-C
async fn run_push(watcher: &PollWatcher, format: Format) -> Result<()> {
    watcher.on_change(move |event| {
        if let Err(err) = output::print_change(event, format) {
            tracing::warn!("Failed to print event: {}", err);
        }
    });
    watcher.on_error(|err| output::print_error(err));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    watcher.close();
    Ok(())
}

/// Print from a pull reader until Ctrl-C
async fn run_pull(watcher: &PollWatcher, format: Format) -> Result<()> {
    let mut changes = watcher.changes();

    loop {
        tokio::select! {
            item = changes.next() => match item {
                Some(Ok(event)) => output::print_change(&event, format)?,
                Some(Err(err)) => output::print_error(&err),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                watcher.close();
                break;
            }
        }
    }

    Ok(())
}
