use crate::error::{CliError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{Span, Subscriber, info_span};
use tracing_subscriber::{
    Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Coarsest level the log file records, whatever the console shows.
const FILE_LEVEL_FLOOR: LevelFilter = LevelFilter::DEBUG;

/// Console level for the `-v` count; `--quiet` keeps only errors.
pub fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Plain-text layer for `--log-file`.
///
/// Records at least `debug`, so the per-cycle transport and hydro messages survive a quiet
/// console, and closes every span with its busy/idle time so slow solves stand out.
fn file_layer<S>(file: File, console: LevelFilter) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(console.max(FILE_LEVEL_FLOOR))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let console = console_level(verbosity, quiet);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(console);

    let file_layer = log_file
        .map(|path| File::create(&path).map(|file| file_layer(file, console)))
        .transpose()
        .map_err(CliError::Io)?;

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install the logger: {}", e)))
}

/// Span naming the command and deck; every event of the command is logged inside it.
pub fn deck_span(command: &'static str, deck: &Path) -> Span {
    info_span!("deck", command, path = %deck.display())
}
