//! Process-wide `tracing` subscriber.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::Result;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Default filter when none is given.
const DEFAULT_LEVEL: &str = "info";

/// Initialize the tracing logger. Only the first call has any effect.
///
/// `level` is an [`EnvFilter`] directive such as `"debug"` or
/// `"threepid=trace,warn"`; `None` means `"info"`. Output goes to `file`
/// (appended, without ANSI colours) when given, stderr otherwise.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if `file` cannot be opened.
pub fn init_logger(level: Option<&str>, file: Option<&Path>) -> Result<()> {
    if LOGGER_INIT.get().is_some() {
        return Ok(());
    }
    let writer = match file {
        Some(path) => {
            let f = OpenOptions::new().create(true).append(true).open(path)?;
            Some(BoxMakeWriter::new(Mutex::new(f)))
        }
        None => None,
    };
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::builder().parse_lossy(level.unwrap_or(DEFAULT_LEVEL));
        let layer = match writer {
            Some(w) => fmt::layer().with_ansi(false).with_writer(w).boxed(),
            None => fmt::layer().with_writer(std::io::stderr).boxed(),
        };
        // Another subscriber may already be installed by the host application.
        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init();
    });
    Ok(())
}
