use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{CliError, CliResult};

/// Initializes the process-wide `tracing` subscriber with three sinks, per
/// the source system's convention of a basic log, an extended log, and a
/// console: an INFO-level file (`inference_<run_id>.log`), a DEBUG-level
/// file (`inference_<run_id>_extended.log`), and an INFO-level console layer.
/// `RUST_LOG` overrides the console layer's default if set.
///
/// # Errors
///
/// Returns [`CliError::Io`] if either log file cannot be created.
pub fn init(log_dir: &Path, run_id: &str) -> CliResult<()> {
    std::fs::create_dir_all(log_dir).map_err(|e| CliError::io(log_dir, e))?;

    let basic_path = log_dir.join(format!("inference_{run_id}.log"));
    let extended_path = log_dir.join(format!("inference_{run_id}_extended.log"));

    let basic_file = File::create(&basic_path).map_err(|e| CliError::io(&basic_path, e))?;
    let extended_file = File::create(&extended_path).map_err(|e| CliError::io(&extended_path, e))?;

    let basic_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(basic_file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(EnvFilter::new("info"));

    let extended_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(extended_file))
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing_subscriber::registry().with(basic_layer).with(extended_layer).with(console_layer).init();

    Ok(())
}
