use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the CLI layer: reading/writing files, parsing JSON input,
/// and failures bubbled up from the engine crate.
///
/// The engine crate never performs I/O, so every `Io`/`Serialization`
/// variant here originates in this crate alone.
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading an input file or writing an artifact failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file that could not be read or written.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Input JSON failed to parse, or a result could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rule or fact construction failed while loading input.
    #[error(transparent)]
    Type(#[from] rule_types::TypeError),

    /// Config validation or inference failed.
    #[error(transparent)]
    Engine(#[from] rule_engine::EngineError),
}

impl CliError {
    /// Wraps an I/O error with the path that was being accessed.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Convenience alias for results produced by this crate.
pub type CliResult<T> = Result<T, CliError>;
