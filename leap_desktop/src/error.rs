//! Error type shared by the library modules.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A malformed line in a gesture script (1-based line number).
    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("a listener is already registered with this controller")]
    ListenerRegistered,

    #[error("failed to install logger: {0}")]
    Logging(String),

    #[error("gesture source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, Error>;
