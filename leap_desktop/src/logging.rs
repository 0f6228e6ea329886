//! Logger configuration, built once at startup and installed as the global
//! `tracing` subscriber.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Filter directive (`info`, `debug`, `leap_desktop=trace`, ...).
    /// `RUST_LOG` wins when set.
    pub level:           String,
    pub color:           bool,
    /// Append to this file instead of writing to stderr.  Never colored.
    pub file:            Option<PathBuf>,
    pub frame_summaries: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::from_config(&LoggingConfig::default())
    }
}

impl LogConfig {
    pub fn from_config(cfg: &LoggingConfig) -> Self {
        let term = std::env::var("TERM").ok();
        LogConfig {
            level:           cfg.level.clone(),
            color:           cfg.color.unwrap_or_else(|| term_supports_color(term.as_deref())),
            file:            cfg.file.clone(),
            frame_summaries: cfg.frame_summaries,
        }
    }

    /// Install the global subscriber.  Fails if one is already set.
    pub fn install(&self) -> Result<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(f)  => f,
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| Error::Logging(format!("bad level \"{}\": {e}", self.level)))?,
        };
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_names(true);

        let installed = match &self.file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| Error::Io { path: path.clone(), source })?;
                builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
            }
            None => builder.with_ansi(self.color).with_writer(std::io::stderr).try_init(),
        };
        installed.map_err(|e| Error::Logging(e.to_string()))
    }
}

/// Color when `TERM` names an xterm-like terminal or `screen`.
pub fn term_supports_color(term: Option<&str>) -> bool {
    match term {
        Some(t) => t.contains("term") || t == "screen",
        None    => false,
    }
}
