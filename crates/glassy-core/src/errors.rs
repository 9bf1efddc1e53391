//! Error types for the opacity engine
//!
//! Opacity actions never surface these to the user; they are absorbed into
//! no-ops or fail-open defaults and only show up in the log.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from running an external program
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    /// The program did not finish in time
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Errors resolving the focused window
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The active window query itself failed
    #[error("Active window query failed: {0}")]
    Command(#[from] CommandError),

    /// The output did not contain a window id
    #[error("No window id in active window output: {output:?}")]
    NoWindowId { output: String },

    /// The root window reports no focused window
    #[error("No window has focus")]
    NoActiveWindow,
}

/// Errors reading or writing a window's opacity property
#[derive(Debug, Error)]
pub enum PropertyError {
    /// The opacity query failed
    #[error("Failed to read opacity of {window}: {source}")]
    Read {
        window: String,
        #[source]
        source: CommandError,
    },

    /// The opacity query returned something we could not parse
    #[error("Malformed opacity for {window}: {output:?}")]
    Malformed { window: String, output: String },

    /// The opacity write failed
    #[error("Failed to set opacity of {window}: {source}")]
    Write {
        window: String,
        #[source]
        source: CommandError,
    },
}

/// Errors from the preference store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Preference store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preference store at {path:?} is corrupt: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors taking the cross-process action lock
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to lock {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Could not determine the user {0} directory")]
    NoHomeDir(&'static str),
}

impl ConfigError {
    /// Create an Invalid error
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
