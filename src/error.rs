//! Error taxonomy for a sync run.
//!
//! Every failure is fatal: errors propagate unchanged to the binary's
//! top-level handler, which logs the full cause chain and exits non-zero.
//! Display strings carry only the local context; the underlying cause is
//! exposed through [`std::error::Error::source`] so `{:#}` on an
//! `anyhow::Error` prints the whole chain once.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A required input is missing or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// The request never produced an HTTP response.
    #[error("{context}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a status other than 200.
    #[error("{context}: {status}")]
    RemoteStatus { context: String, status: String },

    /// The response body was not the JSON shape we expected.
    #[error("{context}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk working tree")]
    Walk(#[from] walkdir::Error),

    /// A shelled-out version-control command failed or exited non-zero.
    #[error("{command} failed: {message}")]
    Subprocess { command: String, message: String },

    /// An engine step failed; `source` holds the underlying error.
    #[error("{step}")]
    Step {
        step: String,
        #[source]
        source: Box<SyncError>,
    },
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn network(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}

/// Attach the name of the failing engine step to an error.
pub trait StepContext<T> {
    fn step(self, step: &str) -> Result<T>;
}

impl<T> StepContext<T> for Result<T> {
    fn step(self, step: &str) -> Result<T> {
        self.map_err(|source| SyncError::Step {
            step: step.to_string(),
            source: Box::new(source),
        })
    }
}
