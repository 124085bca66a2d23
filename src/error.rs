// src/error.rs

use std::path::PathBuf;

/// Errors raised while orchestrating revisions or reconciling their reports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An expected report file is absent.
    #[error("missing input: {}", path.display())]
    MissingInput { path: PathBuf },

    /// A required logical column could not be resolved in a parsed table.
    #[error("schema error in {table}: {message}")]
    Schema { table: String, message: String },

    /// A driven process could not be started or exited unsuccessfully.
    #[error("{step} failed: `{command}` {status}")]
    ExternalTool {
        step: String,
        command: String,
        status: String,
    },

    /// Orchestration stopped at this revision.
    #[error("revision {tag} (ordinal {ordinal}) failed: {cause}")]
    RevisionFailed {
        tag: String,
        ordinal: usize,
        #[source]
        cause: Box<Error>,
    },

    #[error("malformed report {}: {message}", path.display())]
    MalformedReport { path: PathBuf, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Another process holds the run lock of this output root.
    #[error("output root is locked by another run: {}", path.display())]
    Locked { path: PathBuf },
}

impl Error {
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Error::MissingInput { path: path.into() }
    }

    /// Whether aggregation may skip the affected unit and carry on with the others.
    ///
    /// Absent, mis-shaped or unparseable inputs only spoil their own unit. Failures to
    /// read or write the filesystem do not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::MissingInput { .. } | Error::Schema { .. } | Error::MalformedReport { .. } => true,
            Error::Csv(e) => !matches!(e.kind(), csv::ErrorKind::Io(_)),
            Error::Json(e) => !e.is_io(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Turns a per-unit recoverable failure into a logged skip.
pub fn skip_unit<T>(unit: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(unit, error = %err, "skipping unit");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
