use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("automation is disabled by flag file '{}'", .path.display())]
    AutomationDisabled { path: PathBuf },
    #[error("{context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialize '{}': {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported state version {version} at '{}'", .path.display())]
    UnsupportedStateVersion { version: u64, path: PathBuf },
}

pub type CorpusResult<T> = Result<T, CorpusError>;

pub fn invalid_config(message: impl Into<String>) -> CorpusError {
    CorpusError::InvalidConfig(message.into())
}

pub fn invalid_argument(message: impl Into<String>) -> CorpusError {
    CorpusError::InvalidArgument(message.into())
}

pub fn io_error(
    context: &'static str,
    path: impl Into<PathBuf>,
    source: std::io::Error,
) -> CorpusError {
    CorpusError::Io {
        context,
        path: path.into(),
        source,
    }
}

pub fn serialization_error(path: impl Into<PathBuf>, source: serde_json::Error) -> CorpusError {
    CorpusError::Serialization {
        path: path.into(),
        source,
    }
}
