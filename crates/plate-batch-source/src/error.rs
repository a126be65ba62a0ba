use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to expand file pattern: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("sftp session error: {0}")]
    Session(#[from] ssh2::Error),

    #[error("authentication failed for user {user}: {source}")]
    Auth { user: String, source: ssh2::Error },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl SourceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
