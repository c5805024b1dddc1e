//! PSN-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, PsnError>;

/// Top-level error type for Power Sentinel.
#[derive(Debug, Error)]
pub enum PsnError {
    #[error("[PSN-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[PSN-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[PSN-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[PSN-2001] probe failure: {details}")]
    Probe { details: String },

    #[error("[PSN-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[PSN-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[PSN-3001] notification rejected for chat {chat_id}: {details}")]
    NotifyRejected { chat_id: String, details: String },

    #[error("[PSN-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[PSN-3101] state lock failure at {path}: {details}")]
    StateLock { path: PathBuf, details: String },

    #[error("[PSN-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl PsnError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "PSN-1001",
            Self::MissingConfig { .. } => "PSN-1002",
            Self::ConfigParse { .. } => "PSN-1003",
            Self::Probe { .. } => "PSN-2001",
            Self::Serialization { .. } => "PSN-2101",
            Self::Sql { .. } => "PSN-2102",
            Self::NotifyRejected { .. } => "PSN-3001",
            Self::Io { .. } => "PSN-3002",
            Self::StateLock { .. } => "PSN-3101",
            Self::Runtime { .. } => "PSN-3900",
        }
    }

    /// Whether retrying on the next scheduled tick might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Probe { .. }
                | Self::NotifyRejected { .. }
                | Self::Io { .. }
                | Self::Sql { .. }
                | Self::StateLock { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for probe failures.
    #[must_use]
    pub fn probe(details: impl Into<String>) -> Self {
        Self::Probe {
            details: details.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PsnError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for PsnError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for PsnError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
