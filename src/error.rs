//! Error types for the aif-modelgen crate.

use std::path::PathBuf;

/// Errors that can occur while loading schemas, generating models, or
/// managing contracts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A schema node has the wrong shape (e.g. `properties` is not an object).
    #[error("malformed schema at {path}: {message}")]
    SchemaFormat { path: String, message: String },

    /// The schema nests deeper than the configured limit.
    #[error("schema at {path} nests deeper than the limit of {limit} levels")]
    DepthExceeded { path: String, limit: usize },

    /// Failed to write a schema, contract, or generated model file.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON parse error with context.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An example record handed to the inference engine is not valid JSON.
    #[error("sample #{index} is not valid JSON: {source}")]
    InvalidSample {
        index: usize,
        source: serde_json::Error,
    },

    /// Schema inference could not produce a schema.
    #[error("inference error: {0}")]
    Inference(String),

    /// A contract version name that cannot be used as a file name.
    #[error("invalid contract version '{0}'")]
    InvalidVersion(String),

    /// Network error during schema download.
    #[cfg(feature = "download")]
    #[error("download failed: {0}")]
    Download(String),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn schema_format(path: &str, message: impl Into<String>) -> Self {
        Error::SchemaFormat {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
