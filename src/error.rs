use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid catalog or record URI: {0}")]
    InvalidUri(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to decode JSON from {source_name}: {message}")]
    Decode { source_name: String, message: String },

    #[error("failed to encode record: {0}")]
    Encode(String),

    #[error("filesystem error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("catalog not resolved: {0}")]
    Resolution(String),

    #[error("file has no records: {0}")]
    EmptyFile(String),

    #[error("record at {location} does not match the item schema: {message}")]
    Schema { location: String, message: String },

    #[error("columnar write failed: {0}")]
    Columnar(String),
}

impl HarvestError {
    pub(crate) fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        HarvestError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// True for errors raised while talking to a remote host.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            HarvestError::Transport { .. } | HarvestError::HttpStatus { .. }
        )
    }
}
