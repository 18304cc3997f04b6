//! Error types for geocluster.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Debug, Error)]
pub enum ClusterError {
    /// Bad caller input: malformed viewport, unknown zoom, invalid config.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A snapshot file with a foreign or corrupt header.
    #[error("Invalid snapshot format")]
    InvalidFormat,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The persistence callback rejected the clusters of a zoom level.
    #[error("Cluster sink failed at zoom {zoom}: {message}")]
    Sink { zoom: u8, message: String },

    #[error("Cluster store error: {0}")]
    Store(String),
}

impl ClusterError {
    /// Whether the error was caused by the caller's input rather than a system fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "snapshot")]
impl From<bincode::Error> for ClusterError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
