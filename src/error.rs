use std::io;
use thiserror::Error;

use crate::core::monitor_tree::ResourceKey;

/// Custom error type for the fleet monitor
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The backing collection could not produce a snapshot. The pass is
    /// abandoned and the next change notification retries.
    #[error("Snapshot fetch failed: {0}")]
    Fetch(String),

    /// A freshly constructed child could not be created or started.
    #[error("Child {key} failed to start: {source}")]
    ChildStart {
        key: ResourceKey,
        #[source]
        source: Box<FleetError>,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the fleet monitor
pub type Result<T> = std::result::Result<T, FleetError>;

impl FleetError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        FleetError::Config(msg.into())
    }

    /// Create a snapshot fetch error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        FleetError::Fetch(msg.into())
    }

    pub fn child_start(key: ResourceKey, source: FleetError) -> Self {
        FleetError::ChildStart {
            key,
            source: Box::new(source),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        FleetError::InvalidState(msg.into())
    }

    pub fn worker<S: Into<String>>(msg: S) -> Self {
        FleetError::Worker(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        FleetError::Other(msg.into())
    }

    /// Whether a later notification can be expected to succeed where this failed.
    pub fn is_transient(&self) -> bool {
        match self {
            FleetError::Fetch(_) => true,
            FleetError::ChildStart { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}
