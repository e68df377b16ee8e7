// Core types for screenshot capture

use std::path::PathBuf;

/// File extension used for captured images
pub const EXTENSION: &str = ".png";

/// Suffix appended to a report's output path to form its screenshot directory
pub const DIRECTORY_SUFFIX: &str = "_screenshots";

/// Result type for screenshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Error types for screenshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Error during the capture itself
    #[error("Capture error: {0}")]
    Capture(String),

    /// Image could not be encoded or decoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for SnapshotError {
    fn from(err: image::ImageError) -> Self {
        SnapshotError::Encode(err.to_string())
    }
}

/// Outcome of flushing a store's buffered images to disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Files written successfully
    pub written: Vec<PathBuf>,

    /// Relative paths whose write failed
    pub failed: Vec<String>,
}

impl FlushSummary {
    /// True when every buffered image reached disk
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
