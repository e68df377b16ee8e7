use serde::{Deserialize, Serialize};

/// Title given to a Function created implicitly by the first event
pub const DEFAULT_FUNCTION_TITLE: &str = "Default Function Title";

/// Title used for a Script whose reporter never received one
pub const DEFAULT_SCRIPT_TITLE: &str = "Default Script Title";

/// Outcome of one verification point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Done,
    Warning,
    Fail,
}

impl Status {
    /// Whether events of this status carry a stack trace and screenshot
    pub fn captures_evidence(self) -> bool {
        matches!(self, Status::Fail | Status::Warning)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Done => "done",
            Status::Warning => "warning",
            Status::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Error types for report operations
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Event title must not be empty")]
    EmptyTitle,

    #[error("Event message must not be empty")]
    EmptyMessage,

    #[error("Function name must not be empty")]
    EmptyFunctionName,

    #[error("Unknown report format '{0}' (expected json or html)")]
    UnknownFormat(String),

    #[error("No output path set for report '{0}'")]
    MissingOutputPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
