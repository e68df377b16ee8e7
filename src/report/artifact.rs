//! Serializable form of a finished report.
//!
//! This is the on-disk contract: what a [`Reporter`](super::Reporter) writes
//! and what `inspect` reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::event::Event;
use super::function::Function;
use super::script::Script;
use super::types::{ReportResult, Status};

/// One event as written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    pub title: String,
    pub message: String,
    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Vec<String>>,

    /// Relative to the report's output path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

/// One function as written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    pub pass_count: usize,
    pub warning_count: usize,
    pub fail_count: usize,
    pub events: Vec<EventReport>,
}

/// A whole script with its reporter metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptReport {
    /// Script name (the reporter's title)
    pub name: String,

    /// Browser name and version the unit ran against
    pub browser: Option<String>,

    /// Descriptor of the code under test
    pub script: Option<String>,

    /// Machine that produced the report
    pub host: Option<String>,

    pub generated_at: DateTime<Utc>,

    pub failure_count: usize,
    pub warning_count: usize,
    pub pass_count: usize,

    pub functions: Vec<FunctionReport>,
}

impl From<&Event> for EventReport {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title().to_string(),
            message: event.message().to_string(),
            status: event.status(),
            stack_trace: event.stack_trace().map(<[String]>::to_vec),
            screenshot_path: event.screenshot_path().map(str::to_string),
        }
    }
}

impl From<&Function> for FunctionReport {
    fn from(function: &Function) -> Self {
        Self {
            name: function.name().to_string(),
            pass_count: function.pass_count(),
            warning_count: function.warning_count(),
            fail_count: function.fail_count(),
            events: function.events().iter().map(EventReport::from).collect(),
        }
    }
}

impl ScriptReport {
    /// Snapshot a script tree together with its reporter metadata
    pub fn from_script(script: &Script, browser: Option<&str>, script_under_test: Option<&str>) -> Self {
        Self {
            name: script.name().to_string(),
            browser: browser.map(str::to_string),
            script: script_under_test.map(str::to_string),
            host: hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
            generated_at: Utc::now(),
            failure_count: script.failure_count(),
            warning_count: script.warning_count(),
            pass_count: script.pass_count(),
            functions: script.functions().iter().map(FunctionReport::from).collect(),
        }
    }

    /// Read a JSON report back from disk
    pub fn load(path: &Path) -> ReportResult<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Every event in recording order
    pub fn events(&self) -> impl Iterator<Item = &EventReport> {
        self.functions.iter().flat_map(|f| f.events.iter())
    }

    pub fn event_count(&self) -> usize {
        self.functions.iter().map(|f| f.events.len()).sum()
    }

    /// True when the unit recorded no failures
    pub fn passed(&self) -> bool {
        self.failure_count == 0
    }
}
