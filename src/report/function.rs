use super::event::Event;
use super::types::{DEFAULT_FUNCTION_TITLE, ReportError, ReportResult, Status};

/// A named, append-only group of events, roughly one logical test step
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    events: Vec<Event>,
    pass_count: usize,
    warning_count: usize,
    fail_count: usize,
}

impl Function {
    /// Create an empty group. The name is checked here rather than at report
    /// time so a bad name fails where it was written.
    pub fn new(name: impl Into<String>) -> ReportResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ReportError::EmptyFunctionName);
        }
        Ok(Self {
            name,
            events: Vec::new(),
            pass_count: 0,
            warning_count: 0,
            fail_count: 0,
        })
    }

    /// The group that collects events added before any function was opened
    pub(crate) fn default_group() -> Self {
        Self {
            name: DEFAULT_FUNCTION_TITLE.to_string(),
            events: Vec::new(),
            pass_count: 0,
            warning_count: 0,
            fail_count: 0,
        }
    }

    pub fn add(&mut self, event: Event) {
        match event.status() {
            Status::Pass => self.pass_count += 1,
            Status::Warning => self.warning_count += 1,
            Status::Fail => self.fail_count += 1,
            // no counter for informational events
            Status::Done => {}
        }
        self.events.push(event);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn fail_count(&self) -> usize {
        self.fail_count
    }
}
