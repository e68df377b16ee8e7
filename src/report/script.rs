//! Root of one unit's result tree.

use super::event::Event;
use super::function::Function;
use super::types::ReportResult;

/// Which function receives free-standing events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Nothing opened yet; the next event opens the default function
    Unopened,
    /// Index into `functions`
    Active(usize),
}

/// Ordered collection of functions for one test unit
#[derive(Debug, Clone)]
pub struct Script {
    name: String,
    functions: Vec<Function>,
    cursor: Cursor,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            cursor: Cursor::Unopened,
        }
    }

    /// Append a new function and make it the target of subsequent events
    pub fn open_function(&mut self, name: impl Into<String>) -> ReportResult<()> {
        let function = Function::new(name)?;
        self.functions.push(function);
        self.cursor = Cursor::Active(self.functions.len() - 1);
        Ok(())
    }

    /// Add an event to the active function, opening the default one if needed
    pub fn add_event(&mut self, event: Event) {
        let index = match self.cursor {
            Cursor::Active(index) => index,
            Cursor::Unopened => {
                self.functions.push(Function::default_group());
                let index = self.functions.len() - 1;
                self.cursor = Cursor::Active(index);
                index
            }
        };
        self.functions[index].add(event);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The function currently receiving events, if any has been opened
    pub fn current_function(&self) -> Option<&Function> {
        match self.cursor {
            Cursor::Active(index) => self.functions.get(index),
            Cursor::Unopened => None,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.functions.iter().map(Function::fail_count).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.functions.iter().map(Function::warning_count).sum()
    }

    pub fn pass_count(&self) -> usize {
        self.functions.iter().map(Function::pass_count).sum()
    }

    pub fn event_count(&self) -> usize {
        self.functions.iter().map(Function::len).sum()
    }
}
