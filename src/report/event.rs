//! Verification events and the evidence attached to them.
//!
//! Failures and warnings capture two kinds of evidence at construction time:
//! a screenshot from the unit's [`ScreenshotStore`] and the caller's stack.
//! The stack is filtered down to frames that belong to the test author's
//! code; frames from the Rust runtime and from this crate's execution layer
//! are dropped so a report points straight at the failing step.

use std::backtrace::Backtrace;

use tracing::debug;

use super::types::{ReportError, ReportResult, Status};
use crate::screenshot::ScreenshotStore;

/// Symbol prefixes of the harness's own execution layer
const HARNESS_FRAME_PREFIXES: &[&str] = &[
    "browser_harness::scheduler",
    "browser_harness::unit",
    "browser_harness::report::event",
];

/// Symbol prefixes of the standard library, test runner and unwinder
const PLATFORM_FRAME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "test::",
    "backtrace::",
    "__rust",
    "rust_begin_unwind",
    "__libc_start",
    "_start",
    "start_thread",
];

/// Bare symbols emitted by the platform thread entry points
const PLATFORM_FRAME_SYMBOLS: &[&str] = &["clone", "clone3", "__clone", "__clone3", "main", "<unknown>"];

/// One recorded verification point. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    title: String,
    message: String,
    status: Status,
    stack_trace: Option<Vec<String>>,
    screenshot_path: Option<String>,
}

impl Event {
    /// Build an event, capturing evidence for failures and warnings.
    ///
    /// Fails when `title` or `message` is empty. A missing or failing camera
    /// never fails construction; the event just carries no screenshot.
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        status: Status,
        screenshots: &mut ScreenshotStore,
    ) -> ReportResult<Self> {
        let title = title.into();
        let message = message.into();
        if title.is_empty() {
            return Err(ReportError::EmptyTitle);
        }
        if message.is_empty() {
            return Err(ReportError::EmptyMessage);
        }

        let (stack_trace, screenshot_path) = if status.captures_evidence() {
            let screenshot = screenshots.take_for_event();
            let stack = capture_stack();
            debug!(%status, frames = stack.len(), screenshot = screenshot.is_some(), "captured evidence");
            (Some(stack), screenshot)
        } else {
            (None, None)
        };

        Ok(Self {
            title,
            message,
            status,
            stack_trace,
            screenshot_path,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Filtered caller frames; `Some` exactly for failures and warnings
    pub fn stack_trace(&self) -> Option<&[String]> {
        self.stack_trace.as_deref()
    }

    /// Screenshot path relative to the report's output path
    pub fn screenshot_path(&self) -> Option<&str> {
        self.screenshot_path.as_deref()
    }
}

/// Capture the current thread's stack, keeping only caller-relevant frames
fn capture_stack() -> Vec<String> {
    filter_frames(&Backtrace::force_capture().to_string())
}

/// Parse a rendered backtrace and drop runtime and harness frames.
///
/// Input is the `Display` form of [`std::backtrace::Backtrace`]: numbered
/// symbol lines, each optionally followed by `at file:line:col` lines. Kept
/// frames preserve their original order.
pub fn filter_frames(rendered: &str) -> Vec<String> {
    let mut frames: Vec<(String, Option<String>)> = Vec::new();

    for line in rendered.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            // first location wins
            if let Some((_, slot)) = frames.last_mut() {
                if slot.is_none() {
                    *slot = Some(location.trim().to_string());
                }
            }
        } else if let Some(symbol) = parse_symbol_line(line) {
            frames.push((symbol.to_string(), None));
        }
    }

    frames
        .into_iter()
        .filter(|(symbol, _)| is_caller_frame(symbol))
        .map(|(symbol, location)| match location {
            Some(location) => format!("{} ({})", symbol, location),
            None => symbol,
        })
        .collect()
}

fn parse_symbol_line(line: &str) -> Option<&str> {
    let (index, symbol) = line.split_once(": ")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(symbol.trim())
}

fn is_caller_frame(symbol: &str) -> bool {
    if PLATFORM_FRAME_SYMBOLS.contains(&symbol) {
        return false;
    }
    // Trait impl frames render as `<Type as Trait>::method`
    let path = symbol.trim_start_matches('<');
    !HARNESS_FRAME_PREFIXES
        .iter()
        .chain(PLATFORM_FRAME_PREFIXES)
        .any(|prefix| path.starts_with(prefix))
}
