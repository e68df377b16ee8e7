//! Browser Harness - concurrent browser tests with hierarchical reports.
//!
//! This crate provides:
//! - A scheduler that runs independent test units on their own worker threads
//! - Per-unit reporters that group verification events into functions and scripts
//! - Failure evidence: filtered stack traces and screenshots bound to each event
//! - JSON and HTML report artifacts with a companion screenshot directory
//!
//! # Example
//!
//! ```rust,no_run
//! use browser_harness::{Scheduler, Reporter, Status};
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.queue_fn("smoke", || {
//!     let mut reporter = Reporter::new();
//!     reporter.set_title("smoke");
//!     reporter.set_output_path("./reports/smoke.json");
//!     reporter.verify().equals(2 + 2, 4)?;
//!     reporter.record("done", "all steps ran", Status::Done)?;
//!     Ok(reporter.generate_report()?.passed())
//! });
//! let summary = scheduler.start().unwrap();
//! assert_eq!(summary.completed(), 1);
//! ```

pub mod browser;
pub mod config;
pub mod logging;
pub mod report;
pub mod run_dir;
pub mod scheduler;
pub mod screenshot;
pub mod unit;
pub mod verify;

// Re-export scheduling types
pub use scheduler::{
    FnUnit, RunSummary, Scheduler, SchedulerConfig, SchedulerError, SchedulerResult, TestUnit,
    UnitOutcome, UnitRecord,
};

// Re-export report types
pub use report::{
    Event, Function, GeneratedReport, ReportError, ReportFormat, ReportResult, Reporter, Script,
    ScriptReport, Status,
};

// Re-export screenshot types
pub use screenshot::{Camera, MockFramebuffer, ScreenshotStore, SnapshotError, SnapshotResult};

// Re-export browser collaborator and unit lifecycle
pub use browser::{BrowserError, BrowserResult, BrowserSession, Capabilities, MockBrowser};
pub use unit::{BrowserFactory, BrowserTest, TestCase, TestContext};
pub use verify::Verifier;

pub use run_dir::{RunDirectory, cleanup_old_runs, list_runs};
