//! Per-unit reporting facade.
//!
//! A [`Reporter`] binds one [`Script`] and one [`ScreenshotStore`] for the
//! lifetime of a single test unit. The scheduler hands each unit its own
//! reporter explicitly; code that cannot thread the handle through can use
//! the worker-local slot ([`with_current`], [`take_current`]) instead. Either
//! way no two units ever share a reporter, so nothing here is locked.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::artifact::ScriptReport;
use super::event::Event;
use super::render::write_report;
use super::script::Script;
use super::types::{DEFAULT_SCRIPT_TITLE, ReportError, ReportResult, Status};
use crate::screenshot::{Camera, FlushSummary, ScreenshotStore};
use crate::verify::Verifier;

thread_local! {
    static CURRENT: RefCell<Option<Reporter>> = const { RefCell::new(None) };
}

/// Run `f` against the calling thread's reporter, creating it on first use
pub fn with_current<R>(f: impl FnOnce(&mut Reporter) -> R) -> R {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        f(slot.get_or_insert_with(Reporter::new))
    })
}

/// Remove the calling thread's reporter, typically to finalize it
pub fn take_current() -> Option<Reporter> {
    CURRENT.with(|slot| slot.borrow_mut().take())
}

/// Drop whatever reporter the calling thread holds.
///
/// Returns true if one was present. Workers call this between units so an
/// abandoned reporter never leaks into the next unit on the same thread.
pub fn discard_current() -> bool {
    take_current().is_some()
}

/// What `generate_report` produced
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// Report files written (JSON, or HTML plus its JSON manifest)
    pub files: Vec<PathBuf>,
    pub screenshots: FlushSummary,
    pub failure_count: usize,
    pub warning_count: usize,
}

impl GeneratedReport {
    pub fn passed(&self) -> bool {
        self.failure_count == 0
    }
}

/// One unit's report: the result tree, its screenshots and metadata
#[derive(Debug, Default)]
pub struct Reporter {
    title: Option<String>,
    browser: Option<String>,
    script_under_test: Option<String>,
    output_path: Option<PathBuf>,
    script: Option<Script>,
    screenshots: ScreenshotStore,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_browser(&mut self, browser: impl Into<String>) {
        self.browser = Some(browser.into());
    }

    /// Describe the code under test (a suite or module name)
    pub fn set_script(&mut self, script: impl Into<String>) {
        self.script_under_test = Some(script.into());
    }

    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = Some(path.into());
    }

    /// Bind the surface failure screenshots are captured from
    pub fn set_camera(&mut self, camera: Box<dyn Camera>) {
        self.screenshots.set_camera(camera);
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_SCRIPT_TITLE)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// The result tree, if any event or function has been recorded
    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn screenshots(&self) -> &ScreenshotStore {
        &self.screenshots
    }

    /// Mutable access for building events by hand with [`Event::new`]
    pub fn screenshots_mut(&mut self) -> &mut ScreenshotStore {
        &mut self.screenshots
    }

    pub fn failure_count(&self) -> usize {
        self.script.as_ref().map_or(0, Script::failure_count)
    }

    pub fn warning_count(&self) -> usize {
        self.script.as_ref().map_or(0, Script::warning_count)
    }

    /// Add a prebuilt event to the active function
    pub fn add(&mut self, event: Event) {
        debug!(title = event.title(), status = %event.status(), "event");
        self.script_mut().add_event(event);
    }

    /// Build an event against this reporter's screenshot store and add it
    pub fn record(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        status: Status,
    ) -> ReportResult<()> {
        let event = Event::new(title, message, status, &mut self.screenshots)?;
        self.add(event);
        Ok(())
    }

    /// Start a new group; subsequent events land in it
    pub fn open_function(&mut self, name: impl Into<String>) -> ReportResult<()> {
        self.script_mut().open_function(name)
    }

    /// Verification helpers that record into this reporter
    pub fn verify(&mut self) -> Verifier<'_> {
        Verifier::new(self)
    }

    /// Write the report and flush screenshots, consuming the reporter.
    ///
    /// Both steps are always attempted. Failures are logged; the first one is
    /// returned. In-memory results are never rolled back.
    pub fn generate_report(mut self) -> ReportResult<GeneratedReport> {
        let title = self.title().to_string();
        let Some(output_path) = self.output_path.take() else {
            error!("Report '{}' has no output path; nothing written", title);
            return Err(ReportError::MissingOutputPath(title));
        };

        let script = self.script.take().unwrap_or_else(|| Script::new(title.clone()));
        let mut report = ScriptReport::from_script(
            &script,
            self.browser.as_deref(),
            self.script_under_test.as_deref(),
        );
        // The title may be set after the first event created the script
        report.name = title;

        let written = write_report(&report, &output_path);
        if let Err(e) = &written {
            error!("Failed to write report {}: {}", output_path.display(), e);
        }

        let screenshots = self.screenshots.flush(&output_path);
        let files = written?;

        info!(
            report = %output_path.display(),
            events = script.event_count(),
            failures = report.failure_count,
            warnings = report.warning_count,
            screenshots = screenshots.written.len(),
            "report generated"
        );

        Ok(GeneratedReport {
            files,
            screenshots,
            failure_count: report.failure_count,
            warning_count: report.warning_count,
        })
    }

    fn script_mut(&mut self) -> &mut Script {
        let title = self.title.as_deref().unwrap_or(DEFAULT_SCRIPT_TITLE);
        self.script.get_or_insert_with(|| Script::new(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screenshot::{MockFramebuffer, companion_path};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_uses_default_function() {
        let mut reporter = Reporter::new();
        reporter.set_title("search");
        reporter.record("open", "page loaded", Status::Done).unwrap();
        reporter.record("query", "results shown", Status::Pass).unwrap();

        let script = reporter.script().unwrap();
        assert_eq!(script.name(), "search");
        assert_eq!(script.functions().len(), 1);
        assert_eq!(script.event_count(), 2);
    }

    #[test]
    fn test_generate_report_writes_tree_and_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("login.json");

        let mut reporter = Reporter::new();
        reporter.set_title("login");
        reporter.set_browser("firefox 120");
        reporter.set_script("suite::login");
        reporter.set_output_path(&output);
        reporter.set_camera(Box::new(MockFramebuffer::with_color(8, 8, [200, 0, 0])));

        reporter.open_function("form").unwrap();
        reporter.record("username", "field present", Status::Pass).unwrap();
        reporter.record("submit", "button disabled", Status::Fail).unwrap();

        let generated = reporter.generate_report().unwrap();
        assert!(!generated.passed());
        assert_eq!(generated.screenshots.written.len(), 1);

        let report = ScriptReport::load(&output).unwrap();
        assert_eq!(report.name, "login");
        assert_eq!(report.script.as_deref(), Some("suite::login"));
        assert_eq!(report.functions[0].name, "form");

        let titles: Vec<&str> = report.events().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["username", "submit"]);

        let screenshot = report.functions[0].events[1].screenshot_path.as_deref().unwrap();
        assert!(companion_path(&output, screenshot).exists());
    }

    #[test]
    fn test_generate_report_without_output_path_fails() {
        let mut reporter = Reporter::new();
        reporter.record("t", "m", Status::Pass).unwrap();
        assert!(matches!(
            reporter.generate_report(),
            Err(ReportError::MissingOutputPath(_))
        ));
    }

    #[test]
    fn test_title_set_after_first_event_names_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("checkout.json");

        let mut reporter = Reporter::new();
        reporter.record("cart", "opened", Status::Pass).unwrap();
        reporter.set_title("Checkout suite");
        reporter.set_output_path(&output);
        reporter.generate_report().unwrap();

        let report = ScriptReport::load(&output).unwrap();
        assert_eq!(report.name, "Checkout suite");
        assert_eq!(report.event_count(), 1);
    }

    #[test]
    fn test_unwritable_output_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();

        let mut reporter = Reporter::new();
        reporter.set_output_path(blocker.join("report.json"));
        reporter.set_camera(Box::new(MockFramebuffer::new(4, 4)));
        reporter.record("submit", "button missing", Status::Fail).unwrap();
        reporter.record("retry", "reached", Status::Pass).unwrap();

        assert_eq!(reporter.screenshots().len(), 1);
        assert_eq!(reporter.failure_count(), 1);
        assert_eq!(reporter.script().map(Script::event_count), Some(2));

        assert!(matches!(reporter.generate_report(), Err(ReportError::Io(_))));
        assert!(blocker.is_file());
    }

    #[test]
    fn test_current_reporter_is_thread_local() {
        with_current(|r| r.record("main", "recorded on test thread", Status::Pass).unwrap());

        let other = std::thread::spawn(|| with_current(|r| r.failure_count() + r.script().map_or(0, Script::event_count)))
            .join()
            .unwrap();
        assert_eq!(other, 0);

        let mine = take_current().unwrap();
        assert_eq!(mine.script().unwrap().event_count(), 1);
        assert!(!discard_current());
    }
}
