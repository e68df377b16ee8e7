//! Browser-backed test units.
//!
//! [`BrowserTest`] is the standard [`TestUnit`]: it asks a factory for a
//! browser session, builds a fresh [`Reporter`] bound to that session's
//! camera, runs the [`TestCase`] hooks, then closes the browser and writes
//! the report. The report is written even when the case errors or panics.

use anyhow::Context as _;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::browser::{BrowserResult, BrowserSession, Capabilities};
use crate::config;
use crate::report::Reporter;
use crate::run_dir::sanitize_name;
use crate::scheduler::TestUnit;
use crate::verify::Verifier;

/// Creates a browser session for the requested capabilities
pub type BrowserFactory =
    Arc<dyn Fn(&Capabilities) -> BrowserResult<Box<dyn BrowserSession>> + Send + Sync>;

/// Everything a running test case can touch
pub struct TestContext {
    browser: Box<dyn BrowserSession>,
    reporter: Reporter,
}

impl TestContext {
    pub fn new(browser: Box<dyn BrowserSession>, reporter: Reporter) -> Self {
        Self { browser, reporter }
    }

    pub fn browser(&mut self) -> &mut dyn BrowserSession {
        self.browser.as_mut()
    }

    pub fn reporter(&mut self) -> &mut Reporter {
        &mut self.reporter
    }

    pub fn verify(&mut self) -> Verifier<'_> {
        self.reporter.verify()
    }

    pub fn into_parts(self) -> (Box<dyn BrowserSession>, Reporter) {
        (self.browser, self.reporter)
    }
}

/// The steps of one test. Only `do_test` is required.
pub trait TestCase: Send {
    /// Runs before `do_test`
    fn before_test(&mut self, _ctx: &mut TestContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn do_test(&mut self, ctx: &mut TestContext) -> anyhow::Result<()>;

    /// Runs after a successful `do_test`
    fn after_test(&mut self, _ctx: &mut TestContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Descriptor for one browser test; queue it on a [`Scheduler`](crate::Scheduler)
pub struct BrowserTest<C> {
    title: String,
    case: C,
    factory: BrowserFactory,
    capabilities: Capabilities,
    output_path: Option<PathBuf>,
    script: Option<String>,
}

impl<C: TestCase + 'static> BrowserTest<C> {
    pub fn new(title: impl Into<String>, case: C, factory: BrowserFactory) -> Self {
        Self {
            title: title.into(),
            case,
            factory,
            capabilities: Capabilities::default(),
            output_path: None,
            script: None,
        }
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Where the report goes; defaults to `<output dir>/<title>.<format>`
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Descriptor of the code under test, copied into the report
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    fn resolved_output_path(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| {
            let cfg = config::get();
            cfg.output.base_dir.join(format!(
                "{}.{}",
                sanitize_name(&self.title),
                cfg.output.format.extension()
            ))
        })
    }
}

impl<C: TestCase + 'static> TestUnit for BrowserTest<C> {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn execute(self: Box<Self>) -> anyhow::Result<bool> {
        let output_path = self.resolved_output_path();
        let BrowserTest {
            title,
            mut case,
            factory,
            capabilities,
            script,
            ..
        } = *self;

        let mut browser = factory(&capabilities)
            .with_context(|| format!("failed to open {} for '{}'", capabilities.label(), title))?;
        if let Err(e) = browser.maximize() {
            warn!("Could not maximize browser for '{}': {}", title, e);
        }

        let mut reporter = Reporter::new();
        reporter.set_title(&title);
        reporter.set_browser(capabilities.label());
        reporter.set_output_path(&output_path);
        if let Some(script) = script {
            reporter.set_script(script);
        }
        if let Some(camera) = browser.camera() {
            reporter.set_camera(camera);
        }

        let mut ctx = TestContext::new(browser, reporter);
        let body = panic::catch_unwind(AssertUnwindSafe(|| {
            case.before_test(&mut ctx)?;
            case.do_test(&mut ctx)?;
            case.after_test(&mut ctx)
        }));

        let (mut browser, reporter) = ctx.into_parts();
        if let Err(e) = browser.close() {
            warn!("Failed to close browser for '{}': {}", title, e);
        }
        let generated = reporter.generate_report();

        match body {
            Err(payload) => panic::resume_unwind(payload),
            Ok(result) => result?,
        }
        let generated = generated.with_context(|| format!("failed to write report for '{}'", title))?;
        Ok(generated.passed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowser;
    use crate::report::{ScriptReport, Status};

    struct Search {
        expected_results: usize,
    }

    impl TestCase for Search {
        fn do_test(&mut self, ctx: &mut TestContext) -> anyhow::Result<()> {
            let title = ctx.browser().title()?;
            ctx.reporter().open_function("results")?;
            ctx.verify().equals_titled("page title", "Search", title.as_str())?;
            ctx.verify().equals_titled("result count", self.expected_results, 10)?;
            Ok(())
        }
    }

    struct Broken;

    impl TestCase for Broken {
        fn do_test(&mut self, ctx: &mut TestContext) -> anyhow::Result<()> {
            ctx.reporter().record("before error", "reached", Status::Done)?;
            anyhow::bail!("element #submit not found")
        }
    }

    fn mock_factory() -> BrowserFactory {
        Arc::new(|caps: &Capabilities| {
            Ok(Box::new(MockBrowser::new(caps.clone(), "Search")) as Box<dyn BrowserSession>)
        })
    }

    #[test]
    fn test_browser_test_writes_report_with_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("search.json");
        let unit = BrowserTest::new("search", Search { expected_results: 3 }, mock_factory())
            .capabilities(Capabilities::new("firefox", "120"))
            .output_path(&output)
            .script("suite::search");

        let passed = Box::new(unit).execute().unwrap();
        assert!(!passed);

        let report = ScriptReport::load(&output).unwrap();
        assert_eq!(report.browser.as_deref(), Some("firefox 120"));
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.pass_count, 1);
        assert!(report.functions[0].events[1].screenshot_path.is_some());
    }

    #[test]
    fn test_browser_is_maximized_then_closed() {
        let dir = tempfile::tempdir().unwrap();
        let shared = MockBrowser::new(Capabilities::default(), "Search");
        let handle = shared.clone();
        let factory: BrowserFactory = Arc::new(move |_: &Capabilities| {
            Ok(Box::new(shared.clone()) as Box<dyn BrowserSession>)
        });

        let unit = BrowserTest::new("lifecycle", Search { expected_results: 10 }, factory)
            .output_path(dir.path().join("lifecycle.json"));
        assert!(Box::new(unit).execute().unwrap());
        assert!(handle.is_maximized());
        assert!(handle.is_closed());
    }

    #[test]
    fn test_report_is_written_when_case_errors() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("broken.json");
        let unit = BrowserTest::new("broken", Broken, mock_factory()).output_path(&output);

        let err = Box::new(unit).execute().unwrap_err();
        assert!(err.to_string().contains("#submit"));

        let report = ScriptReport::load(&output).unwrap();
        assert_eq!(report.event_count(), 1);
        assert_eq!(report.failure_count, 0);
    }

    #[test]
    fn test_factory_error_is_reported() {
        let failing: BrowserFactory = Arc::new(|_: &Capabilities| {
            Err(crate::browser::BrowserError::Session("grid unavailable".into()))
        });
        let unit = BrowserTest::new("no browser", Search { expected_results: 0 }, failing);
        let err = Box::new(unit).execute().unwrap_err();
        assert!(format!("{:#}", err).contains("grid unavailable"));
    }
}
