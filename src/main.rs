use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use browser_harness::config;
use browser_harness::logging;
use browser_harness::{
    BrowserFactory, BrowserSession, BrowserTest, Capabilities, MockBrowser, ReportFormat, RunDirectory,
    Scheduler, SchedulerConfig, ScriptReport, Status, TestCase, TestContext, UnitOutcome,
    cleanup_old_runs, list_runs,
};

/// Browser Harness - concurrent browser tests with hierarchical reports
#[derive(Parser, Debug)]
#[command(
    name = "browser-harness",
    about = "Run browser test units concurrently and inspect their reports",
    after_help = "ENVIRONMENT VARIABLES:\n\
        HARNESS_OUTPUT_DIR            Base directory for run directories\n\
        HARNESS_MAX_WORKERS           Fixed worker pool size (0 = one thread per unit)\n\
        HARNESS_REPORT_FORMAT         json or html\n\
        HARNESS_LOG                   Default log filter when RUST_LOG is unset\n\
        HARNESS_RUN_RETENTION_HOURS   Age after which `runs clean` removes a run"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthetic suite against mock browsers
    Demo {
        /// Number of concurrent test units
        #[arg(short, long, default_value = "4")]
        units: usize,

        /// Verification events recorded per unit
        #[arg(short, long, default_value = "20")]
        events: usize,

        /// Make every Nth verification fail (0 = never)
        #[arg(long, default_value = "0")]
        fail_every: usize,

        /// Base output directory
        #[arg(short, long, env = "HARNESS_OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Report format: json or html
        #[arg(short, long, env = "HARNESS_REPORT_FORMAT")]
        format: Option<ReportFormat>,

        /// Fixed worker pool size (0 = one thread per unit)
        #[arg(short, long, env = "HARNESS_MAX_WORKERS")]
        workers: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the contents of a saved JSON report
    Inspect {
        /// Path to a report (or an HTML report's .json manifest)
        report: PathBuf,

        /// Also print every event
        #[arg(short, long)]
        verbose: bool,
    },

    /// Manage run directories
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
}

#[derive(Subcommand, Debug)]
enum RunsAction {
    /// List run directories
    List {
        #[arg(short, long, env = "HARNESS_OUTPUT_DIR")]
        output: Option<PathBuf>,
    },
    /// Remove run directories older than the retention period
    Clean {
        #[arg(short, long, env = "HARNESS_OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Maximum age in hours
        #[arg(long, env = "HARNESS_RUN_RETENTION_HOURS")]
        max_age_hours: Option<u64>,
    },
}

/// Synthetic test: navigates, then records a stream of verifications
struct DemoCase {
    events: usize,
    fail_every: usize,
}

impl TestCase for DemoCase {
    fn before_test(&mut self, ctx: &mut TestContext) -> Result<(), anyhow::Error> {
        ctx.reporter().open_function("setup")?;
        let title = ctx.browser().title()?;
        ctx.reporter().record("Open page", format!("Loaded '{}'", title), Status::Done)?;
        Ok(())
    }

    fn do_test(&mut self, ctx: &mut TestContext) -> Result<(), anyhow::Error> {
        for step in 0..self.events {
            if step % 10 == 0 {
                ctx.reporter().open_function(format!("steps {}-{}", step, step + 9))?;
            }
            let failing = self.fail_every > 0 && (step + 1) % self.fail_every == 0;
            let actual = if failing { step + 1 } else { step };
            ctx.verify().equals_titled(&format!("step {}", step), step, actual)?;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init_from_config();
    let args = Args::parse();
    let cfg = config::get();

    match args.command {
        Commands::Demo {
            units,
            events,
            fail_every,
            output,
            format,
            workers,
            json,
        } => {
            let format = format.unwrap_or(cfg.output.format);
            let base = output.unwrap_or_else(|| cfg.output.base_dir.clone());
            let run = RunDirectory::new(&base, "demo");
            run.init(units)?;

            let scheduler_config = match workers {
                Some(n) => SchedulerConfig::default().max_workers(n),
                None => SchedulerConfig::from_env(),
            };
            let mut scheduler = Scheduler::with_config(scheduler_config);

            let browsers = ["firefox", "chrome", "safari"];
            for index in 0..units {
                let browser = browsers[index % browsers.len()];
                let title = format!("demo {} on {}", index, browser);
                let page = format!("Demo page {}", index);
                let factory: BrowserFactory = Arc::new(move |caps: &Capabilities| {
                    Ok(Box::new(MockBrowser::new(caps.clone(), page.clone())) as Box<dyn BrowserSession>)
                });

                let unit = BrowserTest::new(&title, DemoCase { events, fail_every }, factory)
                    .capabilities(Capabilities::new(browser, "mock"))
                    .output_path(run.report_path(index, &title, format))
                    .script("browser-harness demo");
                scheduler.queue(unit);
            }

            let summary = scheduler.start()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Run completed: {} units, {} passed, {} failed, {} errored in {:.2?}",
                    summary.completed(),
                    summary.passed(),
                    summary.failed(),
                    summary.errored(),
                    summary.elapsed
                );
                for record in summary.by_index() {
                    let outcome = match &record.outcome {
                        UnitOutcome::Success { passed: true } => "passed".to_string(),
                        UnitOutcome::Success { passed: false } => "failed".to_string(),
                        UnitOutcome::Failure { reason } => format!("error: {}", reason),
                    };
                    println!("  [{}] {}: {} ({:.2?})", record.index, record.label, outcome, record.elapsed);
                }
                println!("\nReports: {}", run.dir.display());
            }

            if !summary.all_passed() {
                std::process::exit(1);
            }
        }

        Commands::Inspect { report, verbose } => {
            let report = ScriptReport::load(&report)?;
            println!("{}", report.name);
            if let Some(browser) = &report.browser {
                println!("  Browser: {}", browser);
            }
            if let Some(script) = &report.script {
                println!("  Script: {}", script);
            }
            println!("  Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!(
                "  Totals: {} passed, {} warnings, {} failed",
                report.pass_count, report.warning_count, report.failure_count
            );
            for function in &report.functions {
                println!(
                    "  {} ({} passed, {} warnings, {} failed)",
                    function.name, function.pass_count, function.warning_count, function.fail_count
                );
                if verbose {
                    for event in &function.events {
                        println!("    [{}] {}: {}", event.status, event.title, event.message);
                        if let Some(path) = &event.screenshot_path {
                            println!("      screenshot: {}", path);
                        }
                        for frame in event.stack_trace.iter().flatten() {
                            println!("      at {}", frame);
                        }
                    }
                }
            }
        }

        Commands::Runs { action } => match action {
            RunsAction::List { output } => {
                let base = output.unwrap_or_else(|| cfg.output.base_dir.clone());
                let runs = list_runs(&base)?;
                if runs.is_empty() {
                    println!("No runs under {}", base.display());
                }
                for run in runs {
                    let reports = RunDirectory::in_dir(&run).list_reports()?.len();
                    println!("{} ({} reports)", run.display(), reports);
                }
            }
            RunsAction::Clean { output, max_age_hours } => {
                let base = output.unwrap_or_else(|| cfg.output.base_dir.clone());
                let max_age = max_age_hours.map(config::hours).unwrap_or(cfg.output.retention);
                let cleaned = cleanup_old_runs(&base, max_age)?;
                println!("Removed {} runs from {}", cleaned, base.display());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_demo_format_parses_into_report_format() {
        let args = Args::try_parse_from(["browser-harness", "demo", "--format", "HTML"]).unwrap();
        assert!(matches!(args.command, Commands::Demo { format: Some(ReportFormat::Html), .. }));
        assert!(Args::try_parse_from(["browser-harness", "demo", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_demo_options_read_environment() {
        let command = Args::command();
        let demo = command.find_subcommand("demo").unwrap();
        let env_of = |id: &str| {
            demo.get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|name| name.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("output").as_deref(), Some("HARNESS_OUTPUT_DIR"));
        assert_eq!(env_of("format").as_deref(), Some("HARNESS_REPORT_FORMAT"));
        assert_eq!(env_of("workers").as_deref(), Some("HARNESS_MAX_WORKERS"));
    }
}
