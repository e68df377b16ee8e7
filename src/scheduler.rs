//! Concurrent execution of independent test units.
//!
//! Units are registered with [`Scheduler::queue`] and then run together by a
//! single [`Scheduler::start`] call. Every unit runs on its own worker
//! thread, builds its own reporter and reports back over a channel; `start`
//! drains one completion signal per unit, in completion order, before it
//! returns. A unit that errors or panics is recorded as a failure and never
//! disturbs its siblings.

use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config;
use crate::report;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Error types for scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// `start` was called a second time
    #[error("Scheduler has already been started")]
    AlreadyStarted,

    /// No worker thread could be created
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// One independently schedulable test execution
pub trait TestUnit: Send + 'static {
    /// Name used in logs and in the run summary
    fn label(&self) -> String;

    /// Build and run the test, returning whether it passed
    fn execute(self: Box<Self>) -> anyhow::Result<bool>;
}

/// Adapter that lets a closure be queued as a unit
pub struct FnUnit<F> {
    label: String,
    body: F,
}

impl<F> FnUnit<F>
where
    F: FnOnce() -> anyhow::Result<bool> + Send + 'static,
{
    pub fn new(label: impl Into<String>, body: F) -> Self {
        Self {
            label: label.into(),
            body,
        }
    }
}

impl<F> TestUnit for FnUnit<F>
where
    F: FnOnce() -> anyhow::Result<bool> + Send + 'static,
{
    fn label(&self) -> String {
        self.label.clone()
    }

    fn execute(self: Box<Self>) -> anyhow::Result<bool> {
        (self.body)()
    }
}

/// How a unit ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// Ran to completion; `passed` is the unit's own verdict
    Success { passed: bool },
    /// Returned an error or panicked
    Failure { reason: String },
}

impl UnitOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, UnitOutcome::Success { passed: true })
    }
}

/// Completion signal for one unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitRecord {
    /// Position in registration order
    pub index: usize,
    pub label: String,
    pub outcome: UnitOutcome,
    pub elapsed: Duration,
}

/// Everything `start` observed, in completion order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub submitted: usize,
    pub records: Vec<UnitRecord>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.records.len()
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.passed()).count()
    }

    /// Units that ran but reported a failed verdict
    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == UnitOutcome::Success { passed: false })
            .count()
    }

    /// Units that errored or panicked
    pub fn errored(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, UnitOutcome::Failure { .. }))
            .count()
    }

    pub fn all_passed(&self) -> bool {
        self.completed() == self.submitted && self.passed() == self.submitted
    }

    /// Records sorted back into registration order
    pub fn by_index(&self) -> Vec<&UnitRecord> {
        let mut records: Vec<&UnitRecord> = self.records.iter().collect();
        records.sort_by_key(|r| r.index);
        records
    }
}

/// Worker pool settings
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fixed number of worker threads; `None` spawns one thread per unit
    pub max_workers: Option<usize>,

    /// Prefix for worker thread names
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            thread_name: "harness-worker".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Settings from the global configuration
    pub fn from_env() -> Self {
        Self {
            max_workers: config::get().scheduler.max_workers,
            ..Default::default()
        }
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = (workers > 0).then_some(workers);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Started,
}

/// Registers test units, then runs them all concurrently
pub struct Scheduler {
    config: SchedulerConfig,
    pending: Vec<Box<dyn TestUnit>>,
    phase: Phase,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            phase: Phase::Registering,
        }
    }

    /// Register a unit. Returns false, and drops the unit, once started.
    pub fn queue(&mut self, unit: impl TestUnit) -> bool {
        if self.phase == Phase::Started {
            debug!(label = %unit.label(), "rejected unit queued after start");
            return false;
        }
        self.pending.push(Box::new(unit));
        true
    }

    /// Register a closure as a unit
    pub fn queue_fn<F>(&mut self, label: impl Into<String>, body: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<bool> + Send + 'static,
    {
        self.queue(FnUnit::new(label, body))
    }

    /// Units waiting for `start`
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.phase == Phase::Started
    }

    /// Run every queued unit and block until each has signalled completion.
    ///
    /// May be called once; later calls return [`SchedulerError::AlreadyStarted`].
    pub fn start(&mut self) -> SchedulerResult<RunSummary> {
        if self.phase == Phase::Started {
            return Err(SchedulerError::AlreadyStarted);
        }
        self.phase = Phase::Started;

        let units = std::mem::take(&mut self.pending);
        let submitted = units.len();
        let started = Instant::now();
        info!(units = submitted, workers = ?self.config.max_workers, "starting run");

        let (done_tx, done_rx) = mpsc::channel::<UnitRecord>();
        match self.config.max_workers {
            None => self.spawn_per_unit(units, &done_tx),
            Some(workers) => self.spawn_pool(units, workers, &done_tx)?,
        }
        drop(done_tx);

        let mut records = Vec::with_capacity(submitted);
        while records.len() < submitted {
            match done_rx.recv() {
                Ok(record) => {
                    info!(
                        unit = %record.label,
                        index = record.index,
                        outcome = ?record.outcome,
                        elapsed_ms = record.elapsed.as_millis() as u64,
                        "unit completed ({}/{})",
                        records.len() + 1,
                        submitted
                    );
                    records.push(record);
                }
                Err(_) => {
                    error!(
                        "All workers exited with {} of {} units unreported",
                        submitted - records.len(),
                        submitted
                    );
                    break;
                }
            }
        }

        let summary = RunSummary {
            submitted,
            records,
            elapsed: started.elapsed(),
        };
        info!(
            passed = summary.passed(),
            failed = summary.failed(),
            errored = summary.errored(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }

    fn spawn_per_unit(&self, units: Vec<Box<dyn TestUnit>>, done_tx: &mpsc::Sender<UnitRecord>) {
        for (index, unit) in units.into_iter().enumerate() {
            let label = unit.label();
            let tx = done_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.config.thread_name, index))
                .spawn(move || {
                    let _ = tx.send(run_unit(index, unit));
                });

            if let Err(e) = spawned {
                // The closure (and its sender) is dropped, so report for it here
                error!("Failed to spawn worker for unit '{}': {}", label, e);
                let _ = done_tx.send(UnitRecord {
                    index,
                    label,
                    outcome: UnitOutcome::Failure {
                        reason: format!("failed to spawn worker: {}", e),
                    },
                    elapsed: Duration::ZERO,
                });
            }
        }
    }

    fn spawn_pool(
        &self,
        units: Vec<Box<dyn TestUnit>>,
        workers: usize,
        done_tx: &mpsc::Sender<UnitRecord>,
    ) -> SchedulerResult<()> {
        let (job_tx, job_rx) = mpsc::channel::<(usize, Box<dyn TestUnit>)>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let workers = workers.min(units.len()).max(1);

        let mut spawned = 0;
        let mut last_error = None;
        for worker in 0..workers {
            let jobs = Arc::clone(&job_rx);
            let tx = done_tx.clone();
            let result = thread::Builder::new()
                .name(format!("{}-{}", self.config.thread_name, worker))
                .spawn(move || worker_loop(&jobs, &tx));
            match result {
                Ok(_) => spawned += 1,
                Err(e) => {
                    error!("Failed to spawn worker {}: {}", worker, e);
                    last_error = Some(e);
                }
            }
        }
        if spawned == 0 {
            if let Some(e) = last_error {
                return Err(SchedulerError::Spawn(e));
            }
        }

        for job in units.into_iter().enumerate() {
            // Workers only hang up after the job sender is dropped below
            let _ = job_tx.send(job);
        }
        Ok(())
    }
}

fn worker_loop(
    jobs: &Mutex<mpsc::Receiver<(usize, Box<dyn TestUnit>)>>,
    done_tx: &mpsc::Sender<UnitRecord>,
) {
    loop {
        let job = {
            let Ok(rx) = jobs.lock() else { return };
            rx.recv()
        };
        let Ok((index, unit)) = job else { return };
        if done_tx.send(run_unit(index, unit)).is_err() {
            return;
        }
    }
}

/// Run one unit inside a boundary that turns errors and panics into outcomes
fn run_unit(index: usize, unit: Box<dyn TestUnit>) -> UnitRecord {
    let label = unit.label();
    debug!(unit = %label, index, "unit starting");
    let started = Instant::now();

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| unit.execute())) {
        Ok(Ok(passed)) => UnitOutcome::Success { passed },
        Ok(Err(e)) => {
            warn!("Unit '{}' failed: {:#}", label, e);
            UnitOutcome::Failure {
                reason: format!("{:#}", e),
            }
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!("Unit '{}' panicked: {}", label, reason);
            UnitOutcome::Failure {
                reason: format!("panicked: {}", reason),
            }
        }
    };

    if report::discard_current() {
        debug!(unit = %label, "discarded worker-local reporter left by unit");
    }

    UnitRecord {
        index,
        label,
        outcome,
        elapsed: started.elapsed(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_start_waits_for_every_unit() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        for i in 0..8 {
            let counter = Arc::clone(&counter);
            assert!(scheduler.queue_fn(format!("unit-{}", i), move || {
                thread::sleep(Duration::from_millis((8 - i) * 5));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }));
        }

        let summary = scheduler.start().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert_eq!(summary.submitted, 8);
        assert_eq!(summary.completed(), 8);
        assert!(summary.all_passed());

        let indices: Vec<usize> = summary.by_index().iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_queue_after_start_is_rejected() {
        let mut scheduler = Scheduler::new();
        scheduler.queue_fn("only", || Ok(true));
        scheduler.start().unwrap();

        assert!(!scheduler.queue_fn("late", || Ok(true)));
        assert!(scheduler.is_empty());
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyStarted)));
    }

    #[test]
    fn test_failures_and_panics_are_isolated() {
        let mut scheduler = Scheduler::new();
        scheduler.queue_fn("passes", || Ok(true));
        scheduler.queue_fn("fails verdict", || Ok(false));
        scheduler.queue_fn("errors", || Err(anyhow::anyhow!("element not found")));
        scheduler.queue_fn("panics", || panic!("driver crashed"));

        let summary = scheduler.start().unwrap();
        assert_eq!(summary.completed(), 4);
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.errored(), 2);

        let by_index = summary.by_index();
        assert_eq!(
            by_index[2].outcome,
            UnitOutcome::Failure {
                reason: "element not found".to_string()
            }
        );
        assert_eq!(
            by_index[3].outcome,
            UnitOutcome::Failure {
                reason: "panicked: driver crashed".to_string()
            }
        );
    }

    #[test]
    fn test_fixed_pool_runs_all_units() {
        let mut scheduler = Scheduler::with_config(SchedulerConfig::default().max_workers(2));
        for i in 0..6 {
            scheduler.queue_fn(format!("unit-{}", i), move || Ok(i % 2 == 0));
        }

        let summary = scheduler.start().unwrap();
        assert_eq!(summary.completed(), 6);
        assert_eq!(summary.passed(), 3);
        assert_eq!(summary.failed(), 3);
    }

    #[test]
    fn test_pool_discards_leftover_worker_reporter() {
        let mut scheduler = Scheduler::with_config(SchedulerConfig::default().max_workers(1));
        scheduler.queue_fn("leaves state", || {
            report::with_current(|r| r.record("left", "behind", report::Status::Pass))?;
            Ok(true)
        });
        scheduler.queue_fn("sees fresh state", || {
            Ok(report::with_current(|r| r.script().is_none()))
        });

        let summary = scheduler.start().unwrap();
        assert!(summary.all_passed());
    }

    #[test]
    fn test_empty_start_returns_immediately() {
        let summary = Scheduler::new().start().unwrap();
        assert_eq!(summary.completed(), 0);
        assert!(summary.all_passed());
    }
}
