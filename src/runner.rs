//! The worker pool that converts a batch of files.
//!
//! A fixed number of worker tasks pull the next unclaimed file from a shared queue,
//! so uneven conversion times balance out. Each job runs in its own task: a panic
//! or unexpected error becomes that file's `unexpected_error` outcome and the worker
//! moves on. Outcomes funnel through one channel to a single collector, which
//! drives progress and restores discovery order for the report.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

use crate::config::{MjconvConfig, RunConfig};
use crate::discover::truncate_to_limit;
use crate::error::{ConfigError, JobError};
use crate::job::{Job, JobAbort, JobContext, Outcome, StagingArea, file_name_of, run_job};
use crate::tools::ToolRunner;

/// Receives a notification each time a job finishes. Observational only.
pub trait ProgressObserver {
    fn job_finished(&mut self, completed: usize, total: usize, outcome: &Outcome);
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct BatchRun {
    /// One outcome per scheduled file, in discovery order.
    pub outcomes: Vec<Outcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Most jobs observed executing at the same time.
    pub peak_concurrency: usize,
    /// Whether an operator interrupt stopped the run early.
    pub interrupted: bool,
}

impl BatchRun {
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Counts jobs in flight and remembers the peak.
#[derive(Debug, Default)]
pub struct ActivityGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityGauge {
    fn enter(&self) -> ActiveGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(self)
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the gauge when the job leaves the worker.
struct ActiveGuard<'a>(&'a ActivityGauge);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Files waiting for a worker; each is handed out exactly once.
struct WorkQueue {
    files: Vec<PathBuf>,
    next: AtomicUsize,
}

impl WorkQueue {
    fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            next: AtomicUsize::new(0),
        }
    }

    fn claim(&self) -> Option<(usize, PathBuf)> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.files.get(index).map(|path| (index, path.clone()))
    }
}

enum WorkerMessage {
    Finished { index: usize, outcome: Outcome },
    Fatal(ConfigError),
}

/// Runs conversion jobs across a fixed-size worker pool.
pub struct JobRunner<R> {
    runner: Arc<R>,
    config: MjconvConfig,
    run: RunConfig,
    output_dir: PathBuf,
    interrupt: Arc<AtomicBool>,
}

impl<R: ToolRunner + 'static> JobRunner<R> {
    pub fn new(
        runner: Arc<R>,
        config: MjconvConfig,
        run: RunConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            config,
            run,
            output_dir: output_dir.into(),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that, once set, stops workers from claiming further files. Jobs
    /// already running finish normally.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Converts `inputs` (truncated to the configured limit) and returns their
    /// outcomes in input order.
    ///
    /// Fails only when no job could succeed, e.g. the converter cannot be started.
    pub async fn run(
        &self,
        inputs: Vec<PathBuf>,
        progress: &mut impl ProgressObserver,
    ) -> Result<BatchRun, ConfigError> {
        let started_at = Utc::now();
        let files = truncate_to_limit(inputs, self.run.limit);
        let total = files.len();
        let names: Vec<String> = files.iter().map(|p| file_name_of(p)).collect();

        let staging = StagingArea::new().map_err(ConfigError::Staging)?;
        let ctx = Arc::new(JobContext {
            runner: Arc::clone(&self.runner),
            config: self.config.clone(),
            validate: self.run.validate,
            output_dir: self.output_dir.clone(),
            staging,
        });
        let queue = Arc::new(WorkQueue::new(files));
        let gauge = Arc::new(ActivityGauge::default());
        let halt = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let pool_size = self.run.workers.min(total);
        debug!(total, workers = pool_size, validate = self.run.validate, "starting batch");

        let mut workers = JoinSet::new();
        for worker in 0..pool_size {
            workers.spawn(worker_loop(
                worker,
                Arc::clone(&ctx),
                Arc::clone(&queue),
                Arc::clone(&gauge),
                Arc::clone(&halt),
                Arc::clone(&self.interrupt),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut slots: Vec<Option<Outcome>> = vec![None; total];
        let mut completed = 0usize;
        let mut fatal: Option<ConfigError> = None;

        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::Finished { index, outcome } => {
                    completed += 1;
                    debug!(
                        index,
                        file = %outcome.file,
                        status = ?outcome.status,
                        completed,
                        total,
                        "job finished"
                    );
                    progress.job_finished(completed, total, &outcome);
                    slots[index] = Some(outcome);
                }
                WorkerMessage::Fatal(e) => {
                    halt.store(true, Ordering::SeqCst);
                    if fatal.is_none() {
                        error!(error = %e, "aborting batch");
                        fatal = Some(e);
                    }
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        let interrupted = completed < total && self.interrupt.load(Ordering::SeqCst);
        if interrupted {
            warn!(completed, total, "batch interrupted");
        }

        let outcomes = slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| slot.unwrap_or_else(|| Outcome::skipped(name, "interrupted")))
            .collect();

        Ok(BatchRun {
            outcomes,
            started_at,
            finished_at: Utc::now(),
            peak_concurrency: gauge.peak(),
            interrupted,
        })
    }
}

async fn worker_loop<R: ToolRunner + 'static>(
    worker: usize,
    ctx: Arc<JobContext<R>>,
    queue: Arc<WorkQueue>,
    gauge: Arc<ActivityGauge>,
    halt: Arc<AtomicBool>,
    interrupt: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
) {
    loop {
        if halt.load(Ordering::SeqCst) || interrupt.load(Ordering::SeqCst) {
            debug!(worker, "stop requested; not claiming more work");
            break;
        }
        let Some((index, input)) = queue.claim() else {
            break;
        };

        let _active = gauge.enter();
        let job = Job::new(index, input);
        let name = job.file_name();
        debug!(worker, index, file = %name, "claimed");

        let job_ctx = Arc::clone(&ctx);
        let handle = tokio::spawn(async move { run_job(&job_ctx, job).await });

        let message = match handle.await {
            Ok(Ok(outcome)) => WorkerMessage::Finished { index, outcome },
            Ok(Err(JobAbort::Fatal(e))) => WorkerMessage::Fatal(e),
            Ok(Err(JobAbort::Unexpected(e))) => {
                let detail = format!("{e:#}");
                warn!(file = %name, error = %detail, "job failed unexpectedly");
                WorkerMessage::Finished {
                    index,
                    outcome: Outcome::failed(name, &JobError::Unexpected(detail)),
                }
            }
            Err(join) => {
                let detail = join_failure(join);
                warn!(file = %name, error = %detail, "job task crashed");
                WorkerMessage::Finished {
                    index,
                    outcome: Outcome::failed(name, &JobError::Unexpected(detail)),
                }
            }
        };

        if tx.send(message).is_err() {
            break;
        }
    }
}

/// Describes why a job task did not return.
fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return "job task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic".to_string()
    }
}
