use crate::config::Config;
use crate::error::RipError;
use crate::state::{AppState, Job};
use crate::storage::{SpaceProbe, StatvfsProbe};
use crate::workflow::{self, RipContext};
use ripforge_av::{CommandRunner, SystemRunner};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Dequeues rip jobs and runs each on the blocking pool.
///
/// Jobs for different devices run concurrently; [`AppState::dequeue_job`]
/// keeps a device to one job at a time.
pub struct JobProcessor {
    state: Arc<AppState>,
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    space: Arc<dyn SpaceProbe>,
    shutdown_rx: mpsc::Receiver<()>,
    idle_wait: Duration,
}

impl JobProcessor {
    pub fn new(state: Arc<AppState>, config: Arc<Config>, shutdown_rx: mpsc::Receiver<()>) -> Self {
        Self {
            state,
            config,
            runner: Arc::new(SystemRunner),
            space: Arc::new(StatvfsProbe),
            shutdown_rx,
            idle_wait: Duration::from_millis(900),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_space_probe(mut self, space: Arc<dyn SpaceProbe>) -> Self {
        self.space = space;
        self
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Start processing jobs from the queue
    pub async fn run(mut self) {
        tracing::info!("Job processor started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    tracing::info!("Job processor shutting down");
                    break;
                }
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }

            self.process_next_job().await;
        }
    }

    async fn process_next_job(&self) {
        let job = match self.state.dequeue_job() {
            Some(job) => job,
            None => {
                tokio::time::sleep(self.idle_wait).await;
                return;
            }
        };

        tracing::info!("Processing job {}: {}", job.id, job.description);

        tokio::spawn(execute_job(
            self.state.clone(),
            self.config.clone(),
            self.runner.clone(),
            self.space.clone(),
            job,
        ));
    }
}

async fn execute_job(
    state: Arc<AppState>,
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    space: Arc<dyn SpaceProbe>,
    job: Job,
) {
    let id = job.id;
    state.start_job(id);
    let cancel = state.cancel_flag(id).unwrap_or_default();

    let step_state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        let ctx = RipContext::new(&config, runner.as_ref(), space.as_ref())
            .with_cancel_flag(cancel)
            .with_step_callback(Box::new(move |step| {
                step_state.update_step(id, &step.to_string())
            }));
        workflow::run_job(&ctx, &job.job)
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            tracing::info!("Job {} completed: {:?}", id, report.output_dir);
            state.complete_job(id, report);
        }
        Ok(Err(RipError::Cancelled)) => {
            tracing::info!("Job {} cancelled", id);
            state.mark_cancelled(id);
        }
        Ok(Err(e)) => {
            tracing::error!("Job {} failed: {}", id, e);
            state.fail_job(id, e.code(), &e.to_string());
        }
        Err(e) => {
            tracing::error!("Job {} panicked: {}", id, e);
            state.fail_job(id, "panicked", &format!("job panicked: {}", e));
        }
    }
}
