mod types;

pub use types::*;

use crate::workflow::{RipJob, RipReport};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const MAX_HISTORY_SIZE: usize = 1000;

/// Job lifecycle event, broadcast to `/api/events` subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AppEvent {
    JobQueued {
        #[serde(flatten)]
        job: Job,
    },
    JobStarted {
        id: Uuid,
        device: PathBuf,
    },
    JobStep {
        id: Uuid,
        step: String,
    },
    JobCompleted {
        #[serde(flatten)]
        job: Job,
    },
    JobFailed {
        id: Uuid,
        code: String,
        error: String,
    },
    JobCancelled {
        id: Uuid,
    },
}

/// What [`AppState::cancel_job`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The job was still queued and has been dropped.
    Cancelled,
    /// The job is running; it stops at its next step.
    Requested,
}

/// In-memory job table, submission queue and history.
///
/// A device is busy from the moment one of its jobs is dequeued until that
/// job finishes; [`AppState::dequeue_job`] skips jobs for busy devices.
pub struct AppState {
    jobs: RwLock<HashMap<Uuid, Job>>,
    queue: RwLock<VecDeque<Uuid>>,
    history: RwLock<VecDeque<Job>>,
    stats: RwLock<JobStats>,
    busy_devices: RwLock<HashSet<PathBuf>>,
    cancel_flags: RwLock<HashMap<Uuid, Arc<AtomicBool>>>,
    event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            queue: RwLock::new(VecDeque::new()),
            history: RwLock::new(VecDeque::new()),
            stats: RwLock::new(JobStats::default()),
            busy_devices: RwLock::new(HashSet::new()),
            cancel_flags: RwLock::new(HashMap::new()),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: AppEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("No subscribers for job event");
        }
    }

    /// Queue a rip. Jobs for a device that already has one queued or running
    /// wait behind it.
    pub fn queue_job(&self, rip: RipJob) -> Job {
        let job = Job::new(rip);
        let id = job.id;

        self.jobs.write().insert(id, job.clone());
        self.cancel_flags
            .write()
            .insert(id, Arc::new(AtomicBool::new(false)));
        self.queue.write().push_back(id);

        tracing::info!("Queued job {}: {}", id, job.description);
        self.broadcast(AppEvent::JobQueued { job: job.clone() });

        job
    }

    /// Take the oldest queued job whose device is idle and mark the device busy.
    pub fn dequeue_job(&self) -> Option<Job> {
        let mut queue = self.queue.write();
        let jobs = self.jobs.read();
        let mut busy = self.busy_devices.write();

        let pos = queue.iter().position(|id| {
            jobs.get(id)
                .map(|j| !busy.contains(&j.job.device))
                .unwrap_or(false)
        })?;
        let id = queue.remove(pos)?;
        let job = jobs.get(&id)?.clone();
        busy.insert(job.job.device.clone());

        Some(job)
    }

    pub fn cancel_flag(&self, id: Uuid) -> Option<Arc<AtomicBool>> {
        self.cancel_flags.read().get(&id).cloned()
    }

    /// Mark a dequeued job as running.
    pub fn start_job(&self, id: Uuid) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(&id) {
            job.start();
            let device = job.job.device.clone();
            drop(jobs);
            self.broadcast(AppEvent::JobStarted { id, device });
        }
    }

    pub fn update_step(&self, id: Uuid, step: &str) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(&id) {
            job.update_step(step);
            drop(jobs);
            self.broadcast(AppEvent::JobStep {
                id,
                step: step.to_string(),
            });
        }
    }

    pub fn complete_job(&self, id: Uuid, report: RipReport) {
        let job = self.finish(id, |job| job.complete(report));
        if let Some(job) = job {
            self.stats.write().record_success();
            self.broadcast(AppEvent::JobCompleted { job });
        }
    }

    /// Record a failure with its machine-readable `code` (see
    /// [`RipError::code`](crate::RipError::code)).
    pub fn fail_job(&self, id: Uuid, code: &str, error: &str) {
        if self.finish(id, |job| job.fail(code, error)).is_some() {
            self.stats.write().record_failure();
            self.broadcast(AppEvent::JobFailed {
                id,
                code: code.to_string(),
                error: error.to_string(),
            });
        }
    }

    /// Record that a running job stopped because it was cancelled.
    pub fn mark_cancelled(&self, id: Uuid) {
        if self.finish(id, Job::cancel).is_some() {
            self.stats.write().record_cancel();
            self.broadcast(AppEvent::JobCancelled { id });
        }
    }

    /// Cancel a queued or running job. `None` if the job is not active.
    ///
    /// A job already taken off the queue but not yet started counts as
    /// running: its flag is set and the workflow stops at its first step.
    pub fn cancel_job(&self, id: Uuid) -> Option<CancelOutcome> {
        let was_queued = {
            let mut queue = self.queue.write();
            match queue.iter().position(|q| *q == id) {
                Some(pos) => {
                    queue.remove(pos);
                    true
                }
                None => false,
            }
        };

        if was_queued {
            tracing::info!("Cancelled queued job {}", id);
            self.mark_cancelled(id);
            return Some(CancelOutcome::Cancelled);
        }

        let active = self
            .jobs
            .read()
            .get(&id)
            .map(|j| !j.status.is_finished())
            .unwrap_or(false);
        if !active {
            return None;
        }

        if let Some(flag) = self.cancel_flag(id) {
            flag.store(true, Ordering::SeqCst);
        }
        tracing::info!("Cancellation requested for running job {}", id);
        Some(CancelOutcome::Requested)
    }

    /// Move a job from the active table into history and release its device.
    fn finish(&self, id: Uuid, update: impl FnOnce(&mut Job)) -> Option<Job> {
        let mut job = self.jobs.write().remove(&id)?;
        let was_running = job.status == JobStatus::Running;
        update(&mut job);

        self.cancel_flags.write().remove(&id);
        if was_running {
            self.busy_devices.write().remove(&job.job.device);
        }

        let mut history = self.history.write();
        history.push_front(job.clone());
        while history.len() > MAX_HISTORY_SIZE {
            history.pop_back();
        }

        Some(job)
    }

    /// Look a job up among active jobs, then history.
    pub fn get_job(&self, id: Uuid) -> Option<Job> {
        if let Some(job) = self.jobs.read().get(&id) {
            return Some(job.clone());
        }
        self.history.read().iter().find(|j| j.id == id).cloned()
    }

    /// Queued and running jobs, oldest first.
    pub fn get_active_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    pub fn get_queue(&self) -> Vec<Uuid> {
        self.queue.read().iter().cloned().collect()
    }

    pub fn get_history(&self, limit: usize) -> Vec<Job> {
        self.history.read().iter().take(limit).cloned().collect()
    }

    pub fn get_stats(&self) -> JobStats {
        self.stats.read().clone()
    }

    pub fn is_device_busy(&self, device: &Path) -> bool {
        self.busy_devices.read().contains(device)
    }
}
