use crate::workflow::{RipJob, RipReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(flatten)]
    pub job: RipJob,
    pub description: String,
    pub status: JobStatus,
    pub current_step: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub kept_files: Vec<PathBuf>,
    pub error: Option<String>,
    /// Machine-readable failure code, e.g. `extraction_failed`.
    pub error_code: Option<String>,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl Job {
    pub fn new(job: RipJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: job.describe(),
            job,
            status: JobStatus::Queued,
            current_step: None,
            output_dir: None,
            kept_files: Vec::new(),
            error: None,
            error_code: None,
            warnings: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn update_step(&mut self, step: &str) {
        self.current_step = Some(step.to_string());
    }

    pub fn complete(&mut self, report: RipReport) {
        self.status = JobStatus::Completed;
        self.current_step = None;
        self.output_dir = Some(report.output_dir);
        self.kept_files = report.kept_files;
        self.warnings = report.warnings;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, code: &str, error: &str) {
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
        self.error_code = Some(code.to_string());
        self.completed_at = Some(Utc::now());
    }

    pub fn cancel(&mut self) {
        self.status = JobStatus::Cancelled;
        self.current_step = None;
        self.completed_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobStats {
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl JobStats {
    pub fn success_rate(&self) -> f32 {
        if self.total_processed == 0 {
            return 0.0;
        }
        (self.successful as f32 / self.total_processed as f32) * 100.0
    }

    pub fn record_success(&mut self) {
        self.total_processed += 1;
        self.successful += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_processed += 1;
        self.failed += 1;
    }

    pub fn record_cancel(&mut self) {
        self.total_processed += 1;
        self.cancelled += 1;
    }
}
