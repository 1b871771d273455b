//! Job — one image-production unit, from submission to terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapter::AdapterSpec;
use crate::task_type::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Error,
}

impl JobStatus {
    /// Whether `self -> next` is a legal step of `queued -> running ->
    /// {complete, error}`. Observed equal writes are treated as no-ops by
    /// the caller, not as valid transitions here.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Error)
                | (JobStatus::Running, JobStatus::Complete)
                | (JobStatus::Running, JobStatus::Error)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// One output image attached to a terminal job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub filename: String,
    pub subfolder: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub session_id: String,
    pub stage_index: u32,
    pub batch_id: Option<Uuid>,
    pub batch_index: Option<u32>,
    pub task_type: TaskType,
    pub model_family: String,
    pub checkpoint: Option<String>,
    pub loras: Vec<AdapterSpec>,
    /// Requested parameters snapshot, as received from the caller.
    pub params: serde_json::Value,
    pub seed: i64,
    /// Set exactly once at creation; never reassigned.
    pub assigned_worker: String,
    /// Set exactly once, and only while status = running.
    pub worker_job_id: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub terminal_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub outputs: Vec<OutputArtifact>,
}

impl Job {
    pub fn new(
        session_id: impl Into<String>,
        task_type: TaskType,
        model_family: impl Into<String>,
        params: serde_json::Value,
        seed: i64,
        assigned_worker: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            stage_index: 0,
            batch_id: None,
            batch_index: None,
            task_type,
            model_family: model_family.into(),
            checkpoint: None,
            loras: Vec::new(),
            params,
            seed,
            assigned_worker: assigned_worker.into(),
            worker_job_id: None,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            terminal_at: None,
            error_message: None,
            outputs: Vec::new(),
        }
    }

    /// Advance to `running`, idempotent: re-observing `running` is a no-op.
    pub fn mark_running(&mut self, worker_job_id: impl Into<String>) {
        if self.status == JobStatus::Running {
            return;
        }
        debug_assert!(self.status.can_transition_to(JobStatus::Running));
        self.status = JobStatus::Running;
        self.worker_job_id = Some(worker_job_id.into());
        self.started_at = Some(Utc::now());
    }

    /// Idempotent under repeated terminal signals: once terminal, later
    /// calls with an equal status are no-ops; calls with a different
    /// terminal status are rejected by the caller before reaching here.
    pub fn mark_complete(&mut self, outputs: Vec<OutputArtifact>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Complete;
        self.outputs = outputs;
        self.terminal_at = Some(Utc::now());
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Error;
        self.error_message = Some(message.into());
        self.terminal_at = Some(Utc::now());
    }
}
