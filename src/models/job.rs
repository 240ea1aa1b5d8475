// Long-running server jobs

use super::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Generate,
    Import,
    ApplyPolicies,
    Deploy,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Generate => "generate",
            JobKind::Import => "import",
            JobKind::ApplyPolicies => "apply-policies",
            JobKind::Deploy => "deploy",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status with the spellings the server is known to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[serde(alias = "pending", alias = "queued")]
    Started,
    #[serde(alias = "in_progress", alias = "deploying", alias = "scanning")]
    Running,
    #[serde(alias = "completed", alias = "success", alias = "succeeded")]
    Complete,
    #[serde(alias = "error", alias = "failure")]
    Failed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_started() -> JobStatus {
    JobStatus::Started
}

/// Reply of a job start endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStart {
    #[serde(
        alias = "import_id",
        alias = "deployment_id",
        alias = "task_id",
        deserialize_with = "wire::id"
    )]
    pub job_id: String,
    #[serde(default = "default_started")]
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl JobStart {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Started,
            message: None,
        }
    }
}

/// One status reply observed while polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    #[serde(default, alias = "progress", deserialize_with = "wire::percent")]
    pub progress_percentage: u8,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, alias = "outputs")]
    pub result: Option<Value>,
}

impl JobSnapshot {
    pub fn new(status: JobStatus, progress_percentage: u8) -> Self {
        Self {
            status,
            progress_percentage,
            current_step: None,
            logs: Vec::new(),
            errors: Vec::new(),
            result: None,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn with_logs<I, S>(mut self, logs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logs = logs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Fallback reason for a failed job that reported nothing
pub const JOB_FAILED_FALLBACK: &str = "The operation failed";

/// Client-side record of a job, advanced only by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress_percentage: u8,
    pub current_step: Option<String>,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub result: Option<Value>,
    #[serde(with = "wire::timestamp")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "wire::opt_timestamp")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(kind: JobKind, start: &JobStart) -> Self {
        Self {
            job_id: start.job_id.clone(),
            kind,
            status: start.status,
            progress_percentage: 0,
            current_step: None,
            logs: Vec::new(),
            errors: Vec::new(),
            result: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Fold a snapshot into the record.
    ///
    /// Progress never moves backwards. Returns the snapshot as it should be
    /// reported (progress clamped) and the log lines not seen before.
    pub fn absorb(&mut self, mut snapshot: JobSnapshot) -> (JobSnapshot, Vec<String>) {
        snapshot.progress_percentage = snapshot.progress_percentage.max(self.progress_percentage);

        // A shorter log list means the server trimmed it; only a longer one adds lines
        let new_lines = if snapshot.logs.len() > self.logs.len() {
            snapshot.logs[self.logs.len()..].to_vec()
        } else {
            Vec::new()
        };

        self.status = snapshot.status;
        self.progress_percentage = snapshot.progress_percentage;
        if snapshot.current_step.is_some() {
            self.current_step = snapshot.current_step.clone();
        }
        if snapshot.logs.len() >= self.logs.len() {
            self.logs = snapshot.logs.clone();
        }
        self.errors = snapshot.errors.clone();
        if snapshot.result.is_some() {
            self.result = snapshot.result.clone();
        }
        if snapshot.status.is_terminal() {
            self.finish(snapshot.status);
        }

        (snapshot, new_lines)
    }

    pub fn finish(&mut self, status: JobStatus) {
        self.status = status;
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// "<current step>: <last error>" for a failed job
    pub fn failure_reason(&self) -> String {
        let step = self.current_step.as_deref().filter(|s| !s.trim().is_empty());
        let last_error = self
            .errors
            .iter()
            .rev()
            .find(|e| !e.trim().is_empty())
            .map(String::as_str);
        match (step, last_error) {
            (Some(step), Some(error)) => format!("{}: {}", step, error),
            (Some(step), None) => step.to_string(),
            (None, Some(error)) => error.to_string(),
            (None, None) => JOB_FAILED_FALLBACK.to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
