//! Long-running server jobs
//!
//! A job is started through its kind's [`JobBackend`], then polled until the
//! server reports a terminal status. Observers receive callbacks through
//! [`JobCallbacks`]; exactly one terminal callback fires per run, and a
//! disposed run fires nothing further.

pub mod backend;
pub mod orchestrator;

pub use backend::{ApplyPoliciesBackend, DeployBackend, GenerateBackend, ImportBackend, JobBackend};
pub use orchestrator::{JobDisposer, JobError, JobHandle, JobOrchestrator, JobPhase, JobSlot};

use crate::models::{Job, JobSnapshot};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// Observer of one job run.
///
/// Callbacks run while the run's state lock is held, so they must not call
/// back into the [`JobHandle`] of the same run.
pub trait JobCallbacks: Send + Sync {
    fn on_start(&self, _job: &Job) {}

    /// Every observed snapshot, progress already clamped
    fn on_progress(&self, _job: &Job, _snapshot: &JobSnapshot) {}

    fn on_log(&self, _job: &Job, _line: &str) {}

    fn on_complete(&self, _job: &Job) {}

    /// `job` is `None` when the start request itself failed
    fn on_failure(&self, _job: Option<&Job>, _reason: &str) {}

    fn on_cancel(&self, _job: Option<&Job>) {}
}

/// Callbacks that do nothing
pub struct NoopCallbacks;

impl JobCallbacks for NoopCallbacks {}

/// A callback, as a message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    Started {
        job_id: String,
    },
    Progress {
        job_id: String,
        snapshot: JobSnapshot,
    },
    Log {
        job_id: String,
        line: String,
    },
    Completed {
        job_id: String,
        result: Option<Value>,
    },
    Failed {
        job_id: Option<String>,
        reason: String,
    },
    Cancelled {
        job_id: Option<String>,
    },
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Completed { .. } | JobEvent::Failed { .. } | JobEvent::Cancelled { .. }
        )
    }
}

/// Forwards every callback into an unbounded channel, tagged with `tag`
pub struct ChannelCallbacks<T> {
    tag: T,
    tx: mpsc::UnboundedSender<(T, JobEvent)>,
}

impl<T> ChannelCallbacks<T> {
    pub fn new(tag: T, tx: mpsc::UnboundedSender<(T, JobEvent)>) -> Self {
        Self { tag, tx }
    }
}

impl<T: Clone + Send + Sync> ChannelCallbacks<T> {
    fn send(&self, event: JobEvent) {
        // A closed receiver means nobody is listening any more
        let _ = self.tx.send((self.tag.clone(), event));
    }
}

impl<T: Clone + Send + Sync> JobCallbacks for ChannelCallbacks<T> {
    fn on_start(&self, job: &Job) {
        self.send(JobEvent::Started {
            job_id: job.job_id.clone(),
        });
    }

    fn on_progress(&self, job: &Job, snapshot: &JobSnapshot) {
        self.send(JobEvent::Progress {
            job_id: job.job_id.clone(),
            snapshot: snapshot.clone(),
        });
    }

    fn on_log(&self, job: &Job, line: &str) {
        self.send(JobEvent::Log {
            job_id: job.job_id.clone(),
            line: line.to_string(),
        });
    }

    fn on_complete(&self, job: &Job) {
        self.send(JobEvent::Completed {
            job_id: job.job_id.clone(),
            result: job.result.clone(),
        });
    }

    fn on_failure(&self, job: Option<&Job>, reason: &str) {
        self.send(JobEvent::Failed {
            job_id: job.map(|j| j.job_id.clone()),
            reason: reason.to_string(),
        });
    }

    fn on_cancel(&self, job: Option<&Job>) {
        self.send(JobEvent::Cancelled {
            job_id: job.map(|j| j.job_id.clone()),
        });
    }
}
