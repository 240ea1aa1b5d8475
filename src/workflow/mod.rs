//! Workflow state machines
//!
//! Each machine owns its data and a `state` enum, and changes only through
//! `handle(input)`. A transition returns the side effects to perform; the
//! machines never touch the network themselves. [`WorkflowController`]
//! interprets the effects and feeds job outcomes back in.

pub mod controller;
pub mod create;
pub mod deploy;
pub mod import;

pub use crate::routes::WorkflowKind;
pub use controller::{RunTag, WorkflowContext, WorkflowController};
pub use create::{CreateInput, CreateMachine, CreateState};
pub use deploy::{DeployInput, DeployMachine, DeployState};
pub use import::{ImportInput, ImportMachine, ImportState};

use crate::jobs::JobEvent;
use crate::models::JobKind;
use crate::notify::Notice;
use crate::routes::Route;
use crate::session::ProjectDraft;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Cannot {input} while {state}")]
    InvalidTransition { state: String, input: String },
    /// User input failed validation; the user can fix it and retry
    #[error("{0}")]
    Validation(String),
    /// The workflow lacks data the action needs
    #[error("{0}")]
    State(String),
}

impl WorkflowError {
    pub fn invalid(state: impl ToString, input: impl ToString) -> Self {
        WorkflowError::InvalidTransition {
            state: state.to_string(),
            input: input.to_string(),
        }
    }
}

/// Something a transition asks the controller to do
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartJob {
        slot: WorkflowKind,
        kind: JobKind,
        payload: Value,
    },
    CancelJob {
        slot: WorkflowKind,
    },
    DisposeJob {
        slot: WorkflowKind,
    },
    Navigate(Route),
    /// Make a project the current architecture
    LoadProject(String),
    CreateProjectFromImport {
        import_id: String,
        project_name: String,
        result: Option<Value>,
    },
    SaveDraft(ProjectDraft),
    Notify(Notice),
}

/// How a job run ended, as seen by a machine
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        job_id: String,
        result: Option<Value>,
    },
    Failed {
        reason: String,
    },
    Cancelled,
}

impl JobOutcome {
    /// The outcome carried by a terminal event
    pub fn from_event(event: &JobEvent) -> Option<JobOutcome> {
        match event {
            JobEvent::Completed { job_id, result } => Some(JobOutcome::Completed {
                job_id: job_id.clone(),
                result: result.clone(),
            }),
            JobEvent::Failed { reason, .. } => Some(JobOutcome::Failed {
                reason: reason.clone(),
            }),
            JobEvent::Cancelled { .. } => Some(JobOutcome::Cancelled),
            _ => None,
        }
    }
}
