// Deploy workflow: ready -> deploying -> deployed | error

use super::create::encode;
use super::{Effect, JobOutcome, WorkflowError, WorkflowKind};
use crate::models::{DeployRequest, JobKind};
use crate::notify::Notice;
use crate::routes::Route;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeployState {
    #[default]
    Ready,
    Deploying,
    Deployed,
    Error {
        reason: String,
    },
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployState::Ready => "ready",
            DeployState::Deploying => "deploying",
            DeployState::Deployed => "deployed",
            DeployState::Error { .. } => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeployInput {
    Start(DeployRequest),
    Stop,
    Job(JobOutcome),
    Reset,
}

impl DeployInput {
    fn name(&self) -> &'static str {
        match self {
            DeployInput::Start(_) => "start a deployment",
            DeployInput::Stop => "stop the deployment",
            DeployInput::Job(_) => "finish a job",
            DeployInput::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeployMachine {
    state: DeployState,
    request: Option<DeployRequest>,
}

impl DeployMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DeployState {
        &self.state
    }

    pub fn request(&self) -> Option<&DeployRequest> {
        self.request.as_ref()
    }

    pub fn handle(&mut self, input: DeployInput) -> Result<Vec<Effect>, WorkflowError> {
        use DeployInput as I;
        use DeployState as S;

        let state = self.state.clone();
        match (state, input) {
            (_, I::Reset) => {
                *self = Self::default();
                Ok(vec![Effect::DisposeJob {
                    slot: WorkflowKind::Deploy,
                }])
            }
            (S::Ready | S::Deployed | S::Error { .. }, I::Start(request)) => {
                if request.project_id.trim().is_empty() {
                    return Err(WorkflowError::Validation("Please select a project".into()));
                }
                if request.aws_account_id.trim().is_empty() {
                    return Err(WorkflowError::Validation(
                        "Please select an AWS account".into(),
                    ));
                }
                let payload = encode(&request)?;
                self.request = Some(request);
                self.state = S::Deploying;
                Ok(vec![Effect::StartJob {
                    slot: WorkflowKind::Deploy,
                    kind: JobKind::Deploy,
                    payload,
                }])
            }
            (S::Deploying, I::Stop) => Ok(vec![Effect::CancelJob {
                slot: WorkflowKind::Deploy,
            }]),
            (S::Deploying, I::Job(JobOutcome::Completed { .. })) => {
                self.state = S::Deployed;
                let mut effects = Vec::new();
                if let Some(request) = &self.request {
                    effects.push(Effect::Navigate(Route::Project(request.project_id.clone())));
                }
                effects.push(Effect::Notify(Notice::success("Deployment complete", "")));
                Ok(effects)
            }
            (S::Deploying, I::Job(JobOutcome::Failed { reason })) => {
                self.state = S::Error {
                    reason: reason.clone(),
                };
                Ok(vec![Effect::Notify(Notice::error("Deployment failed", reason))])
            }
            (S::Deploying, I::Job(JobOutcome::Cancelled)) => {
                self.state = S::Ready;
                Ok(vec![Effect::Notify(Notice::info("Deployment stopped", ""))])
            }
            (state, input) => Err(WorkflowError::invalid(state, input.name())),
        }
    }

    /// The job this machine waits on was torn down with its route
    pub fn abandon_job(&mut self) {
        if self.state == DeployState::Deploying {
            self.state = DeployState::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DeployRequest {
        DeployRequest {
            project_id: "p1".into(),
            aws_account_id: "acc-1".into(),
            region: None,
            environment: Some("production".into()),
        }
    }

    #[test]
    fn test_deploy_success_navigates_to_project() {
        let mut machine = DeployMachine::new();
        machine.handle(DeployInput::Start(request())).unwrap();
        assert_eq!(machine.state(), &DeployState::Deploying);

        let effects = machine
            .handle(DeployInput::Job(JobOutcome::Completed {
                job_id: "dep-1".into(),
                result: None,
            }))
            .unwrap();
        assert_eq!(machine.state(), &DeployState::Deployed);
        assert_eq!(effects[0], Effect::Navigate(Route::Project("p1".into())));
    }

    #[test]
    fn test_stop_only_while_deploying() {
        let mut machine = DeployMachine::new();
        assert!(machine.handle(DeployInput::Stop).is_err());

        machine.handle(DeployInput::Start(request())).unwrap();
        assert_eq!(
            machine.handle(DeployInput::Stop).unwrap(),
            vec![Effect::CancelJob {
                slot: WorkflowKind::Deploy
            }]
        );
        machine
            .handle(DeployInput::Job(JobOutcome::Cancelled))
            .unwrap();
        assert_eq!(machine.state(), &DeployState::Ready);
    }

    #[test]
    fn test_failure_records_reason_and_allows_retry() {
        let mut machine = DeployMachine::new();
        machine.handle(DeployInput::Start(request())).unwrap();
        machine
            .handle(DeployInput::Job(JobOutcome::Failed {
                reason: "Creating VPC: VpcLimitExceeded".into(),
            }))
            .unwrap();
        assert_eq!(
            machine.state(),
            &DeployState::Error {
                reason: "Creating VPC: VpcLimitExceeded".into()
            }
        );
        assert!(machine.handle(DeployInput::Start(request())).is_ok());
    }

    #[test]
    fn test_missing_account_is_rejected() {
        let mut machine = DeployMachine::new();
        let mut bad = request();
        bad.aws_account_id.clear();
        let err = machine.handle(DeployInput::Start(bad)).unwrap_err();
        assert_eq!(err, WorkflowError::Validation("Please select an AWS account".into()));
        assert_eq!(machine.state(), &DeployState::Ready);
    }
}
