//! Create workflow: choose, configure steps, generate, review, deploy
//!
//! ```text
//! choose -> configure(0..4) -> generating -> review -> deploying -> complete
//! ```
//!
//! Advancing a configure step requires the step to validate; going back never
//! does. Generating fills defaults for blank answers and an empty service
//! selection before the request is sent.

use super::{Effect, JobOutcome, WorkflowError, WorkflowKind};
use crate::models::{DeployRequest, GenerateRequest, JobKind};
use crate::notify::Notice;
use crate::questionnaire::{
    apply_defaults, by_id, validate_step, AnswerValue, Answers, QuestionnaireData, ServiceSelection,
    STEP_COUNT,
};
use crate::routes::Route;
use crate::session::ProjectDraft;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

const LAST_STEP: usize = STEP_COUNT - 1;

/// Actions offered on the choose screen
pub const CHOOSE_OPTIONS: &[&str] = &["Create New Architecture", "Load saved draft"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CreateState {
    #[default]
    Choose,
    Configure { step: usize },
    Generating,
    Review { project_id: String },
    Deploying { project_id: String },
    Complete { project_id: String },
}

impl fmt::Display for CreateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateState::Choose => f.write_str("choose"),
            CreateState::Configure { step } => write!(f, "configure({})", step),
            CreateState::Generating => f.write_str("generating"),
            CreateState::Review { .. } => f.write_str("review"),
            CreateState::Deploying { .. } => f.write_str("deploying"),
            CreateState::Complete { .. } => f.write_str("complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateInput {
    CreateNew,
    LoadDraft(ProjectDraft),
    SetAnswer {
        question_id: String,
        value: AnswerValue,
    },
    /// Flip one option of a multi-choice question
    Toggle {
        question_id: String,
        value: String,
    },
    SetServices(ServiceSelection),
    Next,
    Back,
    Generate,
    Deploy {
        aws_account_id: String,
        region: Option<String>,
    },
    Stop,
    Job(JobOutcome),
    StartOver,
}

impl CreateInput {
    fn name(&self) -> &'static str {
        match self {
            CreateInput::CreateNew => "create a new architecture",
            CreateInput::LoadDraft(_) => "load a draft",
            CreateInput::SetAnswer { .. } => "answer",
            CreateInput::Toggle { .. } => "toggle an option",
            CreateInput::SetServices(_) => "select services",
            CreateInput::Next => "continue",
            CreateInput::Back => "go back",
            CreateInput::Generate => "generate",
            CreateInput::Deploy { .. } => "deploy",
            CreateInput::Stop => "stop",
            CreateInput::Job(_) => "finish a job",
            CreateInput::StartOver => "start over",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateMachine {
    state: CreateState,
    answers: Answers,
    services: ServiceSelection,
    error: Option<String>,
}

impl CreateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CreateState {
        &self.state
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn services(&self) -> &ServiceSelection {
        &self.services
    }

    /// Last job failure, shown as a banner
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether "Next"/"Generate" should be enabled
    pub fn can_advance(&self) -> bool {
        match self.state {
            CreateState::Configure { step } => validate_step(&self.answers, step).is_valid(),
            _ => false,
        }
    }

    fn draft(&self, step: usize) -> ProjectDraft {
        ProjectDraft::new(self.answers.clone(), self.services.clone(), step)
    }

    fn start_fresh(&mut self) -> Vec<Effect> {
        self.answers = Answers::new();
        self.services = ServiceSelection::new();
        self.error = None;
        self.state = CreateState::Configure { step: 0 };
        Vec::new()
    }

    pub fn handle(&mut self, input: CreateInput) -> Result<Vec<Effect>, WorkflowError> {
        use CreateInput as I;
        use CreateState as S;

        let state = self.state.clone();
        match (state, input) {
            (_, I::StartOver) => {
                *self = Self::default();
                Ok(vec![Effect::DisposeJob {
                    slot: WorkflowKind::Create,
                }])
            }
            (S::Choose | S::Complete { .. }, I::CreateNew) => Ok(self.start_fresh()),
            (S::Choose, I::LoadDraft(draft)) => {
                self.answers = draft.answers;
                self.services = draft.selected_services;
                self.error = None;
                self.state = S::Configure {
                    step: draft.step.min(LAST_STEP),
                };
                Ok(Vec::new())
            }
            (S::Configure { .. }, I::SetAnswer { question_id, value }) => {
                if by_id(&question_id).is_none() {
                    return Err(WorkflowError::Validation(format!(
                        "Unknown question '{}'",
                        question_id
                    )));
                }
                self.answers.set(question_id, value);
                Ok(Vec::new())
            }
            (S::Configure { .. }, I::Toggle { question_id, value }) => {
                let question = by_id(&question_id).ok_or_else(|| {
                    WorkflowError::Validation(format!("Unknown question '{}'", question_id))
                })?;
                self.answers
                    .toggle(&question_id, &value, question.exclusive_value);
                Ok(Vec::new())
            }
            (S::Configure { .. }, I::SetServices(services)) => {
                self.services = services;
                Ok(Vec::new())
            }
            (S::Configure { step }, I::Next) if step < LAST_STEP => {
                let validation = validate_step(&self.answers, step);
                if let Some(reason) = validation.first_reason() {
                    return Err(WorkflowError::Validation(reason.to_string()));
                }
                self.state = S::Configure { step: step + 1 };
                Ok(vec![Effect::SaveDraft(self.draft(step + 1))])
            }
            (S::Configure { step: 0 }, I::Back) => {
                self.state = S::Choose;
                Ok(Vec::new())
            }
            (S::Configure { step }, I::Back) => {
                self.state = S::Configure { step: step - 1 };
                Ok(Vec::new())
            }
            (S::Configure { step: LAST_STEP }, I::Generate) => self.generate(),
            (S::Generating, I::Job(outcome)) => Ok(self.generated(outcome)),
            (S::Review { .. }, I::Back) => {
                self.state = S::Configure { step: LAST_STEP };
                Ok(Vec::new())
            }
            (
                S::Review { project_id },
                I::Deploy {
                    aws_account_id,
                    region,
                },
            ) => {
                if aws_account_id.trim().is_empty() {
                    return Err(WorkflowError::Validation(
                        "Please select an AWS account".to_string(),
                    ));
                }
                let request = DeployRequest {
                    project_id: project_id.clone(),
                    aws_account_id,
                    region,
                    environment: None,
                };
                let payload = encode(&request)?;
                self.error = None;
                self.state = S::Deploying { project_id };
                Ok(vec![Effect::StartJob {
                    slot: WorkflowKind::Create,
                    kind: JobKind::Deploy,
                    payload,
                }])
            }
            (S::Deploying { .. }, I::Stop) => Ok(vec![Effect::CancelJob {
                slot: WorkflowKind::Create,
            }]),
            (S::Deploying { project_id }, I::Job(outcome)) => Ok(self.deployed(project_id, outcome)),
            (state, input) => Err(WorkflowError::invalid(state, input.name())),
        }
    }

    fn generate(&mut self) -> Result<Vec<Effect>, WorkflowError> {
        let mut answers = self.answers.clone();
        let mut services = self.services.clone();
        let filled = apply_defaults(&mut answers, &mut services);

        for step in 0..STEP_COUNT {
            if let Some(reason) = validate_step(&answers, step).first_reason() {
                return Err(WorkflowError::Validation(reason.to_string()));
            }
        }

        let request = GenerateRequest::new(QuestionnaireData::new(answers.clone(), services.clone()));
        let payload = encode(&request)?;
        self.answers = answers;
        self.services = services;
        self.error = None;
        self.state = CreateState::Generating;

        let mut effects = vec![
            Effect::SaveDraft(self.draft(LAST_STEP)),
            Effect::StartJob {
                slot: WorkflowKind::Create,
                kind: JobKind::Generate,
                payload,
            },
        ];
        if !filled.is_empty() {
            effects.push(Effect::Notify(Notice::info(
                "Defaults applied",
                format!("Filled in {}", filled.join(", ")),
            )));
        }
        Ok(effects)
    }

    fn generated(&mut self, outcome: JobOutcome) -> Vec<Effect> {
        match outcome {
            JobOutcome::Completed { job_id, result } => {
                let project_id = result
                    .as_ref()
                    .and_then(|r| r.get("project_id"))
                    .and_then(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .unwrap_or(job_id);
                self.state = CreateState::Review {
                    project_id: project_id.clone(),
                };
                vec![
                    Effect::LoadProject(project_id.clone()),
                    Effect::Navigate(Route::Project(project_id)),
                    Effect::Notify(Notice::success("Architecture generated", "")),
                ]
            }
            JobOutcome::Failed { reason } => {
                self.state = CreateState::Configure { step: LAST_STEP };
                self.error = Some(reason.clone());
                vec![Effect::Notify(Notice::error("Generation failed", reason))]
            }
            JobOutcome::Cancelled => {
                self.state = CreateState::Configure { step: LAST_STEP };
                Vec::new()
            }
        }
    }

    fn deployed(&mut self, project_id: String, outcome: JobOutcome) -> Vec<Effect> {
        match outcome {
            JobOutcome::Completed { .. } => {
                self.state = CreateState::Complete {
                    project_id: project_id.clone(),
                };
                vec![
                    Effect::Navigate(Route::Project(project_id)),
                    Effect::Notify(Notice::success("Deployment complete", "")),
                ]
            }
            JobOutcome::Failed { reason } => {
                self.state = CreateState::Choose;
                self.error = Some(reason.clone());
                vec![Effect::Notify(Notice::error("Deployment failed", reason))]
            }
            JobOutcome::Cancelled => {
                self.state = CreateState::Choose;
                vec![Effect::Notify(Notice::info("Deployment stopped", ""))]
            }
        }
    }

    /// The job this machine waits on was torn down with its route
    pub fn abandon_job(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            CreateState::Generating => CreateState::Configure { step: LAST_STEP },
            CreateState::Deploying { project_id } => CreateState::Review { project_id },
            other => other,
        };
    }
}

pub(crate) fn encode<T: Serialize>(request: &T) -> Result<Value, WorkflowError> {
    serde_json::to_value(request)
        .map_err(|e| WorkflowError::State(format!("Failed to prepare request: {}", e)))
}
