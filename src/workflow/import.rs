//! Import workflow: scan an existing account, review it, then either apply
//! security fixes or turn the import into a project
//!
//! ```text
//! configure -> scanning -> review -> applying -> review
//!                                 -> creating_project -> complete
//! ```

use super::create::encode;
use super::{Effect, JobOutcome, WorkflowError, WorkflowKind};
use crate::models::{ApplyPoliciesRequest, ImportExistingRequest, ImportResult, JobKind, SecurityFinding};
use crate::notify::Notice;
use crate::routes::Route;
use crate::services::import::regions;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImportState {
    #[default]
    Configure,
    Scanning,
    Review,
    Applying,
    CreatingProject,
    Complete {
        project_id: String,
    },
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportState::Configure => "configure",
            ImportState::Scanning => "scanning",
            ImportState::Review => "review",
            ImportState::Applying => "apply",
            ImportState::CreatingProject => "create-project",
            ImportState::Complete { .. } => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportInput {
    SelectAccount(Option<String>),
    SetRegions(Vec<String>),
    SetProjectName(String),
    Submit,
    Job(JobOutcome),
    /// Select or deselect one security gap for fixing
    ToggleGap(String),
    ApplyFixes,
    CreateProject,
    ProjectCreated { project_id: String },
    ProjectCreationFailed { reason: String },
    Reset,
}

impl ImportInput {
    fn name(&self) -> &'static str {
        match self {
            ImportInput::SelectAccount(_) => "select an account",
            ImportInput::SetRegions(_) => "choose regions",
            ImportInput::SetProjectName(_) => "name the project",
            ImportInput::Submit => "start a scan",
            ImportInput::Job(_) => "finish a job",
            ImportInput::ToggleGap(_) => "select a security gap",
            ImportInput::ApplyFixes => "apply security fixes",
            ImportInput::CreateProject => "create a project",
            ImportInput::ProjectCreated { .. } | ImportInput::ProjectCreationFailed { .. } => {
                "finish creating a project"
            }
            ImportInput::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportMachine {
    state: ImportState,
    aws_account_id: Option<String>,
    regions: Vec<String>,
    project_name: Option<String>,
    import_id: Option<String>,
    result: ImportResult,
    selected_gaps: BTreeSet<String>,
    /// Gaps sent with the running apply job
    applying: Vec<String>,
}

impl ImportMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn aws_account_id(&self) -> Option<&str> {
        self.aws_account_id.as_deref()
    }

    pub fn import_id(&self) -> Option<&str> {
        self.import_id.as_deref()
    }

    pub fn result(&self) -> &ImportResult {
        &self.result
    }

    pub fn findings(&self) -> &[SecurityFinding] {
        self.result
            .security_analysis
            .as_ref()
            .map(|a| a.findings.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_gaps(&self) -> &BTreeSet<String> {
        &self.selected_gaps
    }

    pub fn handle(&mut self, input: ImportInput) -> Result<Vec<Effect>, WorkflowError> {
        use ImportInput as I;
        use ImportState as S;

        let state = self.state.clone();
        match (state, input) {
            (_, I::Reset) => {
                *self = Self::default();
                Ok(vec![Effect::DisposeJob {
                    slot: WorkflowKind::Import,
                }])
            }
            (S::Configure, I::SelectAccount(account)) => {
                self.aws_account_id = account.filter(|a| !a.trim().is_empty());
                Ok(Vec::new())
            }
            (S::Configure, I::SetRegions(selected)) => {
                if let Some(unknown) = selected
                    .iter()
                    .find(|r| !regions().iter().any(|known| known.code == r.as_str()))
                {
                    return Err(WorkflowError::Validation(format!("Unknown region '{}'", unknown)));
                }
                self.regions = selected;
                Ok(Vec::new())
            }
            (S::Configure | S::Review, I::SetProjectName(name)) => {
                self.project_name = Some(name).filter(|n| !n.trim().is_empty());
                Ok(Vec::new())
            }
            (S::Configure, I::Submit) => {
                let Some(aws_account_id) = self.aws_account_id.clone() else {
                    return Err(WorkflowError::Validation(
                        "Please select an AWS account".to_string(),
                    ));
                };
                let payload = encode(&ImportExistingRequest {
                    aws_account_id,
                    regions: self.regions.clone(),
                    project_name: self.project_name.clone(),
                })?;
                self.state = S::Scanning;
                Ok(vec![Effect::StartJob {
                    slot: WorkflowKind::Import,
                    kind: JobKind::Import,
                    payload,
                }])
            }
            (S::Scanning, I::Job(outcome)) => Ok(self.scanned(outcome)),
            (S::Review, I::ToggleGap(gap_id)) => {
                if !self.findings().iter().any(|f| f.id == gap_id) {
                    return Err(WorkflowError::Validation(format!(
                        "Unknown security gap '{}'",
                        gap_id
                    )));
                }
                if !self.selected_gaps.remove(&gap_id) {
                    self.selected_gaps.insert(gap_id);
                }
                Ok(Vec::new())
            }
            (S::Review, I::ApplyFixes) => self.apply_fixes(),
            (S::Applying, I::Job(outcome)) => Ok(self.applied(outcome)),
            (S::Review, I::CreateProject) => {
                let import_id = self
                    .import_id
                    .clone()
                    .ok_or_else(|| WorkflowError::State("No import to create a project from".into()))?;
                let project_name = self
                    .project_name
                    .clone()
                    .unwrap_or_else(|| self.default_project_name());
                let result = encode(&self.result)?;
                self.state = S::CreatingProject;
                Ok(vec![Effect::CreateProjectFromImport {
                    import_id,
                    project_name,
                    result: Some(result),
                }])
            }
            (S::CreatingProject, I::ProjectCreated { project_id }) => {
                self.state = S::Complete {
                    project_id: project_id.clone(),
                };
                Ok(vec![
                    Effect::LoadProject(project_id.clone()),
                    Effect::Navigate(Route::Project(project_id)),
                    Effect::Notify(Notice::success("Project created from import", "")),
                ])
            }
            (S::CreatingProject, I::ProjectCreationFailed { reason }) => {
                self.state = S::Review;
                Ok(vec![Effect::Notify(Notice::error("Failed to create project", reason))])
            }
            (state, input) => Err(WorkflowError::invalid(state, input.name())),
        }
    }

    fn default_project_name(&self) -> String {
        match &self.aws_account_id {
            Some(account) => format!("Imported from {}", account),
            None => "Imported Infrastructure".to_string(),
        }
    }

    fn scanned(&mut self, outcome: JobOutcome) -> Vec<Effect> {
        match outcome {
            JobOutcome::Completed { job_id, result } => {
                self.result = decode_result(result);
                self.import_id = Some(self.result.import_id.clone().unwrap_or(job_id));
                self.selected_gaps.clear();
                self.state = ImportState::Review;
                let findings = self.findings().len();
                vec![Effect::Notify(Notice::success(
                    "Import complete",
                    format!("{} security gap(s) found", findings),
                ))]
            }
            JobOutcome::Failed { reason } => {
                self.state = ImportState::Configure;
                vec![Effect::Notify(Notice::error("Import failed", reason))]
            }
            JobOutcome::Cancelled => {
                self.state = ImportState::Configure;
                Vec::new()
            }
        }
    }

    fn apply_fixes(&mut self) -> Result<Vec<Effect>, WorkflowError> {
        let import_id = self
            .import_id
            .clone()
            .ok_or_else(|| WorkflowError::State("No import to apply fixes to".into()))?;
        let aws_account_id = self
            .aws_account_id
            .clone()
            .ok_or_else(|| WorkflowError::State("No AWS account for this import".into()))?;
        if self.selected_gaps.is_empty() {
            return Err(WorkflowError::Validation(
                "Select at least one security gap to fix".to_string(),
            ));
        }

        let gap_ids: Vec<String> = self.selected_gaps.iter().cloned().collect();
        let payload = encode(&ApplyPoliciesRequest {
            import_id,
            aws_account_id,
            gap_ids: gap_ids.clone(),
        })?;
        self.applying = gap_ids;
        self.state = ImportState::Applying;
        Ok(vec![Effect::StartJob {
            slot: WorkflowKind::Import,
            kind: JobKind::ApplyPolicies,
            payload,
        }])
    }

    fn applied(&mut self, outcome: JobOutcome) -> Vec<Effect> {
        self.state = ImportState::Review;
        let applying = std::mem::take(&mut self.applying);
        match outcome {
            JobOutcome::Completed { result, .. } => {
                let refreshed = result
                    .as_ref()
                    .and_then(|r| r.get("security_analysis"))
                    .and_then(|a| serde_json::from_value(a.clone()).ok());
                match refreshed {
                    Some(analysis) => self.result.security_analysis = Some(analysis),
                    None => {
                        if let Some(analysis) = self.result.security_analysis.as_mut() {
                            analysis.findings.retain(|f| !applying.contains(&f.id));
                        }
                    }
                }
                self.selected_gaps.clear();
                vec![Effect::Notify(Notice::success(
                    "Security fixes applied",
                    format!("{} fix(es) applied", applying.len()),
                ))]
            }
            JobOutcome::Failed { reason } => {
                vec![Effect::Notify(Notice::error("Failed to apply security fixes", reason))]
            }
            JobOutcome::Cancelled => Vec::new(),
        }
    }

    /// The job this machine waits on was torn down with its route
    pub fn abandon_job(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            ImportState::Scanning => ImportState::Configure,
            ImportState::Applying => {
                self.applying.clear();
                ImportState::Review
            }
            other => other,
        };
    }
}

fn decode_result(result: Option<Value>) -> ImportResult {
    let Some(value) = result else {
        return ImportResult::default();
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("[ImportWorkflow] Unreadable import result: {}", e);
        ImportResult::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reviewed() -> ImportMachine {
        let mut machine = ImportMachine::new();
        machine
            .handle(ImportInput::SelectAccount(Some("acc-1".into())))
            .unwrap();
        machine.handle(ImportInput::Submit).unwrap();
        machine
            .handle(ImportInput::Job(JobOutcome::Completed {
                job_id: "imp-1".into(),
                result: Some(json!({
                    "inventory": {"resources": {"ec2": [{"id": "i-1"}]}},
                    "security_analysis": {"security_gaps": [
                        {"id": "g1", "severity": "high", "title": "Open SSH"},
                        {"id": "g2", "severity": "low", "title": "No tags"}
                    ]}
                })),
            }))
            .unwrap();
        machine
    }

    #[test]
    fn test_submit_without_account_stays_in_configure() {
        let mut machine = ImportMachine::new();
        let err = machine.handle(ImportInput::Submit).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Validation("Please select an AWS account".into())
        );
        assert_eq!(machine.state(), &ImportState::Configure);
    }

    #[test]
    fn test_submit_starts_import_job() {
        let mut machine = ImportMachine::new();
        machine
            .handle(ImportInput::SelectAccount(Some("acc-1".into())))
            .unwrap();
        machine
            .handle(ImportInput::SetRegions(vec!["us-east-1".into()]))
            .unwrap();
        let effects = machine.handle(ImportInput::Submit).unwrap();
        assert_eq!(machine.state(), &ImportState::Scanning);
        match &effects[..] {
            [Effect::StartJob { kind, payload, .. }] => {
                assert_eq!(*kind, JobKind::Import);
                assert_eq!(payload, &json!({"aws_account_id": "acc-1", "regions": ["us-east-1"]}));
            }
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        let mut machine = ImportMachine::new();
        let err = machine
            .handle(ImportInput::SetRegions(vec!["mars-north-1".into()]))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn test_completed_scan_moves_to_review() {
        let machine = reviewed();
        assert_eq!(machine.state(), &ImportState::Review);
        assert_eq!(machine.import_id(), Some("imp-1"));
        assert_eq!(machine.findings().len(), 2);
    }

    #[test]
    fn test_apply_fixes_needs_a_selection() {
        let mut machine = reviewed();
        let err = machine.handle(ImportInput::ApplyFixes).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(machine.state(), &ImportState::Review);
    }

    #[test]
    fn test_apply_fixes_round_trip_refreshes_findings() {
        let mut machine = reviewed();
        machine.handle(ImportInput::ToggleGap("g1".into())).unwrap();
        let effects = machine.handle(ImportInput::ApplyFixes).unwrap();
        assert_eq!(machine.state(), &ImportState::Applying);
        match &effects[..] {
            [Effect::StartJob { kind, payload, .. }] => {
                assert_eq!(*kind, JobKind::ApplyPolicies);
                assert_eq!(payload["import_id"], "imp-1");
                assert_eq!(payload["aws_account_id"], "acc-1");
                assert_eq!(payload["gap_ids"], json!(["g1"]));
            }
            other => panic!("unexpected effects {:?}", other),
        }

        machine
            .handle(ImportInput::Job(JobOutcome::Completed {
                job_id: "dep-9".into(),
                result: None,
            }))
            .unwrap();
        assert_eq!(machine.state(), &ImportState::Review);
        let remaining: Vec<_> = machine.findings().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(remaining, vec!["g2"]);
        assert!(machine.selected_gaps().is_empty());
    }

    #[test]
    fn test_create_project_from_import() {
        let mut machine = reviewed();
        let effects = machine.handle(ImportInput::CreateProject).unwrap();
        assert_eq!(machine.state(), &ImportState::CreatingProject);
        assert!(matches!(
            &effects[..],
            [Effect::CreateProjectFromImport { import_id, project_name, .. }]
                if import_id == "imp-1" && project_name == "Imported from acc-1"
        ));

        let effects = machine
            .handle(ImportInput::ProjectCreated {
                project_id: "p7".into(),
            })
            .unwrap();
        assert_eq!(
            machine.state(),
            &ImportState::Complete {
                project_id: "p7".into()
            }
        );
        assert!(effects.contains(&Effect::Navigate(Route::Project("p7".into()))));
    }

    #[test]
    fn test_failed_scan_returns_to_configure() {
        let mut machine = ImportMachine::new();
        machine
            .handle(ImportInput::SelectAccount(Some("acc-1".into())))
            .unwrap();
        machine.handle(ImportInput::Submit).unwrap();
        machine
            .handle(ImportInput::Job(JobOutcome::Failed {
                reason: "AccessDenied".into(),
            }))
            .unwrap();
        assert_eq!(machine.state(), &ImportState::Configure);
        assert_eq!(machine.aws_account_id(), Some("acc-1"));
    }
}
