//! Runs the three workflow machines against the real world
//!
//! The controller owns one [`JobSlot`] per workflow. Job callbacks arrive on
//! an mpsc channel tagged with the run that produced them; events from a run
//! that is no longer the slot's current one are dropped. Terminal events are
//! fed back into the owning machine as [`JobOutcome`]s.
//!
//! A job belongs to the route it was started on. Whatever moves the navigator
//! off that route (a link, a redirect after logout) disposes the job: a guard
//! task tears the run down at once, and the controller rolls the machine back
//! the next time it is driven.

use super::{
    CreateInput, CreateMachine, DeployInput, DeployMachine, Effect, ImportInput, ImportMachine,
    JobOutcome, WorkflowError, WorkflowKind,
};
use crate::events::{
    EventBroadcaster, JobFinishedPayload, JobLogPayload, JobProgressPayload, JobStartedPayload,
    WorkflowStateChangedPayload, EVENT_JOB_CANCELLED, EVENT_JOB_COMPLETED, EVENT_JOB_FAILED,
    EVENT_JOB_LOG, EVENT_JOB_PROGRESS, EVENT_JOB_STARTED, EVENT_WORKFLOW_STATE_CHANGED,
};
use crate::jobs::{ChannelCallbacks, JobDisposer, JobEvent, JobOrchestrator, JobPhase, JobSlot};
use crate::models::{ArchitectureData, Job, JobKind, NewProject};
use crate::notify::{Notice, Notifier};
use crate::routes::{NavigationState, Navigator, Route, RouteDecision};
use crate::services::ProjectsService;
use crate::session::{ArchitectureSession, DraftStore};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Identifies one job run of one workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunTag {
    pub workflow: WorkflowKind,
    pub run: u64,
}

enum Input {
    Create(CreateInput),
    Import(ImportInput),
    Deploy(DeployInput),
}

impl Input {
    fn workflow(&self) -> WorkflowKind {
        match self {
            Input::Create(_) => WorkflowKind::Create,
            Input::Import(_) => WorkflowKind::Import,
            Input::Deploy(_) => WorkflowKind::Deploy,
        }
    }

    fn job(workflow: WorkflowKind, outcome: JobOutcome) -> Self {
        match workflow {
            WorkflowKind::Create => Input::Create(CreateInput::Job(outcome)),
            WorkflowKind::Import => Input::Import(ImportInput::Job(outcome)),
            WorkflowKind::Deploy => Input::Deploy(DeployInput::Job(outcome)),
        }
    }
}

/// Everything the controller acts on
pub struct WorkflowContext {
    pub orchestrator: Arc<JobOrchestrator>,
    pub projects: ProjectsService,
    pub architecture: Arc<ArchitectureSession>,
    pub navigator: Arc<Navigator>,
    pub drafts: Arc<DraftStore>,
    pub notifier: Notifier,
    pub broadcaster: EventBroadcaster,
}

pub struct WorkflowController {
    ctx: WorkflowContext,
    create: CreateMachine,
    import: ImportMachine,
    deploy: DeployMachine,
    slots: HashMap<WorkflowKind, JobSlot>,
    /// Current run per workflow
    runs: HashMap<WorkflowKind, u64>,
    /// Route each current run was started on
    owners: HashMap<WorkflowKind, Route>,
    next_run: u64,
    events_tx: mpsc::UnboundedSender<(RunTag, JobEvent)>,
    events_rx: mpsc::UnboundedReceiver<(RunTag, JobEvent)>,
    routes: watch::Receiver<NavigationState>,
    /// Last route this controller acted on
    seen_route: Route,
}

impl WorkflowController {
    pub fn new(ctx: WorkflowContext) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let routes = ctx.navigator.subscribe();
        let seen_route = ctx.navigator.current();
        Self {
            ctx,
            create: CreateMachine::new(),
            import: ImportMachine::new(),
            deploy: DeployMachine::new(),
            slots: HashMap::new(),
            runs: HashMap::new(),
            owners: HashMap::new(),
            next_run: 0,
            events_tx,
            events_rx,
            routes,
            seen_route,
        }
    }

    pub fn create_machine(&self) -> &CreateMachine {
        &self.create
    }

    pub fn import_machine(&self) -> &ImportMachine {
        &self.import
    }

    pub fn deploy_machine(&self) -> &DeployMachine {
        &self.deploy
    }

    /// Record of the workflow's latest job, if any
    pub fn job_status(&self, workflow: WorkflowKind) -> Option<Job> {
        self.slots.get(&workflow).and_then(JobSlot::status)
    }

    pub fn job_active(&self, workflow: WorkflowKind) -> bool {
        self.slots.get(&workflow).is_some_and(JobSlot::is_active)
    }

    pub fn state_name(&self, workflow: WorkflowKind) -> String {
        match workflow {
            WorkflowKind::Create => self.create.state().to_string(),
            WorkflowKind::Import => self.import.state().to_string(),
            WorkflowKind::Deploy => self.deploy.state().to_string(),
        }
    }

    pub async fn create(&mut self, input: CreateInput) -> Result<(), WorkflowError> {
        self.send(Input::Create(input)).await
    }

    pub async fn import(&mut self, input: ImportInput) -> Result<(), WorkflowError> {
        self.send(Input::Import(input)).await
    }

    pub async fn deploy(&mut self, input: DeployInput) -> Result<(), WorkflowError> {
        self.send(Input::Deploy(input)).await
    }

    /// Restore the questionnaire saved by an earlier session
    pub async fn load_draft(&mut self) -> Result<(), WorkflowError> {
        match self.ctx.drafts.current_project() {
            Some(draft) => self.create(CreateInput::LoadDraft(draft)).await,
            None => {
                let error = WorkflowError::State("There is no saved draft".into());
                self.report(&error);
                Err(error)
            }
        }
    }

    async fn send(&mut self, input: Input) -> Result<(), WorkflowError> {
        self.sync_route().await;
        let workflow = input.workflow();
        match self.transition(input) {
            Ok(effects) => {
                self.run_effects(effects).await;
                Ok(())
            }
            Err(e) => {
                log::info!("[WorkflowController] {} rejected input: {}", workflow, e);
                self.report(&e);
                Err(e)
            }
        }
    }

    fn transition(&mut self, input: Input) -> Result<Vec<Effect>, WorkflowError> {
        let workflow = input.workflow();
        let old_state = self.state_name(workflow);
        let effects = match input {
            Input::Create(input) => self.create.handle(input),
            Input::Import(input) => self.import.handle(input),
            Input::Deploy(input) => self.deploy.handle(input),
        }?;
        self.announce(workflow, old_state);
        Ok(effects)
    }

    fn announce(&self, workflow: WorkflowKind, old_state: String) {
        let new_state = self.state_name(workflow);
        if new_state == old_state {
            return;
        }
        log::debug!(
            "[WorkflowController] {}: {} -> {}",
            workflow,
            old_state,
            new_state
        );
        self.ctx.broadcaster.broadcast(
            EVENT_WORKFLOW_STATE_CHANGED,
            WorkflowStateChangedPayload {
                workflow: workflow.to_string(),
                old_state,
                new_state,
            },
        );
    }

    fn report(&self, error: &WorkflowError) {
        let notice = match error {
            WorkflowError::Validation(message) => Notice::warning("Check your input", message),
            WorkflowError::State(message) => Notice::error("Action unavailable", message),
            WorkflowError::InvalidTransition { .. } => {
                Notice::warning("Action unavailable", error.to_string())
            }
        };
        self.ctx.notifier.post(notice);
    }

    async fn run_effects(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::StartJob {
                    slot,
                    kind,
                    payload,
                } => self.start_job(slot, kind, payload),
                Effect::CancelJob { slot } => {
                    if let Some(slot) = self.slots.get_mut(&slot) {
                        slot.cancel();
                    }
                }
                Effect::DisposeJob { slot } => {
                    if let Some(slot) = self.slots.get_mut(&slot) {
                        slot.dispose();
                    }
                    self.runs.remove(&slot);
                    self.owners.remove(&slot);
                }
                Effect::Navigate(route) => {
                    self.navigate(&route.path()).await;
                }
                Effect::LoadProject(id) => {
                    if let Err(e) = self.ctx.architecture.get(&id).await {
                        self.ctx
                            .notifier
                            .post(Notice::error("Failed to load project", e.message));
                    }
                }
                Effect::CreateProjectFromImport {
                    import_id,
                    project_name,
                    result,
                } => {
                    let input = self.create_project(&import_id, project_name, result).await;
                    match self.transition(Input::Import(input)) {
                        Ok(more) => queue.extend(more),
                        Err(e) => log::warn!("[WorkflowController] {}", e),
                    }
                }
                Effect::SaveDraft(draft) => {
                    if let Err(e) = self.ctx.drafts.save_current_project(&draft) {
                        log::warn!("[WorkflowController] Failed to save draft: {}", e);
                    }
                }
                Effect::Notify(notice) => self.ctx.notifier.post(notice),
            }
        }
    }

    fn start_job(&mut self, workflow: WorkflowKind, kind: JobKind, payload: Value) {
        self.next_run += 1;
        let tag = RunTag {
            workflow,
            run: self.next_run,
        };
        self.runs.insert(workflow, tag.run);

        let callbacks = Arc::new(ChannelCallbacks::new(tag, self.events_tx.clone()));
        match self.ctx.orchestrator.run(kind, payload, callbacks) {
            Ok(handle) => {
                let owner = self.ctx.navigator.current();
                guard_route(self.ctx.navigator.subscribe(), owner.clone(), handle.disposer());
                self.owners.insert(workflow, owner);
                self.slots.entry(workflow).or_default().set(handle);
            }
            Err(e) => {
                // Delivered like any other failure so the machine can leave its waiting state
                let _ = self.events_tx.send((
                    tag,
                    JobEvent::Failed {
                        job_id: None,
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }

    async fn create_project(
        &self,
        import_id: &str,
        project_name: String,
        result: Option<Value>,
    ) -> ImportInput {
        let mut architecture = ArchitectureData::default();
        architecture
            .extra
            .insert("import_id".into(), Value::String(import_id.to_string()));
        if let Some(Value::Object(result)) = result {
            for key in ["inventory", "security_analysis"] {
                if let Some(value) = result.get(key) {
                    architecture.extra.insert(key.to_string(), value.clone());
                }
            }
        }
        let project = NewProject {
            project_name,
            description: Some(format!("Imported infrastructure ({})", import_id)),
            architecture_data: Some(architecture),
            ..NewProject::default()
        };

        match self.ctx.projects.create(&project).await {
            Ok(created) => ImportInput::ProjectCreated {
                project_id: created.id,
            },
            Err(e) => ImportInput::ProjectCreationFailed { reason: e.message },
        }
    }

    /// Navigate, then tear down or enter whatever the route change implies
    pub async fn navigate(&mut self, path: &str) -> RouteDecision {
        let decision = self.ctx.navigator.navigate(path);
        self.sync_route().await;
        decision
    }

    /// Catch up with route changes made by anyone, this controller included
    async fn sync_route(&mut self) {
        let current = self.routes.borrow_and_update().current.clone();
        if current == self.seen_route {
            return;
        }
        let from = std::mem::replace(&mut self.seen_route, current.clone());
        self.route_changed(&from, &current).await;
    }

    /// Every job started on a route other than `to` is disposed
    pub async fn route_changed(&mut self, from: &Route, to: &Route) {
        let stranded: Vec<WorkflowKind> = self
            .owners
            .iter()
            .filter(|(_, owner)| *owner != to)
            .map(|(workflow, _)| *workflow)
            .collect();
        for workflow in stranded {
            log::debug!("[WorkflowController] {} job left behind on {}", workflow, from);
            self.leave(workflow);
        }
        if let Some(id) = to.project_id() {
            if let Err(e) = self.ctx.architecture.get(id).await {
                self.ctx
                    .notifier
                    .post(Notice::error("Failed to load project", e.message));
            }
        }
    }

    /// Dispose the workflow's job and take its machine back to before the job.
    ///
    /// A run whose terminal event is already queued is left to deliver it.
    pub fn leave(&mut self, workflow: WorkflowKind) {
        self.owners.remove(&workflow);
        let waiting = self.runs.contains_key(&workflow)
            && self
                .slots
                .get(&workflow)
                .and_then(JobSlot::handle)
                .is_some_and(|h| h.phase() != JobPhase::Finished);
        if !waiting {
            return;
        }
        log::info!("[WorkflowController] Leaving {}, disposing its job", workflow);
        if let Some(slot) = self.slots.get_mut(&workflow) {
            slot.dispose();
        }
        self.runs.remove(&workflow);

        let old_state = self.state_name(workflow);
        match workflow {
            WorkflowKind::Create => self.create.abandon_job(),
            WorkflowKind::Import => self.import.abandon_job(),
            WorkflowKind::Deploy => self.deploy.abandon_job(),
        }
        self.announce(workflow, old_state);
    }

    /// Wait for the next job event of a current run and act on it
    pub async fn next_event(&mut self) -> Option<(WorkflowKind, JobEvent)> {
        loop {
            self.sync_route().await;
            tokio::select! {
                received = self.events_rx.recv() => {
                    let (tag, event) = received?;
                    if let Some(event) = self.accept(tag, event).await {
                        return Some(event);
                    }
                }
                Ok(()) = self.routes.changed() => {}
            }
        }
    }

    /// Act on every job event already queued, without waiting
    pub async fn pump(&mut self) -> Vec<(WorkflowKind, JobEvent)> {
        self.sync_route().await;
        let mut handled = Vec::new();
        while let Ok((tag, event)) = self.events_rx.try_recv() {
            if let Some(event) = self.accept(tag, event).await {
                handled.push(event);
            }
        }
        handled
    }

    async fn accept(&mut self, tag: RunTag, event: JobEvent) -> Option<(WorkflowKind, JobEvent)> {
        if self.runs.get(&tag.workflow) != Some(&tag.run) {
            log::debug!(
                "[WorkflowController] Dropping event of superseded {} run {}",
                tag.workflow,
                tag.run
            );
            return None;
        }
        let workflow = tag.workflow;
        self.publish(workflow, &event);

        if let Some(outcome) = JobOutcome::from_event(&event) {
            self.runs.remove(&workflow);
            self.owners.remove(&workflow);
            match self.transition(Input::job(workflow, outcome)) {
                Ok(effects) => self.run_effects(effects).await,
                Err(e) => log::debug!("[WorkflowController] Ignoring job outcome: {}", e),
            }
        }
        Some((workflow, event))
    }

    fn publish(&self, workflow: WorkflowKind, event: &JobEvent) {
        let name = workflow.to_string();
        let broadcaster = &self.ctx.broadcaster;
        match event {
            JobEvent::Started { job_id } => {
                let kind = self
                    .slots
                    .get(&workflow)
                    .and_then(JobSlot::handle)
                    .map(|h| h.kind().to_string())
                    .unwrap_or_default();
                broadcaster.broadcast(
                    EVENT_JOB_STARTED,
                    JobStartedPayload {
                        workflow: name,
                        kind,
                        job_id: job_id.clone(),
                    },
                );
            }
            JobEvent::Progress { job_id, snapshot } => broadcaster.broadcast(
                EVENT_JOB_PROGRESS,
                JobProgressPayload {
                    workflow: name,
                    job_id: job_id.clone(),
                    status: snapshot.status.to_string(),
                    progress_percentage: snapshot.progress_percentage,
                    current_step: snapshot.current_step.clone(),
                },
            ),
            JobEvent::Log { job_id, line } => broadcaster.broadcast(
                EVENT_JOB_LOG,
                JobLogPayload {
                    workflow: name,
                    job_id: job_id.clone(),
                    line: line.clone(),
                },
            ),
            JobEvent::Completed { job_id, .. } => broadcaster.broadcast(
                EVENT_JOB_COMPLETED,
                JobFinishedPayload {
                    workflow: name,
                    job_id: job_id.clone(),
                    reason: None,
                },
            ),
            JobEvent::Failed { job_id, reason } => broadcaster.broadcast(
                EVENT_JOB_FAILED,
                JobFinishedPayload {
                    workflow: name,
                    job_id: job_id.clone().unwrap_or_default(),
                    reason: Some(reason.clone()),
                },
            ),
            JobEvent::Cancelled { job_id } => broadcaster.broadcast(
                EVENT_JOB_CANCELLED,
                JobFinishedPayload {
                    workflow: name,
                    job_id: job_id.clone().unwrap_or_default(),
                    reason: None,
                },
            ),
        }
    }
}

/// Dispose the run as soon as the navigator is anywhere but `owner`
fn guard_route(mut routes: watch::Receiver<NavigationState>, owner: Route, run: JobDisposer) {
    tokio::spawn(async move {
        loop {
            let here = routes.borrow_and_update().current.clone();
            if here != owner {
                log::info!("[WorkflowController] Moved from {} to {}, disposing job", owner, here);
                run.dispose();
                return;
            }
            tokio::select! {
                _ = run.ended() => return,
                changed = routes.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    });
}
