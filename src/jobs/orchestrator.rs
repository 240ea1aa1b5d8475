//! Polling driver for server jobs
//!
//! `run` spawns one task per job. The task sleeps, polls, folds the reply into
//! the job record and reports it, until the job is terminal, the handle is
//! cancelled or disposed, or too many polls in a row fail. Poll failures back
//! off exponentially up to the configured cap; a successful poll resets the
//! interval.

use super::{JobBackend, JobCallbacks};
use crate::config::PollConfig;
use crate::models::{Job, JobKind, JobSnapshot, JobStart, JobStatus};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("No backend registered for {0} jobs")]
    NoBackend(JobKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Waiting for the start request
    Starting,
    Running,
    /// A terminal callback has fired
    Finished,
    /// Torn down silently; no callback will fire
    Disposed,
}

impl JobPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, JobPhase::Starting | JobPhase::Running)
    }
}

struct RunState {
    phase: JobPhase,
    job: Option<Job>,
}

/// State shared by a run's task and its handle
struct Run {
    kind: JobKind,
    backend: Arc<dyn JobBackend>,
    callbacks: Arc<dyn JobCallbacks>,
    token: CancellationToken,
    state: Mutex<RunState>,
}

impl Run {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn started(&self, start: &JobStart) -> bool {
        let mut state = self.lock();
        if state.phase != JobPhase::Starting {
            return false;
        }
        let job = Job::new(self.kind, start);
        log::info!("[JobOrchestrator] {} job {} started", self.kind, job.job_id);
        self.callbacks.on_start(&job);
        state.job = Some(job);
        state.phase = JobPhase::Running;
        true
    }

    /// Report one poll reply. Returns false once polling should stop.
    fn observe(&self, snapshot: JobSnapshot) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.phase != JobPhase::Running {
            return false;
        }
        let Some(job) = state.job.as_mut() else {
            return false;
        };

        let (snapshot, new_lines) = job.absorb(snapshot);
        self.callbacks.on_progress(job, &snapshot);
        for line in &new_lines {
            self.callbacks.on_log(job, line);
        }
        if !snapshot.status.is_terminal() {
            return true;
        }

        state.phase = JobPhase::Finished;
        self.token.cancel();
        match snapshot.status {
            JobStatus::Complete => {
                log::info!("[JobOrchestrator] {} job {} complete", self.kind, job.job_id);
                self.callbacks.on_complete(job);
            }
            JobStatus::Failed => {
                let reason = job.failure_reason();
                log::warn!(
                    "[JobOrchestrator] {} job {} failed: {}",
                    self.kind,
                    job.job_id,
                    reason
                );
                self.callbacks.on_failure(Some(job), &reason);
            }
            _ => {
                log::info!(
                    "[JobOrchestrator] {} job {} cancelled by the server",
                    self.kind,
                    job.job_id
                );
                self.callbacks.on_cancel(Some(job));
            }
        }
        false
    }

    fn fail(&self, reason: &str) {
        let mut state = self.lock();
        if !state.phase.is_active() {
            return;
        }
        state.phase = JobPhase::Finished;
        self.token.cancel();
        if let Some(job) = state.job.as_mut() {
            job.errors.push(reason.to_string());
            job.finish(JobStatus::Failed);
        }
        log::warn!("[JobOrchestrator] {} job failed: {}", self.kind, reason);
        self.callbacks.on_failure(state.job.as_ref(), reason);
    }

    /// Returns the server job id to cancel, if the job got that far
    fn cancel(&self) -> Option<String> {
        let mut state = self.lock();
        if !state.phase.is_active() {
            return None;
        }
        state.phase = JobPhase::Finished;
        self.token.cancel();
        if let Some(job) = state.job.as_mut() {
            job.finish(JobStatus::Cancelled);
        }
        log::info!("[JobOrchestrator] {} job cancelled", self.kind);
        self.callbacks.on_cancel(state.job.as_ref());
        state.job.as_ref().map(|job| job.job_id.clone())
    }

    fn dispose(&self) {
        let mut state = self.lock();
        if state.phase.is_active() {
            log::debug!("[JobOrchestrator] {} job disposed", self.kind);
            state.phase = JobPhase::Disposed;
        }
        self.token.cancel();
    }
}

async fn drive(run: Arc<Run>, payload: Value, poll: PollConfig) {
    let started = tokio::select! {
        _ = run.token.cancelled() => return,
        result = run.backend.start(payload) => result,
    };
    let start = match started {
        Ok(start) => start,
        Err(e) => {
            run.fail(&e.message);
            return;
        }
    };
    if run.started(&start) {
        follow(&run, &start, &poll).await;
    }
    run.backend.release(&start.job_id);
}

/// Poll an accepted job until it ends, one way or another
async fn follow(run: &Run, start: &JobStart, poll: &PollConfig) {
    let job_id = start.job_id.as_str();

    let initial = poll.initial_interval();
    let max = poll.max_interval();
    let mut interval = initial;
    // A job that finished on start only needs its result fetched
    let mut delay = if start.status.is_terminal() {
        Duration::ZERO
    } else {
        initial
    };
    let mut failures = 0u32;

    loop {
        tokio::select! {
            _ = run.token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        let reply = tokio::select! {
            _ = run.token.cancelled() => return,
            reply = run.backend.poll(job_id) => reply,
        };

        match reply {
            Ok(snapshot) => {
                failures = 0;
                interval = initial;
                if !run.observe(snapshot) {
                    return;
                }
            }
            Err(e) => {
                failures += 1;
                interval = (interval * 2).min(max);
                log::warn!(
                    "[JobOrchestrator] Poll {} of job {} failed ({} in a row), next in {:?}: {}",
                    run.kind,
                    job_id,
                    failures,
                    interval,
                    e.message
                );
                if failures >= poll.max_consecutive_failures {
                    run.fail(&e.message);
                    return;
                }
            }
        }
        delay = interval;
    }
}

/// Runs jobs of every registered kind
pub struct JobOrchestrator {
    backends: HashMap<JobKind, Arc<dyn JobBackend>>,
    poll: PollConfig,
}

impl JobOrchestrator {
    pub fn new(poll: PollConfig) -> Self {
        Self {
            backends: HashMap::new(),
            poll,
        }
    }

    pub fn with_backend(mut self, kind: JobKind, backend: Arc<dyn JobBackend>) -> Self {
        self.backends.insert(kind, backend);
        self
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Start a job and poll it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(
        &self,
        kind: JobKind,
        payload: Value,
        callbacks: Arc<dyn JobCallbacks>,
    ) -> Result<JobHandle, JobError> {
        let backend = self
            .backends
            .get(&kind)
            .cloned()
            .ok_or(JobError::NoBackend(kind))?;
        let run = Arc::new(Run {
            kind,
            backend,
            callbacks,
            token: CancellationToken::new(),
            state: Mutex::new(RunState {
                phase: JobPhase::Starting,
                job: None,
            }),
        });
        log::debug!("[JobOrchestrator] Starting {} job", kind);
        tokio::spawn(drive(run.clone(), payload, self.poll.clone()));
        Ok(JobHandle { run })
    }
}

/// Owner of one job run. Dropping the handle disposes the run.
pub struct JobHandle {
    run: Arc<Run>,
}

impl JobHandle {
    pub fn kind(&self) -> JobKind {
        self.run.kind
    }

    pub fn phase(&self) -> JobPhase {
        self.run.lock().phase
    }

    pub fn is_active(&self) -> bool {
        self.phase().is_active()
    }

    /// Snapshot of the job record; `None` until the server accepted the job
    pub fn status(&self) -> Option<Job> {
        self.run.lock().job.clone()
    }

    /// Stop polling and fire `on_cancel` unless a terminal already fired.
    ///
    /// The server-side cancel is sent in the background and its outcome is
    /// only logged.
    pub fn cancel(&self) {
        let Some(job_id) = self.run.cancel() else {
            return;
        };
        let backend = self.run.backend.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = backend.cancel(&job_id).await {
                        log::warn!("[JobOrchestrator] Server cancel of {} failed: {}", job_id, e);
                    }
                });
            }
            Err(_) => log::warn!(
                "[JobOrchestrator] No runtime to cancel job {} on the server",
                job_id
            ),
        }
    }

    /// Stop polling without firing any callback
    pub fn dispose(&self) {
        self.run.dispose();
    }

    pub fn disposer(&self) -> JobDisposer {
        JobDisposer {
            run: Arc::downgrade(&self.run),
            token: self.run.token.clone(),
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.run.dispose();
    }
}

/// Tears a run down from outside its handle's owner.
///
/// Holds no strong reference, so a watcher keeping one does not keep the run
/// alive.
#[derive(Clone)]
pub struct JobDisposer {
    run: Weak<Run>,
    token: CancellationToken,
}

impl JobDisposer {
    pub fn dispose(&self) {
        if let Some(run) = self.run.upgrade() {
            run.dispose();
        }
    }

    /// Resolves once the run has finished, been cancelled or been disposed
    pub async fn ended(&self) {
        self.token.cancelled().await
    }
}

/// At most one job per owner. A new job disposes the previous one.
#[derive(Default)]
pub struct JobSlot {
    current: Option<JobHandle>,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, handle: JobHandle) {
        if let Some(previous) = self.current.replace(handle) {
            previous.dispose();
        }
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        self.current.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(JobHandle::is_active)
    }

    pub fn status(&self) -> Option<Job> {
        self.current.as_ref().and_then(JobHandle::status)
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.as_ref() {
            handle.cancel();
        }
    }

    pub fn dispose(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.dispose();
        }
    }
}
