//! Current-architecture session
//!
//! State changes go through the pure [`reduce`] function. Async operations
//! allocate a generation when they begin; a completion carrying an older
//! generation than the state's is ignored, so a superseded fetch can never
//! overwrite the current architecture.

use super::observable::Observable;
use crate::errors::ServiceError;
use crate::models::{GenerateRequest, Project};
use crate::services::ProjectsService;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchitectureState {
    pub current: Option<Project>,
    /// Full project records only
    pub by_id: HashMap<String, Project>,
    pub loading: bool,
    pub error: Option<String>,
    /// Generation of the newest operation
    pub generation: u64,
}

impl ArchitectureState {
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArchitectureAction {
    Begin { generation: u64 },
    Loaded { generation: u64, project: Project },
    Failed { generation: u64, message: String },
    /// Show an already-cached project; supersedes anything in flight
    Select(Project),
    /// Drop a cached record so the next `get` refetches it
    Evict(String),
    ClearError,
    Reset,
}

pub fn reduce(state: &ArchitectureState, action: ArchitectureAction) -> ArchitectureState {
    let mut next = state.clone();
    match action {
        ArchitectureAction::Begin { generation } => {
            next.generation = generation.max(state.generation);
            next.loading = true;
            next.error = None;
        }
        ArchitectureAction::Loaded {
            generation,
            project,
        } => {
            if generation != state.generation {
                return next;
            }
            next.by_id.insert(project.id.clone(), project.clone());
            next.current = Some(project);
            next.loading = false;
        }
        ArchitectureAction::Failed {
            generation,
            message,
        } => {
            if generation != state.generation {
                return next;
            }
            next.error = Some(message);
            next.loading = false;
        }
        ArchitectureAction::Select(project) => {
            next.generation = state.generation + 1;
            next.by_id.insert(project.id.clone(), project.clone());
            next.current = Some(project);
            next.loading = false;
            next.error = None;
        }
        ArchitectureAction::Evict(id) => {
            next.by_id.remove(&id);
        }
        ArchitectureAction::ClearError => {
            next.error = None;
        }
        ArchitectureAction::Reset => {
            next = ArchitectureState {
                generation: state.generation + 1,
                ..ArchitectureState::default()
            };
        }
    }
    next
}

pub struct ArchitectureSession {
    projects: ProjectsService,
    state: Observable<ArchitectureState>,
}

impl ArchitectureSession {
    pub fn new(projects: ProjectsService) -> Self {
        Self {
            projects,
            state: Observable::default(),
        }
    }

    pub fn snapshot(&self) -> ArchitectureState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ArchitectureState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<Project> {
        self.snapshot().current
    }

    pub fn cached(&self, id: &str) -> Option<Project> {
        self.snapshot().by_id.get(id).cloned()
    }

    fn dispatch(&self, action: ArchitectureAction) {
        self.state.update(|s| *s = reduce(s, action));
    }

    fn begin(&self) -> u64 {
        self.state.update(|s| {
            let generation = s.generation + 1;
            *s = reduce(s, ArchitectureAction::Begin { generation });
            generation
        })
    }

    fn settle(&self, generation: u64, result: &Result<Project, ServiceError>) {
        let action = match result {
            Ok(project) => ArchitectureAction::Loaded {
                generation,
                project: project.clone(),
            },
            Err(e) => ArchitectureAction::Failed {
                generation,
                message: e.message.clone(),
            },
        };
        if self.snapshot().generation != generation {
            log::debug!(
                "[ArchitectureSession] Operation {} was superseded, result dropped",
                generation
            );
        }
        self.dispatch(action);
    }

    /// Generate an architecture and make the saved project current.
    ///
    /// The full project record is fetched before anything is published.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Project, ServiceError> {
        let generation = self.begin();
        let result = match self.projects.generate(request).await {
            Ok(reply) => self.projects.get(&reply.project_id).await,
            Err(e) => Err(e),
        };
        self.settle(generation, &result);
        result
    }

    /// Make project `id` current, from cache when possible
    pub async fn get(&self, id: &str) -> Result<Project, ServiceError> {
        if let Some(project) = self.cached(id) {
            self.dispatch(ArchitectureAction::Select(project.clone()));
            return Ok(project);
        }
        self.refresh(id).await
    }

    /// Fetch project `id` even if cached
    pub async fn refresh(&self, id: &str) -> Result<Project, ServiceError> {
        let generation = self.begin();
        log::debug!("[ArchitectureSession] Loading project {} (op {})", id, generation);
        let result = self.projects.get(id).await;
        self.settle(generation, &result);
        result
    }

    pub fn evict(&self, id: &str) {
        self.dispatch(ArchitectureAction::Evict(id.to_string()));
    }

    pub fn clear_error(&self) {
        self.dispatch(ArchitectureAction::ClearError);
    }

    pub fn reset(&self) {
        self.dispatch(ArchitectureAction::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::QuestionnaireData;
    use crate::testing::ScriptedTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn project(id: &str) -> Project {
        serde_json::from_value(json!({"id": id, "project_name": id})).unwrap()
    }

    fn session() -> (Arc<ScriptedTransport>, Arc<ArchitectureSession>) {
        let transport = Arc::new(ScriptedTransport::new());
        let projects = ProjectsService::new(transport.clone());
        (transport, Arc::new(ArchitectureSession::new(projects)))
    }

    #[test]
    fn test_reduce_drops_stale_completion() {
        let state = ArchitectureState::default();
        let state = reduce(&state, ArchitectureAction::Begin { generation: 1 });
        let state = reduce(&state, ArchitectureAction::Begin { generation: 2 });
        assert!(state.loading);

        let after_stale = reduce(
            &state,
            ArchitectureAction::Loaded {
                generation: 1,
                project: project("p1"),
            },
        );
        assert_eq!(after_stale, state);

        let after_fresh = reduce(
            &state,
            ArchitectureAction::Loaded {
                generation: 2,
                project: project("p2"),
            },
        );
        assert_eq!(after_fresh.current_id(), Some("p2"));
        assert!(after_fresh.by_id.contains_key("p2"));
        assert!(!after_fresh.loading);
    }

    #[test]
    fn test_reduce_failure_and_clear() {
        let state = reduce(
            &ArchitectureState::default(),
            ArchitectureAction::Begin { generation: 1 },
        );
        let state = reduce(
            &state,
            ArchitectureAction::Failed {
                generation: 1,
                message: "Project not found".into(),
            },
        );
        assert_eq!(state.error.as_deref(), Some("Project not found"));
        assert!(!state.loading);
        assert!(reduce(&state, ArchitectureAction::ClearError).error.is_none());
    }

    #[test]
    fn test_reset_supersedes_in_flight() {
        let state = reduce(
            &ArchitectureState::default(),
            ArchitectureAction::Select(project("p1")),
        );
        let reset = reduce(&state, ArchitectureAction::Reset);
        assert!(reset.current.is_none());
        assert!(reset.by_id.is_empty());
        assert!(reset.generation > state.generation);
    }

    #[tokio::test]
    async fn test_generate_then_get_returns_same_id() {
        let (transport, session) = session();
        transport.ok(Method::Post, "/projects/generate-architecture", json!({"project_id": "p1"}));
        transport.ok(
            Method::Get,
            "/projects/p1",
            json!({"id": "p1", "project_name": "Shop", "architecture_data": {}}),
        );

        let generated = session
            .generate(&GenerateRequest::new(QuestionnaireData::default()))
            .await
            .unwrap();
        assert_eq!(generated.id, "p1");

        let fetched = session.get("p1").await.unwrap();
        assert_eq!(fetched.id, "p1");
        // Served from cache
        assert_eq!(transport.count(Method::Get, "/projects/p1"), 1);
        assert_eq!(session.snapshot().current_id(), Some("p1"));
    }

    #[tokio::test]
    async fn test_failed_generate_records_error() {
        let (transport, session) = session();
        transport.fail(
            Method::Post,
            "/projects/generate-architecture",
            422,
            json!({"detail": [{"msg": "field required"}]}),
        );

        let err = session
            .generate(&GenerateRequest::new(QuestionnaireData::default()))
            .await
            .unwrap_err();
        assert_eq!(err.message, "field required");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("field required"));
        assert!(snapshot.current.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_get_never_becomes_current() {
        let (transport, session) = session();
        transport.ok_after(
            Method::Get,
            "/projects/slow",
            Duration::from_secs(5),
            json!({"id": "slow"}),
        );
        transport.ok_after(
            Method::Get,
            "/projects/fast",
            Duration::from_secs(1),
            json!({"id": "fast"}),
        );

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.get("slow").await })
        };
        tokio::task::yield_now().await;
        let second = session.get("fast").await.unwrap();
        assert_eq!(second.id, "fast");

        // The older request still completes for its caller
        assert_eq!(first.await.unwrap().unwrap().id, "slow");
        assert_eq!(session.snapshot().current_id(), Some("fast"));
        assert!(!session.snapshot().by_id.contains_key("slow"));
    }
}
