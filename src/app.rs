//! Application state shared by every front end
//!
//! One [`App`] is built per process from a resolved [`ClientConfig`]. It owns
//! the singletons (transport, sessions, navigator, orchestrator) and hands
//! out workflow controllers that share them.

use crate::config::ClientConfig;
use crate::errors::ServiceError;
use crate::events::EventBroadcaster;
use crate::jobs::{
    ApplyPoliciesBackend, DeployBackend, GenerateBackend, ImportBackend, JobOrchestrator,
};
use crate::models::{JobKind, User};
use crate::notify::Notifier;
use crate::routes::Navigator;
use crate::services::Services;
use crate::session::{ArchitectureSession, AuthSession, AuthSnapshot, DraftStore, HttpAuthProvider};
use crate::transport::{ApiClient, Transport, TransportError};
use crate::workflow::{WorkflowContext, WorkflowController};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Draft-store key holding the bearer token between runs
pub const AUTH_TOKEN_KEY: &str = "authToken";

#[derive(Clone)]
pub struct App {
    pub config: ClientConfig,
    pub transport: Arc<dyn Transport>,
    pub services: Services,
    pub auth: Arc<AuthSession>,
    pub architecture: Arc<ArchitectureSession>,
    pub drafts: Arc<DraftStore>,
    pub navigator: Arc<Navigator>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub notifier: Notifier,
    pub broadcaster: EventBroadcaster,
}

impl App {
    /// Build the app over the real HTTP client
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = ApiClient::new(&config)?;
        log::info!("[App] Using API at {}", client.base_url());
        Ok(Self::with_transport(config, Arc::new(client)))
    }

    /// Build the app over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let services = Services::new(transport.clone());
        let broadcaster = EventBroadcaster::new();
        let notifier = Notifier::new();

        let auth = Arc::new(AuthSession::new(Arc::new(HttpAuthProvider::new(
            transport.clone(),
        ))));
        let architecture = Arc::new(ArchitectureSession::new(services.projects.clone()));
        let drafts = Arc::new(DraftStore::new(&config.state_dir));
        let navigator = Arc::new(Navigator::new(broadcaster.clone()));

        let orchestrator = JobOrchestrator::new(config.poll.clone())
            .with_backend(
                JobKind::Generate,
                Arc::new(GenerateBackend::new(services.projects.clone())),
            )
            .with_backend(
                JobKind::Import,
                Arc::new(ImportBackend::new(services.production.clone())),
            )
            .with_backend(
                JobKind::ApplyPolicies,
                Arc::new(ApplyPoliciesBackend::new(services.production.clone())),
            )
            .with_backend(
                JobKind::Deploy,
                Arc::new(DeployBackend::new(services.production.clone())),
            );

        // A logout forgets everything tied to the previous user
        {
            let architecture = architecture.clone();
            let drafts = drafts.clone();
            auth.on_logout(move || {
                architecture.reset();
                if let Err(e) = drafts.clear() {
                    log::warn!("[App] Failed to clear saved state on logout: {}", e);
                }
            });
        }

        Self {
            config,
            transport,
            services,
            auth,
            architecture,
            drafts,
            navigator,
            orchestrator: Arc::new(orchestrator),
            notifier,
            broadcaster,
        }
    }

    /// Resume a saved session, then keep navigation in step with auth.
    ///
    /// Must run inside a tokio runtime.
    pub async fn start(&self) -> (AuthSnapshot, JoinHandle<()>) {
        if let Some(token) = self.drafts.get_as::<String>(AUTH_TOKEN_KEY) {
            log::debug!("[App] Restoring saved session");
            self.transport.set_auth_token(Some(token));
        }
        let snapshot = self.auth.start().await;
        if !snapshot.is_authenticated() {
            self.forget_token();
        }
        self.navigator.on_auth_changed(&snapshot);
        let follower = self.navigator.clone().follow(self.auth.subscribe());
        (snapshot, follower)
    }

    /// Log in and remember the session for later runs
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let user = self.auth.login(username, password).await?;
        if let Some(token) = self.transport.auth_token() {
            if let Err(e) = self.drafts.set(AUTH_TOKEN_KEY, &token) {
                log::warn!("[App] Failed to save session: {}", e);
            }
        }
        Ok(user)
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
    }

    fn forget_token(&self) {
        if self.drafts.get(AUTH_TOKEN_KEY).is_some() {
            if let Err(e) = self.drafts.remove(AUTH_TOKEN_KEY) {
                log::warn!("[App] Failed to drop saved session: {}", e);
            }
        }
    }

    /// A workflow controller over this app's singletons
    pub fn workflows(&self) -> WorkflowController {
        WorkflowController::new(WorkflowContext {
            orchestrator: self.orchestrator.clone(),
            projects: self.services.projects.clone(),
            architecture: self.architecture.clone(),
            navigator: self.navigator.clone(),
            drafts: self.drafts.clone(),
            notifier: self.notifier.clone(),
            broadcaster: self.broadcaster.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::Route;
    use crate::testing::ScriptedTransport;
    use crate::transport::Method;
    use serde_json::json;
    use tempfile::TempDir;

    fn app(dir: &TempDir, transport: Arc<ScriptedTransport>) -> App {
        let config = ClientConfig {
            state_dir: dir.path().to_path_buf(),
            ..ClientConfig::default()
        };
        App::with_transport(config, transport)
    }

    #[tokio::test]
    async fn test_login_persists_token_and_logout_clears_state() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(
            Method::Post,
            "/auth/login",
            json!({"access_token": "jwt-1", "user": {"id": 7, "username": "demo"}}),
        );
        transport.ok(Method::Post, "/auth/logout", json!({}));
        let app = app(&dir, transport.clone());

        app.login("demo", "secret").await.unwrap();
        assert_eq!(
            app.drafts.get_as::<String>(AUTH_TOKEN_KEY).as_deref(),
            Some("jwt-1")
        );

        app.logout().await;
        assert!(app.drafts.get(AUTH_TOKEN_KEY).is_none());
        assert!(!transport.has_auth_token());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_overtaken_by_logout_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok_after(
            Method::Post,
            "/auth/login",
            std::time::Duration::from_secs(2),
            json!({"access_token": "jwt-1", "user": {"id": 7, "username": "demo"}}),
        );
        transport.ok(Method::Post, "/auth/logout", json!({}));
        let app = app(&dir, transport.clone());

        let slow = {
            let app = app.clone();
            tokio::spawn(async move { app.login("demo", "secret").await })
        };
        tokio::task::yield_now().await;
        app.logout().await;

        assert!(slow.await.unwrap().is_err());
        assert!(app.drafts.get(AUTH_TOKEN_KEY).is_none());
        assert!(transport.token().is_none());
    }

    #[tokio::test]
    async fn test_start_restores_saved_session() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(Method::Get, "/auth/me", json!({"id": 7, "username": "demo"}));
        let app = app(&dir, transport.clone());
        app.drafts.set(AUTH_TOKEN_KEY, "jwt-1").unwrap();

        let (snapshot, follower) = app.start().await;
        assert!(snapshot.is_authenticated());
        assert_eq!(transport.token().as_deref(), Some("jwt-1"));
        follower.abort();
    }

    #[tokio::test]
    async fn test_start_without_session_sends_protected_route_to_login() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Arc::new(ScriptedTransport::new()));
        app.navigator.navigate("/projects");

        let (snapshot, follower) = app.start().await;
        assert!(!snapshot.is_authenticated());
        assert_eq!(app.navigator.current(), Route::Login);
        follower.abort();
    }
}
