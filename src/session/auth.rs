//! Authenticated-user session
//!
//! ## Lifecycle
//!
//! ```text
//! unknown ──start──> authenticated | anonymous
//! anonymous ──login──> authenticated
//! authenticated ──logout──> anonymous
//! ```
//!
//! Every transition publishes a new [`AuthSnapshot`]. An operation that is
//! overtaken by a newer one finishes silently: its result is returned to the
//! caller but never published. A login overtaken before its token is
//! installed fails with [`LOGIN_SUPERSEDED`] and leaves the transport as the
//! newer operation left it.

use super::observable::Observable;
use crate::errors::{ResultExt, ServiceError};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, User};
use crate::transport::{decode, RequestOptions, Transport};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Unknown,
    Authenticated,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSnapshot {
    pub status: AuthStatus,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthSnapshot {
    pub fn unknown() -> Self {
        Self {
            status: AuthStatus::Unknown,
            user: None,
            loading: false,
            error: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            ..Self::unknown()
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            status: AuthStatus::Authenticated,
            user: Some(user),
            loading: false,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    pub fn is_unknown(&self) -> bool {
        self.status == AuthStatus::Unknown
    }

    /// Derived from the user record; false unless authenticated
    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.user.as_ref().is_some_and(User::admin)
    }
}

/// Boundary to whatever actually authenticates users
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session token. Nothing is installed yet.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ServiceError>;

    async fn register(&self, request: &RegisterRequest) -> Result<User, ServiceError>;

    /// The user of the current token
    async fn current_user(&self) -> Result<User, ServiceError>;

    async fn logout(&self) -> Result<(), ServiceError>;

    /// Make `token` the credential of later requests, or drop it
    fn install_token(&self, _token: Option<String>) {}

    /// Whether a session token is available to resume
    fn has_session(&self) -> bool {
        false
    }
}

/// Token-based auth against the API's `/auth` routes
pub struct HttpAuthProvider {
    transport: Arc<dyn Transport>,
}

impl HttpAuthProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        const FALLBACK: &str = "Login failed. Check your username and password.";
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let value = self
            .transport
            .post("/auth/login", RequestOptions::json(&request).with_fallback(FALLBACK)?)
            .await
            .with_fallback(FALLBACK)?;
        decode(value).with_fallback(FALLBACK)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ServiceError> {
        const FALLBACK: &str = "Registration failed";
        let value = self
            .transport
            .post("/auth/register", RequestOptions::json(request).with_fallback(FALLBACK)?)
            .await
            .with_fallback(FALLBACK)?;
        decode(value).with_fallback(FALLBACK)
    }

    async fn current_user(&self) -> Result<User, ServiceError> {
        const FALLBACK: &str = "Failed to load your profile";
        let value = self
            .transport
            .get("/auth/me", RequestOptions::new())
            .await
            .with_fallback(FALLBACK)?;
        decode(value).with_fallback(FALLBACK)
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        let result = self
            .transport
            .post("/auth/logout", RequestOptions::new())
            .await
            .with_fallback("Logout failed")
            .map(|_| ());
        self.transport.set_auth_token(None);
        result
    }

    fn install_token(&self, token: Option<String>) {
        self.transport.set_auth_token(token);
    }

    fn has_session(&self) -> bool {
        self.transport.has_auth_token()
    }
}

/// Message of a login that a newer auth operation overtook
pub const LOGIN_SUPERSEDED: &str = "Login was interrupted by another sign-in or sign-out";

type LogoutHook = Box<dyn Fn() + Send + Sync>;

/// Process-wide auth state
pub struct AuthSession {
    provider: Arc<dyn AuthProvider>,
    state: Observable<AuthSnapshot>,
    generation: AtomicU64,
    logout_hooks: Mutex<Vec<LogoutHook>>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            state: Observable::new(AuthSnapshot::unknown()),
            generation: AtomicU64::new(0),
            logout_hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    pub fn loading(&self) -> bool {
        self.snapshot().loading
    }

    /// Run `hook` after every logout (cache and draft cleanup)
    pub fn on_logout(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut hooks) = self.logout_hooks.lock() {
            hooks.push(Box::new(hook));
        }
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.update(|s| {
            s.loading = true;
            s.error = None;
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Publish `next` unless a newer operation has started since `generation`
    fn finish(&self, generation: u64, next: AuthSnapshot) -> bool {
        if !self.is_current(generation) {
            log::debug!("[AuthSession] Dropping stale result of operation {}", generation);
            return false;
        }
        self.state.set(next);
        true
    }

    /// Resolve the initial state from a resumable session, if any
    pub async fn start(&self) -> AuthSnapshot {
        let generation = self.begin();
        let next = if self.provider.has_session() {
            match self.provider.current_user().await {
                Ok(user) => {
                    log::info!("[AuthSession] Resumed session for {}", user.username);
                    AuthSnapshot::authenticated(user)
                }
                Err(e) => {
                    log::info!("[AuthSession] Stored session rejected: {}", e);
                    AuthSnapshot::anonymous()
                }
            }
        } else {
            AuthSnapshot::anonymous()
        };
        self.finish(generation, next);
        self.snapshot()
    }

    /// Log in. The token is installed only while this is still the newest
    /// auth operation; otherwise the call fails with [`LOGIN_SUPERSEDED`].
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let previous = self.snapshot();
        let generation = self.begin();
        match self.authenticate(generation, username, password).await {
            Ok(user) => {
                if !self.finish(generation, AuthSnapshot::authenticated(user.clone())) {
                    return Err(ServiceError::new(LOGIN_SUPERSEDED));
                }
                log::info!("[AuthSession] Logged in as {}", user.username);
                Ok(user)
            }
            Err(e) if !self.is_current(generation) => {
                log::debug!("[AuthSession] Login {} overtaken: {}", generation, e);
                Err(e)
            }
            Err(e) => {
                log::warn!("[AuthSession] Login failed: {}", e);
                let mut next = if previous.is_authenticated() {
                    previous
                } else {
                    AuthSnapshot::anonymous()
                };
                next.loading = false;
                next.error = Some(e.message.clone());
                self.finish(generation, next);
                Err(e)
            }
        }
    }

    async fn authenticate(
        &self,
        generation: u64,
        username: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        let reply = self.provider.login(username, password).await?;
        if !self.is_current(generation) {
            log::debug!("[AuthSession] Discarding token of overtaken login {}", generation);
            return Err(ServiceError::new(LOGIN_SUPERSEDED));
        }
        self.provider.install_token(Some(reply.access_token));

        match reply.user {
            Some(user) => Ok(user),
            None => match self.provider.current_user().await {
                Ok(user) => Ok(user),
                Err(e) => {
                    // Only take the token back if nothing newer replaced it
                    if self.is_current(generation) {
                        self.provider.install_token(None);
                    }
                    Err(e)
                }
            },
        }
    }

    /// Create an account. The session stays as it was; log in afterwards.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ServiceError> {
        let previous = self.snapshot();
        let generation = self.begin();
        let result = self.provider.register(request).await;
        let mut next = previous;
        next.loading = false;
        next.error = result.as_ref().err().map(|e| e.message.clone());
        self.finish(generation, next);
        result
    }

    pub async fn logout(&self) {
        let generation = self.begin();
        if let Err(e) = self.provider.logout().await {
            // The local session ends regardless
            log::warn!("[AuthSession] Server logout failed: {}", e);
        }
        self.finish(generation, AuthSnapshot::anonymous());

        if let Ok(hooks) = self.logout_hooks.lock() {
            for hook in hooks.iter() {
                hook();
            }
        }
        log::info!("[AuthSession] Logged out");
    }
}
