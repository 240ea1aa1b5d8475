// Current location, kept in step with the auth session

use super::{Gatekeeper, Route, RouteDecision};
use crate::events::{EventBroadcaster, RouteChangedPayload, EVENT_ROUTE_CHANGED};
use crate::session::{AuthSnapshot, AuthStatus, Observable};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationState {
    pub current: Route,
    /// Where to go once logged in
    pub remembered: Option<String>,
    /// Requested while auth was still unknown
    pub pending: Option<String>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current: Route::Home,
            remembered: None,
            pending: None,
        }
    }
}

pub struct Navigator {
    gatekeeper: Gatekeeper,
    state: Observable<NavigationState>,
    auth: Mutex<AuthSnapshot>,
    broadcaster: EventBroadcaster,
}

impl Navigator {
    pub fn new(broadcaster: EventBroadcaster) -> Self {
        Self {
            gatekeeper: Gatekeeper,
            state: Observable::default(),
            auth: Mutex::new(AuthSnapshot::unknown()),
            broadcaster,
        }
    }

    pub fn snapshot(&self) -> NavigationState {
        self.state.get()
    }

    pub fn current(&self) -> Route {
        self.snapshot().current
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.state.subscribe()
    }

    fn auth(&self) -> AuthSnapshot {
        self.auth
            .lock()
            .map(|auth| auth.clone())
            .unwrap_or_else(|_| AuthSnapshot::unknown())
    }

    /// Go to `path` if the guards allow it, otherwise wherever they redirect
    pub fn navigate(&self, path: &str) -> RouteDecision {
        let decision = self.gatekeeper.resolve(path, &self.auth());
        let target = match &decision {
            RouteDecision::Render(route) => {
                self.state.update(|s| s.pending = None);
                route.clone()
            }
            RouteDecision::Redirect { to, remember } => {
                self.state.update(|s| {
                    s.pending = None;
                    if remember.is_some() {
                        s.remembered = remember.clone();
                    }
                });
                to.clone()
            }
            RouteDecision::Pending(route) => {
                log::debug!("[Navigator] Holding {} until auth resolves", route);
                self.state.update(|s| s.pending = Some(route.path()));
                return decision;
            }
        };
        self.go(target);
        decision
    }

    pub fn navigate_to(&self, route: &Route) -> RouteDecision {
        self.navigate(&route.path())
    }

    fn go(&self, to: Route) {
        let from = self.state.update(|s| {
            if s.current == to {
                return None;
            }
            Some(std::mem::replace(&mut s.current, to.clone()))
        });
        if let Some(from) = from {
            log::info!("[Navigator] {} -> {}", from, to);
            self.broadcaster.broadcast(
                EVENT_ROUTE_CHANGED,
                RouteChangedPayload {
                    from: Some(from.path()),
                    to: to.path(),
                },
            );
        }
    }

    /// Re-apply the guards after an auth change
    pub fn on_auth_changed(&self, auth: &AuthSnapshot) {
        if let Ok(mut current) = self.auth.lock() {
            *current = auth.clone();
        }
        let state = self.snapshot();

        match auth.status {
            AuthStatus::Unknown => {}
            AuthStatus::Authenticated => {
                if let Some(pending) = state.pending {
                    self.navigate(&pending);
                } else if state.current.is_public() {
                    let target = self
                        .state
                        .update(|s| s.remembered.take())
                        .unwrap_or_else(|| Route::Home.path());
                    self.navigate(&target);
                }
            }
            AuthStatus::Anonymous => {
                if let Some(pending) = state.pending {
                    self.navigate(&pending);
                } else if !state.current.is_public() {
                    self.navigate(&state.current.path());
                }
            }
        }
    }

    /// Follow the auth session until it goes away
    pub fn follow(self: Arc<Self>, mut auth: watch::Receiver<AuthSnapshot>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let snapshot = auth.borrow_and_update().clone();
                self.on_auth_changed(&snapshot);
                if auth.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
