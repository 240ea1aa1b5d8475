//! Route table and entry guards
//!
//! Every path except `/login` and `/register` requires an authenticated
//! session; `/users` additionally requires an administrator. Unknown paths
//! fall back to the projects home.

pub mod navigator;

pub use navigator::{NavigationState, Navigator};

use crate::session::{AuthSnapshot, AuthStatus};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Route {
    Login,
    Register,
    Home,
    Architectures,
    Create,
    Project(String),
    Architecture(String),
    CostAnalysis,
    Security,
    Analytics,
    Users,
    Settings,
    Import,
    Production,
    ManageAwsAccounts,
    Projects,
    /// Any unrecognised path, kept as written
    Fallback(String),
}

/// Workflow a route enters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    Create,
    Import,
    Deploy,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Create => "create",
            WorkflowKind::Import => "import",
            WorkflowKind::Deploy => "deploy",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Route {
    /// Parse a location. Query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Route {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["architectures"] => Route::Architectures,
            ["create"] => Route::Create,
            ["project", id] => Route::Project(id.to_string()),
            ["architecture", id] => Route::Architecture(id.to_string()),
            ["cost-analysis"] => Route::CostAnalysis,
            ["security"] => Route::Security,
            ["analytics"] => Route::Analytics,
            ["users"] => Route::Users,
            ["settings"] => Route::Settings,
            ["import"] => Route::Import,
            ["production"] => Route::Production,
            ["manage-aws-accounts"] => Route::ManageAwsAccounts,
            ["projects"] => Route::Projects,
            _ => Route::Fallback(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".into(),
            Route::Register => "/register".into(),
            Route::Home => "/".into(),
            Route::Architectures => "/architectures".into(),
            Route::Create => "/create".into(),
            Route::Project(id) => format!("/project/{}", id),
            Route::Architecture(id) => format!("/architecture/{}", id),
            Route::CostAnalysis => "/cost-analysis".into(),
            Route::Security => "/security".into(),
            Route::Analytics => "/analytics".into(),
            Route::Users => "/users".into(),
            Route::Settings => "/settings".into(),
            Route::Import => "/import".into(),
            Route::Production => "/production".into(),
            Route::ManageAwsAccounts => "/manage-aws-accounts".into(),
            Route::Projects => "/projects".into(),
            Route::Fallback(path) => path.clone(),
        }
    }

    /// Reachable without a session
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Users)
    }

    pub fn workflow(&self) -> Option<WorkflowKind> {
        match self {
            Route::Create => Some(WorkflowKind::Create),
            Route::Import => Some(WorkflowKind::Import),
            Route::Production => Some(WorkflowKind::Deploy),
            _ => None,
        }
    }

    /// Project whose architecture this route shows
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Route::Project(id) | Route::Architecture(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.path()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    /// Go to `to` instead; `remember` is the path to return to after login
    Redirect {
        to: Route,
        remember: Option<String>,
    },
    /// Auth is still being resolved
    Pending(Route),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Gatekeeper;

impl Gatekeeper {
    pub fn resolve(&self, path: &str, auth: &AuthSnapshot) -> RouteDecision {
        let route = Route::parse(path);
        if route.is_public() {
            return RouteDecision::Render(route);
        }

        match auth.status {
            AuthStatus::Unknown => RouteDecision::Pending(route),
            AuthStatus::Anonymous => RouteDecision::Redirect {
                to: Route::Login,
                remember: Some(route.path()),
            },
            AuthStatus::Authenticated => {
                if route.requires_admin() && !auth.is_admin() {
                    log::info!("[Gatekeeper] {} requires an administrator", route);
                    return RouteDecision::Redirect {
                        to: Route::Home,
                        remember: None,
                    };
                }
                if let Route::Fallback(_) = route {
                    return RouteDecision::Redirect {
                        to: Route::Projects,
                        remember: None,
                    };
                }
                RouteDecision::Render(route)
            }
        }
    }
}
