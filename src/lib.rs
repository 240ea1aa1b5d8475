// Clippy allows for reasonable defaults
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::field_reassign_with_default)] // Builder pattern is clearer
#![allow(clippy::large_enum_variant)] // Workflow inputs carry whole requests

//! Workflow client for the AWS Architecture Generator
//!
//! The library holds everything except presentation: the HTTP transport and
//! resource services, the auth and architecture sessions, the job
//! orchestrator that polls long-running server work, the create / import /
//! deploy workflows and the route gate. Front ends (the bundled CLI, or a GUI)
//! drive an [`App`] and render what it publishes.

// Module declarations
pub mod app;
pub mod config;
pub mod errors;
pub mod events;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod questionnaire;
pub mod routes;
pub mod services;
pub mod session;
pub mod testing;
pub mod transport;
pub mod workflow;

pub use app::App;
pub use config::{load_config, ClientConfig, PartialConfig};
pub use errors::ServiceError;
pub use notify::{Notice, NoticeLevel, Notifier};
pub use routes::{Route, RouteDecision};
pub use workflow::{WorkflowController, WorkflowError, WorkflowKind};
