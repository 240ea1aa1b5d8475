//! Process-wide sessions
//!
//! The auth and architecture sessions are the only shared mutable state in
//! the client. Anyone may read or subscribe; only their own operations
//! mutate them.

pub mod architecture;
pub mod auth;
pub mod drafts;
pub mod observable;

pub use architecture::{reduce, ArchitectureAction, ArchitectureSession, ArchitectureState};
pub use auth::{
    AuthProvider, AuthSession, AuthSnapshot, AuthStatus, HttpAuthProvider, LOGIN_SUPERSEDED,
};
pub use drafts::{DraftStore, ProjectDraft, StoreError, CURRENT_PROJECT_KEY};
pub use observable::Observable;
