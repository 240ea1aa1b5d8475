// Data models matching the server API payloads

pub mod ai;
pub mod aws;
pub mod import;
pub mod job;
pub mod production;
pub mod project;
pub mod security;
pub mod user;
pub mod wire;

pub use aws::{
    AccountDetails, AwsAccount, AwsAccountPatch, AwsCredentials, CredentialCheck,
    DeploymentRecord, NewAwsAccount,
};
pub use import::{
    ImportRequest, ImportResult, Inventory, Region, RiskLevel, RiskSummary, ScanRequest,
    SecurityAnalysis, SecurityFinding, Severity, TemplateDocument,
};
pub use job::{Job, JobKind, JobSnapshot, JobStart, JobStatus, JOB_FAILED_FALLBACK};
pub use production::{
    ApplyPoliciesRequest, DeployRequest, DestroyRequest, ImportExistingRequest,
};
pub use project::{
    ArchitectureData, CostItem, Diagram, GenerateRequest, GenerateResponse, NewProject, Project,
    ProjectPatch, ProjectSummary,
};
pub use security::RecommendationFilters;
pub use user::{LoginRequest, LoginResponse, RegisterRequest, User};
