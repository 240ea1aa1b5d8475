//! Resource services over the architecture API
//!
//! Each service is a stateless facade around an `Arc<dyn Transport>`. Every
//! method returns `Result<T, ServiceError>` with the message already
//! translated for display. Nothing here retries; that is the caller's call.

pub mod ai;
pub mod aws_accounts;
pub mod import;
pub mod production;
pub mod projects;
pub mod security;

pub use ai::AiService;
pub use aws_accounts::AwsAccountsService;
pub use import::{CredentialError, ImportService};
pub use production::ProductionService;
pub use projects::ProjectsService;
pub use security::SecurityService;

use crate::errors::{ResultExt, ServiceError};
use crate::transport::{decode, Method, RequestOptions, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Every service, built over one transport
#[derive(Clone)]
pub struct Services {
    pub projects: ProjectsService,
    pub aws_accounts: AwsAccountsService,
    pub import: ImportService,
    pub production: ProductionService,
    pub security: SecurityService,
    pub ai: AiService,
}

impl Services {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            projects: ProjectsService::new(transport.clone()),
            aws_accounts: AwsAccountsService::new(transport.clone()),
            import: ImportService::new(transport.clone()),
            production: ProductionService::new(transport.clone()),
            security: SecurityService::new(transport.clone()),
            ai: AiService::new(transport),
        }
    }
}

/// Send a request and decode the reply, translating failures with `fallback`
pub(crate) async fn fetch<T: DeserializeOwned>(
    transport: &dyn Transport,
    method: Method,
    path: &str,
    options: RequestOptions,
    fallback: &str,
) -> Result<T, ServiceError> {
    let value = transport
        .send(method, path, options)
        .await
        .with_fallback(fallback)?;
    decode(value).with_fallback(fallback)
}

/// Send a request whose reply body is irrelevant
pub(crate) async fn execute(
    transport: &dyn Transport,
    method: Method,
    path: &str,
    options: RequestOptions,
    fallback: &str,
) -> Result<(), ServiceError> {
    transport
        .send(method, path, options)
        .await
        .with_fallback(fallback)
        .map(|_| ())
}

/// JSON body for a request
pub(crate) fn body<T: Serialize + ?Sized>(
    value: &T,
    fallback: &str,
) -> Result<RequestOptions, ServiceError> {
    RequestOptions::json(value).with_fallback(fallback)
}

/// Decode a list that may arrive bare or wrapped under one of `keys`
pub(crate) fn decode_list<T: DeserializeOwned>(
    value: Value,
    keys: &[&str],
    fallback: &str,
) -> Result<Vec<T>, ServiceError> {
    let list = match value {
        Value::Null => Value::Array(Vec::new()),
        Value::Object(mut map) => keys
            .iter()
            .find_map(|k| map.remove(*k))
            .unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    decode(list).with_fallback(fallback)
}
