//! Translation of failures into user-safe messages
//!
//! Anything the server or the transport can throw at us ends up here before it
//! reaches a banner or a toast. The workflow never displays raw objects.

use crate::transport::TransportError;
use serde_json::Value;
use thiserror::Error;

/// Shown when nothing better can be derived from a failure
pub const DEFAULT_FALLBACK: &str = "Something went wrong. Please try again.";

/// Turn any failure value into a displayable string.
///
/// Rules, first match wins: null → fallback; string → itself; record with a
/// `message` → that message; sequence → comma-joined translations; record with
/// `msg` → that msg; record with `detail` → translated detail; any other value
/// → its JSON text. Blank strings and empty containers yield the fallback.
pub fn to_user_message(value: &Value, fallback: &str) -> String {
    match value {
        Value::Null => fallback.to_string(),
        Value::String(s) => {
            if s.trim().is_empty() {
                fallback.to_string()
            } else {
                s.clone()
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                return fallback.to_string();
            }
            items
                .iter()
                .map(|item| to_user_message(item, fallback))
                .collect::<Vec<_>>()
                .join(", ")
        }
        Value::Object(map) => {
            if let Some(Value::String(message)) = map.get("message") {
                if !message.trim().is_empty() {
                    return message.clone();
                }
            }
            if let Some(msg) = map.get("msg").filter(|m| !m.is_null()) {
                return to_user_message(msg, fallback);
            }
            if let Some(detail) = map.get("detail") {
                return to_user_message(detail, fallback);
            }
            if map.is_empty() {
                return fallback.to_string();
            }
            serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
        }
        other => other.to_string(),
    }
}

/// Message for a failed API call: server `detail` first, then the transport
/// cause, then the fallback.
pub fn to_api_message(error: &TransportError, fallback: &str) -> String {
    if let Some(detail) = error.detail() {
        return to_user_message(detail, fallback);
    }
    if !error.cause.trim().is_empty() {
        return error.cause.clone();
    }
    fallback.to_string()
}

/// Same as [`to_api_message`] for an error-shaped JSON value
/// (`{"response": {"body": {"detail": ...}}, "message": ...}`).
pub fn to_api_message_value(value: &Value, fallback: &str) -> String {
    let detail = value
        .pointer("/response/body/detail")
        .filter(|d| !d.is_null());
    if let Some(detail) = detail {
        return to_user_message(detail, fallback);
    }
    if let Some(Value::String(message)) = value.get("message") {
        if !message.trim().is_empty() {
            return message.clone();
        }
    }
    to_user_message(value, fallback)
}

/// A failure surfaced by a resource service, already translated for display
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
    /// HTTP status of the underlying failure, if any
    pub status: Option<u16>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn from_transport(error: &TransportError, fallback: &str) -> Self {
        Self {
            message: to_api_message(error, fallback),
            status: error.status,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Extension trait that translates transport failures with a per-call fallback.
///
/// # Example
/// ```ignore
/// let project = transport.get("/projects/p1", RequestOptions::new())
///     .await
///     .with_fallback("Failed to load project")?;
/// ```
pub trait ResultExt<T> {
    fn with_fallback(self, fallback: &str) -> Result<T, ServiceError>;
}

impl<T> ResultExt<T> for Result<T, TransportError> {
    fn with_fallback(self, fallback: &str) -> Result<T, ServiceError> {
        self.map_err(|e| {
            let error = ServiceError::from_transport(&e, fallback);
            log::debug!("[errors] {} -> {}", e, error.message);
            error
        })
    }
}
