//! In-memory transport double
//!
//! Replies are scripted per `(method, path)`. Each scripted route keeps a
//! queue; the last reply in a queue repeats, so a single `ok` answers every
//! call. Unscripted requests fail with a 404 carrying a FastAPI-style detail.

use crate::transport::{Method, RequestOptions, Transport, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// A request observed by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Reply {
    delay: Option<Duration>,
    result: Result<Value, TransportError>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    token: Mutex<Option<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        if let Ok(mut routes) = self.routes.lock() {
            routes
                .entry((method, path.to_string()))
                .or_default()
                .push_back(reply);
        }
    }

    /// Queue a successful reply
    pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
        self.push(
            method,
            path,
            Reply {
                delay: None,
                result: Ok(body),
            },
        );
        self
    }

    /// Queue a successful reply delivered after `delay`
    pub fn ok_after(&self, method: Method, path: &str, delay: Duration, body: Value) -> &Self {
        self.push(
            method,
            path,
            Reply {
                delay: Some(delay),
                result: Ok(body),
            },
        );
        self
    }

    /// Queue an HTTP failure
    pub fn fail(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.push(
            method,
            path,
            Reply {
                delay: None,
                result: Err(TransportError::http(status, Some(body))),
            },
        );
        self
    }

    /// Queue a failure that never reached the server
    pub fn offline(&self, method: Method, path: &str) -> &Self {
        self.push(
            method,
            path,
            Reply {
                delay: None,
                result: Err(TransportError::network("Network Error")),
            },
        );
        self
    }

    /// Drop every queued reply for a route
    pub fn clear(&self, method: Method, path: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(&(method, path.to_string()));
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made to `(method, path)`
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Body of the most recent call to `(method, path)`
    pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| c.method == method && c.path == path)
            .and_then(|c| c.body)
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn next_reply(&self, method: Method, path: &str) -> Reply {
        let missing = Reply {
            delay: None,
            result: Err(TransportError::http(404, Some(json!({"detail": "Not Found"})))),
        };
        let Ok(mut routes) = self.routes.lock() else {
            return missing;
        };
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(missing),
            Some(queue) => queue.front().cloned().unwrap_or(missing),
            None => missing,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                method,
                path: path.to_string(),
                body: options.body.clone(),
                query: options.query.clone(),
            });
        }

        let reply = self.next_reply(method, path);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.result
    }

    fn set_auth_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.token.lock() {
            *current = token;
        }
    }

    fn has_auth_token(&self) -> bool {
        self.token().is_some()
    }

    fn auth_token(&self) -> Option<String> {
        self.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_reply_repeats() {
        let transport = ScriptedTransport::new();
        transport
            .ok(Method::Get, "/a", json!(1))
            .ok(Method::Get, "/a", json!(2));

        let first = transport.get("/a", RequestOptions::new()).await.unwrap();
        let second = transport.get("/a", RequestOptions::new()).await.unwrap();
        let third = transport.get("/a", RequestOptions::new()).await.unwrap();
        assert_eq!((first, second, third), (json!(1), json!(2), json!(2)));
        assert_eq!(transport.count(Method::Get, "/a"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_not_found() {
        let transport = ScriptedTransport::new();
        let err = transport.delete("/nope", RequestOptions::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
