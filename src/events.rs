// Event types and payload structures for presentation updates
// These are broadcast to whatever front end is attached (CLI, GUI shell)

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Job lifecycle events
pub const EVENT_JOB_STARTED: &str = "job:started";
pub const EVENT_JOB_PROGRESS: &str = "job:progress";
pub const EVENT_JOB_LOG: &str = "job:log";
pub const EVENT_JOB_COMPLETED: &str = "job:completed";
pub const EVENT_JOB_FAILED: &str = "job:failed";
pub const EVENT_JOB_CANCELLED: &str = "job:cancelled";

// Workflow state machine events
pub const EVENT_WORKFLOW_STATE_CHANGED: &str = "workflow:state_changed";

// Navigation
pub const EVENT_ROUTE_CHANGED: &str = "route:changed";

/// Payload for job started events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStartedPayload {
    pub workflow: String,
    pub kind: String,
    pub job_id: String,
}

/// Payload for job progress events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressPayload {
    pub workflow: String,
    pub job_id: String,
    pub status: String,
    pub progress_percentage: u8,
    pub current_step: Option<String>,
}

/// Payload for a single new job log line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobLogPayload {
    pub workflow: String,
    pub job_id: String,
    pub line: String,
}

/// Payload for job terminal events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobFinishedPayload {
    pub workflow: String,
    pub job_id: String,
    /// Failure reason, for failed jobs
    pub reason: Option<String>,
}

/// Payload for workflow state changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStateChangedPayload {
    pub workflow: String,
    pub old_state: String,
    pub new_state: String,
}

/// Payload for route changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteChangedPayload {
    pub from: Option<String>,
    pub to: String,
}

/// An event delivered to presentation subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    /// Event type (e.g., "job:progress", "workflow:state_changed")
    pub event: String,
    /// Event payload as JSON value
    pub payload: serde_json::Value,
}

/// Broadcasts events to every subscriber
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBroadcaster {
    /// Create a broadcaster with a channel capacity of 256 events
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn broadcast(&self, event_type: &str, payload: impl Serialize) {
        let event = ClientEvent {
            event: event_type.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        };

        // Ignore send errors (no receivers)
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serialization() {
        let payload = JobProgressPayload {
            workflow: "deploy".to_string(),
            job_id: "d1".to_string(),
            status: "running".to_string(),
            progress_percentage: 42,
            current_step: Some("Creating VPC".to_string()),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("progressPercentage"));
        assert!(json.contains("currentStep"));
        assert!(json.contains("jobId"));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(
            EVENT_JOB_LOG,
            JobLogPayload {
                workflow: "import".to_string(),
                job_id: "i1".to_string(),
                line: "Scanning EC2".to_string(),
            },
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, EVENT_JOB_LOG);
        assert_eq!(event.payload["line"], "Scanning EC2");
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        EventBroadcaster::new().broadcast(EVENT_ROUTE_CHANGED, "ignored");
    }
}
