//! Hook execution types
//!
//! [`HookContext`] is the read-only view of the triggering event handed to
//! hooks; [`HookResult`] is the structured outcome every `execute` returns.
//! Nothing escapes a hook as an unhandled fault; failures become a result
//! with `success = false` and a populated `error`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use warden_events::Event;

/// Event type carrying container health transitions
pub const SERVICE_HEALTH_EVENT: &str = "service_health";
/// Event type carrying container resource metrics
pub const RESOURCE_USAGE_EVENT: &str = "resource_usage";
/// Event type for custom events (log lines among them)
pub const CUSTOM_EVENT: &str = "custom";
/// `event_name` payload value identifying a container log line
pub const CONTAINER_LOG_EVENT_NAME: &str = "container_log";

/// Read-only context handed to hooks for one event
///
/// Accessors decode the event taxonomy the engine consumes:
/// `service_health` events carry `{component: "container:<name>", status}`,
/// `resource_usage` events carry `{metric_name, value, tags: {container_name}}`,
/// and custom log events carry `{event_name: "container_log", component,
/// log_line}`.
#[derive(Debug, Clone)]
pub struct HookContext {
    event: Arc<Event>,
}

impl HookContext {
    /// Wrap a dispatched event
    pub fn new(event: Arc<Event>) -> Self {
        Self { event }
    }

    /// The underlying event
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Dotted event type
    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }

    /// `component` payload field
    pub fn component(&self) -> Option<&str> {
        self.event.data_str("component")
    }

    /// Container name when the component is `container:<name>`
    pub fn container_target(&self) -> Option<String> {
        self.component()
            .and_then(|c| c.strip_prefix("container:"))
            .map(str::to_string)
    }

    /// `status` payload field
    pub fn status(&self) -> Option<&str> {
        self.event.data_str("status")
    }

    /// `event_name` payload field of custom events
    pub fn event_name(&self) -> Option<&str> {
        self.event.data_str("event_name")
    }

    /// `log_line` payload field of container log events
    pub fn log_line(&self) -> Option<&str> {
        self.event.data_str("log_line")
    }

    /// `metric_name` payload field of resource usage events
    pub fn metric_name(&self) -> Option<&str> {
        self.event.data_str("metric_name")
    }

    /// `value` payload field of resource usage events
    pub fn metric_value(&self) -> Option<f64> {
        self.event.data.get("value").and_then(|v| v.as_f64())
    }

    /// A key inside the `tags` payload object of resource usage events
    pub fn metric_tag(&self, key: &str) -> Option<&str> {
        self.event
            .data
            .get("tags")
            .and_then(|tags| tags.get(key))
            .and_then(|v| v.as_str())
    }
}

/// Structured outcome of a hook execution
///
/// Consumed by logging/reporting/notification collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResult {
    /// Whether the remediation was fully successful (action + verification)
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Actions that were actually performed
    pub actions_taken: Vec<String>,

    /// Follow-ups for an operator
    pub suggestions: Vec<String>,

    /// Numeric/structured observations (attempt counts, values seen)
    pub metrics: HashMap<String, serde_json::Value>,

    /// Wall-clock execution time, stamped by the engine
    pub execution_time_ms: f64,

    /// Underlying error, captured verbatim when something failed
    pub error: Option<String>,
}

impl HookResult {
    /// A successful result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            actions_taken: Vec::new(),
            suggestions: Vec::new(),
            metrics: HashMap::new(),
            execution_time_ms: 0.0,
            error: None,
        }
    }

    /// A failed result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(message)
        }
    }

    /// Record an action that was performed
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions_taken.push(action.into());
        self
    }

    /// Record a follow-up suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Record a metric
    pub fn with_metric(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Capture an underlying error verbatim
    pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
