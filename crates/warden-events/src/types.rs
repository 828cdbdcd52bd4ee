//! Core event types
//!
//! An [`Event`] is an immutable-after-creation record of something that
//! happened, plus mutable processing-state fields that only the bus touches
//! during dispatch. Event types use a dotted taxonomy
//! (e.g. `infrastructure.file.modified`, `service_health`).
//!
//! # Examples
//!
//! ```ignore
//! use warden_events::{Event, EventPriority};
//!
//! let event = Event::new("service_health", "container_monitor")
//!     .with_data("component", serde_json::json!("container:web"))
//!     .with_data("status", serde_json::json!("unhealthy"))
//!     .with_priority(EventPriority::High)
//!     .with_tag("container");
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority of an event, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    /// Background noise, safe to deprioritize
    Low,
    /// Default priority
    Normal,
    /// Needs attention soon
    High,
    /// Needs attention now
    Critical,
}

impl Default for EventPriority {
    fn default() -> Self {
        EventPriority::Normal
    }
}

/// An event flowing through the bus
///
/// Identity fields (`event_type`, `source`, `timestamp`, `data`, `metadata`,
/// `event_id`, `priority`, `tags`) never change after creation. Processing
/// state (`processed`, `processing_started_at`, `processing_completed_at`,
/// `processing_errors`) is mutated only by the bus during dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Dotted event type, e.g. `infrastructure.file.modified`
    pub event_type: String,

    /// Originating component name
    pub source: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Event payload
    pub data: HashMap<String, serde_json::Value>,

    /// String metadata (hashes, categories, correlation keys)
    pub metadata: HashMap<String, String>,

    /// Unique identifier, generated at creation
    pub event_id: String,

    /// Event priority
    pub priority: EventPriority,

    /// Tags for coarse-grained filtering
    pub tags: HashSet<String>,

    /// Whether dispatch has completed for this event
    pub processed: bool,

    /// Set by the bus when dispatch begins
    pub processing_started_at: Option<DateTime<Utc>>,

    /// Set by the bus exactly once, after `processing_started_at`
    pub processing_completed_at: Option<DateTime<Utc>>,

    /// Individual subscriber failures recorded during dispatch
    pub processing_errors: Vec<String>,
}

impl Event {
    /// Create a new event with a generated id and the current timestamp
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            timestamp: Utc::now(),
            data: HashMap::new(),
            metadata: HashMap::new(),
            event_id: Uuid::new_v4().to_string(),
            priority: EventPriority::Normal,
            tags: HashSet::new(),
            processed: false,
            processing_started_at: None,
            processing_completed_at: None,
            processing_errors: Vec::new(),
        }
    }

    /// Add a payload entry
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Fetch a payload value as a string slice
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Mark dispatch as started
    ///
    /// Idempotent: the first call wins so the recorded start time stays
    /// stable.
    pub fn mark_processing_started(&mut self) {
        if self.processing_started_at.is_none() {
            self.processing_started_at = Some(Utc::now());
        }
    }

    /// Mark dispatch as completed
    ///
    /// Completion is recorded at most once and only after dispatch started;
    /// `processed` becomes true exactly when completion is marked.
    pub fn mark_processing_completed(&mut self) {
        if self.processing_started_at.is_some() && self.processing_completed_at.is_none() {
            self.processing_completed_at = Some(Utc::now());
            self.processed = true;
        }
    }

    /// Record an individual subscriber failure
    pub fn record_processing_error(&mut self, error: impl Into<String>) {
        self.processing_errors.push(error.into());
    }

    /// Dispatch duration, defined only once completion has been marked
    pub fn processing_duration(&self) -> Option<chrono::Duration> {
        match (self.processing_started_at, self.processing_completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}
