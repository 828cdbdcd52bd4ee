//! Event filtering predicates
//!
//! An [`EventFilter`] decides whether a subscription receives an event.
//! Every criterion is optional; an empty filter matches everything.
//! Criteria combine with AND: an event must satisfy all of them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::types::{Event, EventPriority};

/// Custom predicate over an event
pub type EventPredicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Predicate over an [`Event`]
///
/// Event type patterns are either exact (`service_health`) or a trailing
/// wildcard over one taxonomy prefix (`infrastructure.*` matches
/// `infrastructure.file.modified`).
#[derive(Clone, Default)]
pub struct EventFilter {
    event_types: Vec<String>,
    sources: Vec<String>,
    required_tags: HashSet<String>,
    min_priority: Option<EventPriority>,
    predicate: Option<EventPredicate>,
}

impl EventFilter {
    /// Create a filter that matches every event
    pub fn new() -> Self {
        Self::default()
    }

    /// Match an event type, exact or with a trailing `.*` wildcard
    pub fn with_event_type(mut self, pattern: impl Into<String>) -> Self {
        self.event_types.push(pattern.into());
        self
    }

    /// Match an originating source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Require a tag to be present on the event
    pub fn with_required_tag(mut self, tag: impl Into<String>) -> Self {
        self.required_tags.insert(tag.into());
        self
    }

    /// Require a minimum priority
    pub fn with_min_priority(mut self, priority: EventPriority) -> Self {
        self.min_priority = Some(priority);
        self
    }

    /// Attach a custom predicate, evaluated last
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&Event) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Whether this filter accepts the event
    pub fn matches(&self, event: &Event) -> bool {
        if !self.event_types.is_empty()
            && !self
                .event_types
                .iter()
                .any(|pattern| type_matches(pattern, &event.event_type))
        {
            return false;
        }

        if !self.sources.is_empty() && !self.sources.iter().any(|s| s == &event.source) {
            return false;
        }

        if !self.required_tags.is_subset(&event.tags) {
            return false;
        }

        if let Some(min) = self.min_priority {
            if event.priority < min {
                return false;
            }
        }

        if let Some(predicate) = &self.predicate {
            if !predicate(event) {
                return false;
            }
        }

        true
    }
}

fn type_matches(pattern: &str, event_type: &str) -> bool {
    match pattern.strip_suffix(".*") {
        Some(prefix) => {
            event_type == prefix
                || (event_type.starts_with(prefix)
                    && event_type.as_bytes().get(prefix.len()) == Some(&b'.'))
        }
        None => pattern == event_type,
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("event_types", &self.event_types)
            .field("sources", &self.sources)
            .field("required_tags", &self.required_tags)
            .field("min_priority", &self.min_priority)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    fn event(event_type: &str) -> Event {
        Event::new(event_type, "unit")
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = EventFilter::new();
        assert!(filter.matches(&event("anything.at.all")));
    }

    #[test]
    fn test_exact_type_match() {
        let filter = EventFilter::new().with_event_type("service_health");
        assert!(filter.matches(&event("service_health")));
        assert!(!filter.matches(&event("service_health.container")));
        assert!(!filter.matches(&event("resource_usage")));
    }

    #[test]
    fn test_wildcard_type_match() {
        let filter = EventFilter::new().with_event_type("infrastructure.*");
        assert!(filter.matches(&event("infrastructure.file.modified")));
        assert!(filter.matches(&event("infrastructure")));
        assert!(!filter.matches(&event("infrastructure_other")));
        assert!(!filter.matches(&event("workflow.file.modified")));
    }

    #[test]
    fn test_source_and_tag_filters() {
        let filter = EventFilter::new()
            .with_source("filesystem_watcher")
            .with_required_tag("file");

        let mut matching = event("generic.file.created").with_tag("file");
        matching.source = "filesystem_watcher".to_string();
        assert!(filter.matches(&matching));

        let wrong_source = event("generic.file.created").with_tag("file");
        assert!(!filter.matches(&wrong_source));
    }

    #[test]
    fn test_min_priority() {
        let filter = EventFilter::new().with_min_priority(EventPriority::High);
        assert!(filter.matches(&event("x").with_priority(EventPriority::Critical)));
        assert!(filter.matches(&event("x").with_priority(EventPriority::High)));
        assert!(!filter.matches(&event("x").with_priority(EventPriority::Normal)));
    }

    #[test]
    fn test_custom_predicate() {
        let filter = EventFilter::new()
            .with_predicate(|e| e.data_str("status") == Some("unhealthy"));
        assert!(filter.matches(
            &event("service_health").with_data("status", serde_json::json!("unhealthy"))
        ));
        assert!(!filter.matches(
            &event("service_health").with_data("status", serde_json::json!("healthy"))
        ));
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let filter = EventFilter::new()
            .with_event_type("service_health")
            .with_min_priority(EventPriority::High);
        assert!(!filter.matches(&event("service_health")));
        assert!(filter.matches(&event("service_health").with_priority(EventPriority::High)));
    }
}
