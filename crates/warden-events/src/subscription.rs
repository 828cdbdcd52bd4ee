//! Subscription bookkeeping
//!
//! Subscriptions are owned exclusively by the bus: created on `subscribe`,
//! destroyed on `unsubscribe`. The dispatch loop updates delivery counters
//! through interior atomics so the subscription map itself only needs a read
//! lock during dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::filter::EventFilter;
use crate::types::Event;

/// Callback invoked for each matching event
///
/// Callbacks receive a shared snapshot of the event and report failure as a
/// string; a failing callback is recorded on the event and never affects
/// sibling subscribers.
pub type SubscriberCallback =
    Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, std::result::Result<(), String>> + Send + Sync>;

/// A registered subscription
pub struct EventSubscription {
    /// Opaque identifier returned by `subscribe`
    pub subscription_id: String,

    /// Filter deciding which events this subscription receives
    pub filter: EventFilter,

    /// Callback invoked for matching events
    pub callback: SubscriberCallback,

    /// When the subscription was created
    pub created_at: DateTime<Utc>,

    events_delivered: AtomicU64,
    last_event_at: Mutex<Option<DateTime<Utc>>>,
}

impl EventSubscription {
    pub(crate) fn new(subscription_id: String, filter: EventFilter, callback: SubscriberCallback) -> Self {
        Self {
            subscription_id,
            filter,
            callback,
            created_at: Utc::now(),
            events_delivered: AtomicU64::new(0),
            last_event_at: Mutex::new(None),
        }
    }

    pub(crate) fn record_delivery(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_event_at.lock() {
            *last = Some(Utc::now());
        }
    }

    /// Number of events delivered to this subscription
    pub fn event_count(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    /// When the most recent event was delivered
    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at.lock().ok().and_then(|last| *last)
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("subscription_id", &self.subscription_id)
            .field("filter", &self.filter)
            .field("created_at", &self.created_at)
            .field("event_count", &self.event_count())
            .finish()
    }
}
