//! Bounded publish/subscribe event bus
//!
//! One logical dispatch loop pops events FIFO from a bounded queue, matches
//! them against registered subscriptions, and notifies matching subscribers
//! concurrently. Subscriber failures are isolated: they are recorded on the
//! event and never affect sibling subscribers or subsequent events.
//!
//! The queue is bounded and `emit` never blocks: a saturated queue is
//! reported synchronously to the producer as
//! [`EventBusError::QueueFull`](crate::error::EventBusError::QueueFull).
//!
//! # Examples
//!
//! ```ignore
//! use warden_events::{Event, EventBus, EventBusConfig, EventFilter};
//!
//! let bus = EventBus::new(EventBusConfig::default());
//! bus.start().await?;
//!
//! let id = bus.subscribe(EventFilter::new().with_event_type("service_health"), |event| {
//!     Box::pin(async move {
//!         println!("observed {}", event.event_type);
//!         Ok(())
//!     })
//! })?;
//!
//! bus.emit(Event::new("service_health", "monitor"))?;
//! bus.stop().await?;
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{EventBusError, Result};
use crate::filter::EventFilter;
use crate::persistence::HistoryStore;
use crate::subscription::EventSubscription;
use crate::types::Event;

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Capacity of the bounded event queue
    pub queue_capacity: usize,
    /// Maximum number of events retained in history
    pub history_capacity: usize,
    /// Bounded wait of the dispatch loop, so `stop()` is observed promptly
    pub poll_interval: Duration,
    /// Directory for history batches; `None` disables persistence
    pub persist_dir: Option<PathBuf>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            history_capacity: 500,
            poll_interval: Duration::from_millis(250),
            persist_dir: None,
        }
    }
}

struct BusShared {
    config: EventBusConfig,
    tx: mpsc::Sender<Event>,
    rx_slot: Mutex<Option<mpsc::Receiver<Event>>>,
    subscriptions: RwLock<HashMap<String, Arc<EventSubscription>>>,
    history: RwLock<VecDeque<Event>>,
    running: AtomicBool,
    store: Option<HistoryStore>,
}

/// Ordered, filtered delivery of events with bounded memory
///
/// The bus guarantees at-least-once delivery per matching subscription per
/// event and FIFO dispatch between events. It makes no ordering guarantee
/// between the side effects of concurrently-notified subscribers.
pub struct EventBus {
    shared: Arc<BusShared>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Create a bus with the given configuration; no work happens until
    /// `start()`
    pub fn new(config: EventBusConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let store = config.persist_dir.clone().map(HistoryStore::new);
        Self {
            shared: Arc::new(BusShared {
                config,
                tx,
                rx_slot: Mutex::new(Some(rx)),
                subscriptions: RwLock::new(HashMap::new()),
                history: RwLock::new(VecDeque::new()),
                running: AtomicBool::new(false),
                store,
            }),
            dispatch_handle: Mutex::new(None),
        }
    }

    /// Whether the dispatch loop is running
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Begin dispatching events
    ///
    /// Idempotent. When persistence is configured, the most recent persisted
    /// batch is loaded into history before dispatch begins.
    pub async fn start(&self) -> Result<()> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            debug!("Event bus already running");
            return Ok(());
        }

        if let Some(store) = &self.shared.store {
            let loaded = store.load_latest()?;
            if !loaded.is_empty() {
                let mut history = self.shared.history.write().map_err(poisoned)?;
                for event in loaded {
                    if history.len() >= self.shared.config.history_capacity {
                        history.pop_front();
                    }
                    history.push_back(event);
                }
                info!(count = history.len(), "Restored event history");
            }
        }

        let rx = self
            .shared
            .rx_slot
            .lock()
            .map_err(poisoned)?
            .take()
            .ok_or_else(|| EventBusError::Shutdown("event queue receiver missing".to_string()))?;

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { dispatch_loop(shared, rx).await });
        *self.dispatch_handle.lock().map_err(poisoned)? = Some(handle);

        info!(
            queue_capacity = self.shared.config.queue_capacity,
            history_capacity = self.shared.config.history_capacity,
            "Event bus started"
        );
        Ok(())
    }

    /// Stop dispatching events
    ///
    /// Idempotent. Signals the dispatch loop, awaits its termination (no
    /// detached work survives), then flushes history when persistence is
    /// configured.
    pub async fn stop(&self) -> Result<()> {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            debug!("Event bus already stopped");
            return Ok(());
        }

        let handle = self.dispatch_handle.lock().map_err(poisoned)?.take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| EventBusError::Shutdown(e.to_string()))?;
        }

        if let Some(store) = &self.shared.store {
            let history: Vec<Event> = {
                let history = self.shared.history.read().map_err(poisoned)?;
                history.iter().cloned().collect()
            };
            store.save_batch(&history)?;
            info!(count = history.len(), "Flushed event history");
        }

        info!("Event bus stopped");
        Ok(())
    }

    /// Enqueue an event for dispatch
    ///
    /// Never blocks: a saturated queue is reported synchronously as
    /// `QueueFull` and the caller chooses whether to drop, retry, or
    /// propagate.
    pub fn emit(&self, event: Event) -> Result<()> {
        self.shared.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EventBusError::QueueFull {
                capacity: self.shared.config.queue_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => EventBusError::Closed,
        })
    }

    /// Register a subscription; the returned id is the handle for removal
    pub fn subscribe<F>(&self, filter: EventFilter, callback: F) -> Result<String>
    where
        F: Fn(Arc<Event>) -> BoxFuture<'static, std::result::Result<(), String>>
            + Send
            + Sync
            + 'static,
    {
        let id = Uuid::new_v4().to_string();
        let subscription = Arc::new(EventSubscription::new(
            id.clone(),
            filter,
            Arc::new(callback),
        ));
        self.shared
            .subscriptions
            .write()
            .map_err(poisoned)?
            .insert(id.clone(), subscription);
        debug!(subscription_id = %id, "Subscription registered");
        Ok(id)
    }

    /// Remove a subscription; a no-op when the id is unknown
    pub fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let removed = self
            .shared
            .subscriptions
            .write()
            .map_err(poisoned)?
            .remove(subscription_id);
        if removed.is_none() {
            debug!(subscription_id = %subscription_id, "Unsubscribe for unknown id");
        }
        Ok(())
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.shared
            .subscriptions
            .read()
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// The most recent `limit` events, oldest first
    pub fn recent_events(&self, limit: usize) -> Result<Vec<Event>> {
        let history = self.shared.history.read().map_err(poisoned)?;
        let skip = history.len().saturating_sub(limit);
        Ok(history.iter().skip(skip).cloned().collect())
    }

    /// The most recent `limit` events of one type, oldest first
    pub fn events_by_type(&self, event_type: &str, limit: usize) -> Result<Vec<Event>> {
        let history = self.shared.history.read().map_err(poisoned)?;
        let mut matching: Vec<Event> = history
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.split_off(skip))
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> EventBusError {
    EventBusError::Shutdown(format!("internal lock poisoned: {e}"))
}

async fn dispatch_loop(shared: Arc<BusShared>, mut rx: mpsc::Receiver<Event>) {
    debug!("Dispatch loop started");
    loop {
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        match tokio::time::timeout(shared.config.poll_interval, rx.recv()).await {
            // Quiet period; re-check the running flag.
            Err(_) => continue,
            Ok(None) => {
                warn!("Event queue sender dropped, dispatch loop exiting");
                break;
            }
            Ok(Some(event)) => dispatch_one(&shared, event).await,
        }
    }
    // Hand the receiver back so a later start() resumes the same queue.
    if let Ok(mut slot) = shared.rx_slot.lock() {
        *slot = Some(rx);
    }
    debug!("Dispatch loop stopped");
}

async fn dispatch_one(shared: &Arc<BusShared>, mut event: Event) {
    event.mark_processing_started();
    append_history(shared, &event);

    let matching: Vec<Arc<EventSubscription>> = match shared.subscriptions.read() {
        Ok(subs) => subs
            .values()
            .filter(|s| s.filter.matches(&event))
            .cloned()
            .collect(),
        Err(e) => {
            error!(event_id = %event.event_id, error = %e, "Subscription map unavailable");
            Vec::new()
        }
    };

    debug!(
        event_id = %event.event_id,
        event_type = %event.event_type,
        subscriber_count = matching.len(),
        "Dispatching event"
    );

    // Subscribers see an immutable snapshot; each callback runs as its own
    // task so a panic cannot take down the dispatch loop or its siblings.
    let snapshot = Arc::new(event.clone());
    let mut handles = Vec::with_capacity(matching.len());
    for subscription in matching {
        subscription.record_delivery();
        let fut = (subscription.callback)(Arc::clone(&snapshot));
        handles.push((subscription.subscription_id.clone(), tokio::spawn(fut)));
    }

    for (subscription_id, handle) in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                warn!(
                    event_id = %event.event_id,
                    subscription_id = %subscription_id,
                    error = %message,
                    "Subscriber callback failed"
                );
                event.record_processing_error(format!(
                    "subscriber {subscription_id}: {message}"
                ));
            }
            Err(e) => {
                error!(
                    event_id = %event.event_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Subscriber callback panicked"
                );
                event.record_processing_error(format!(
                    "subscriber {subscription_id} panicked: {e}"
                ));
            }
        }
    }

    event.mark_processing_completed();
    finalize_history(shared, &event);
}

fn append_history(shared: &Arc<BusShared>, event: &Event) {
    match shared.history.write() {
        Ok(mut history) => {
            while history.len() >= shared.config.history_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }
        Err(e) => error!(event_id = %event.event_id, error = %e, "History unavailable"),
    }
}

fn finalize_history(shared: &Arc<BusShared>, event: &Event) {
    match shared.history.write() {
        Ok(mut history) => {
            if let Some(slot) = history
                .iter_mut()
                .rev()
                .find(|e| e.event_id == event.event_id)
            {
                *slot = event.clone();
            }
        }
        Err(e) => error!(event_id = %event.event_id, error = %e, "History unavailable"),
    }
}
