//! Warden Event Bus
//!
//! Event model and publish/subscribe plumbing for the Warden automation
//! engine.
//!
//! # Overview
//!
//! Producers (the file-system watcher, infrastructure monitors, anything
//! else) publish [`Event`]s onto an [`EventBus`]. A single dispatch loop
//! pops events FIFO from a bounded queue, matches them against registered
//! [`EventFilter`]s, and notifies all matching subscribers concurrently.
//!
//! # Architecture
//!
//! 1. **Event model** (`types`): immutable event identity plus bus-owned
//!    processing state
//! 2. **Filters** (`filter`): type/source/tag/priority/custom predicates
//! 3. **Bus** (`bus`): bounded queue, dispatch loop, bounded history
//! 4. **Persistence** (`persistence`): timestamped history batches on disk
//!
//! # Guarantees
//!
//! - At-least-once delivery per matching subscription per event
//! - FIFO dispatch between events; no ordering between the side effects of
//!   concurrently-notified subscribers
//! - A failing subscriber is recorded on the event and isolated from
//!   siblings
//! - `emit` never blocks; a saturated queue fails fast with `QueueFull`
//! - `stop()` awaits loop termination; no detached work survives it
//!
//! # Thread Safety
//!
//! `EventBus` is `Send + Sync`; `subscribe`/`unsubscribe`/`emit` and the
//! history queries are safe to call concurrently with the dispatch loop.

pub mod bus;
pub mod error;
pub mod filter;
pub mod persistence;
pub mod subscription;
pub mod types;

pub use bus::{EventBus, EventBusConfig};
pub use error::{EventBusError, Result};
pub use filter::{EventFilter, EventPredicate};
pub use persistence::HistoryStore;
pub use subscription::{EventSubscription, SubscriberCallback};
pub use types::{Event, EventPriority};
