//! Bus-to-hooks bridge
//!
//! The engine subscribes to the event bus and, for each delivered event,
//! asks every enabled hook `should_execute`, fanning out `execute` calls as
//! independent tasks. Hook isolation holds: one hook's failure (or panic)
//! never affects siblings, and a hook's result is logged according to its
//! notification settings. Per-target serialization is not the engine's job;
//! that is the ledger's atomic attempt claim inside each hook.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use warden_events::{Event, EventBus, EventFilter};

use crate::error::{HookError, Result};
use crate::hook::Hook;
use crate::registry::HookRegistry;
use crate::types::{HookContext, HookResult};

/// Receives events from the bus and drives registered hooks
pub struct HookEngine {
    registry: Arc<dyn HookRegistry>,
    subscription: Mutex<Option<String>>,
}

impl HookEngine {
    /// Create an engine over a hook registry
    pub fn new(registry: Arc<dyn HookRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            subscription: Mutex::new(None),
        })
    }

    /// The registry this engine drives
    pub fn registry(&self) -> &Arc<dyn HookRegistry> {
        &self.registry
    }

    /// Subscribe to the bus
    ///
    /// Events matching `filter` are handed to the hooks. The engine's
    /// callback settles only after every triggered hook finished, so the
    /// bus marks the event processed once hook work is done.
    pub fn attach(self: &Arc<Self>, bus: &EventBus, filter: EventFilter) -> Result<()> {
        let engine = Arc::clone(self);
        let subscription_id = bus
            .subscribe(filter, move |event| {
                let engine = Arc::clone(&engine);
                Box::pin(async move {
                    engine.handle_event(event).await;
                    Ok(())
                })
            })
            .map_err(|e| HookError::Registry(e.to_string()))?;
        *self
            .subscription
            .lock()
            .map_err(|e| HookError::Registry(e.to_string()))? = Some(subscription_id);
        Ok(())
    }

    /// Remove the engine's bus subscription
    pub fn detach(&self, bus: &EventBus) -> Result<()> {
        let subscription_id = self
            .subscription
            .lock()
            .map_err(|e| HookError::Registry(e.to_string()))?
            .take();
        if let Some(id) = subscription_id {
            bus.unsubscribe(&id)
                .map_err(|e| HookError::Registry(e.to_string()))?;
        }
        Ok(())
    }

    /// Drive all enabled hooks for one event
    pub async fn handle_event(&self, event: Arc<Event>) {
        let hooks = match self.registry.enabled_hooks() {
            Ok(hooks) => hooks,
            Err(e) => {
                error!(event_id = %event.event_id, error = %e, "Hook registry unavailable");
                return;
            }
        };

        let mut executions = Vec::new();
        for hook in hooks {
            let context = HookContext::new(Arc::clone(&event));
            if !hook.should_execute(&context) {
                debug!(
                    hook_id = %hook.id(),
                    event_id = %event.event_id,
                    "Hook declined event"
                );
                continue;
            }
            debug!(
                hook_id = %hook.id(),
                event_id = %event.event_id,
                event_type = %event.event_type,
                "Executing hook"
            );
            executions.push(tokio::spawn(async move {
                let started = Instant::now();
                let mut result = hook.execute(&context).await;
                result.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
                (hook, result)
            }));
        }

        for execution in executions {
            match execution.await {
                Ok((hook, result)) => self.report(&hook, &result, &event),
                Err(e) => {
                    // A panicking hook is isolated; siblings already ran on
                    // their own tasks.
                    error!(event_id = %event.event_id, error = %e, "Hook task panicked");
                }
            }
        }
    }

    fn report(&self, hook: &Arc<dyn Hook>, result: &HookResult, event: &Event) {
        if result.success {
            if hook.settings().notify_on_success {
                info!(
                    hook_id = %hook.id(),
                    event_id = %event.event_id,
                    message = %result.message,
                    actions = ?result.actions_taken,
                    duration_ms = result.execution_time_ms,
                    "Hook remediation succeeded"
                );
            } else {
                debug!(
                    hook_id = %hook.id(),
                    event_id = %event.event_id,
                    message = %result.message,
                    "Hook remediation succeeded"
                );
            }
        } else if hook.settings().notify_on_failure {
            warn!(
                hook_id = %hook.id(),
                event_id = %event.event_id,
                message = %result.message,
                error = ?result.error,
                suggestions = ?result.suggestions,
                duration_ms = result.execution_time_ms,
                "Hook remediation unsuccessful"
            );
        } else {
            debug!(
                hook_id = %hook.id(),
                event_id = %event.event_id,
                message = %result.message,
                "Hook remediation unsuccessful"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookSettings;
    use crate::registry::InMemoryHookRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        id: String,
        settings: HookSettings,
        accept: bool,
        executions: Arc<AtomicUsize>,
        panic_on_execute: bool,
    }

    impl CountingHook {
        fn new(id: &str, accept: bool) -> (Arc<dyn Hook>, Arc<AtomicUsize>) {
            let executions = Arc::new(AtomicUsize::new(0));
            let hook = Arc::new(Self {
                id: id.to_string(),
                settings: HookSettings::default(),
                accept,
                executions: Arc::clone(&executions),
                panic_on_execute: false,
            });
            (hook, executions)
        }

        fn panicking(id: &str) -> Arc<dyn Hook> {
            Arc::new(Self {
                id: id.to_string(),
                settings: HookSettings::default(),
                accept: true,
                executions: Arc::new(AtomicUsize::new(0)),
                panic_on_execute: true,
            })
        }
    }

    #[async_trait]
    impl Hook for CountingHook {
        fn id(&self) -> &str {
            &self.id
        }

        fn settings(&self) -> &HookSettings {
            &self.settings
        }

        fn should_execute(&self, _ctx: &HookContext) -> bool {
            self.accept
        }

        async fn execute(&self, _ctx: &HookContext) -> HookResult {
            if self.panic_on_execute {
                panic!("hook exploded");
            }
            self.executions.fetch_add(1, Ordering::SeqCst);
            HookResult::success("done")
        }
    }

    fn event() -> Arc<Event> {
        Arc::new(Event::new("service_health", "unit"))
    }

    #[tokio::test]
    async fn test_only_accepting_hooks_execute() {
        let registry = Arc::new(InMemoryHookRegistry::new());
        let (accepting, accepted_count) = CountingHook::new("accepting", true);
        let (declining, declined_count) = CountingHook::new("declining", false);
        registry.register(accepting).unwrap();
        registry.register(declining).unwrap();

        let engine = HookEngine::new(registry);
        engine.handle_event(event()).await;

        assert_eq!(accepted_count.load(Ordering::SeqCst), 1);
        assert_eq!(declined_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registry_disabled_hook_is_skipped() {
        let registry = Arc::new(InMemoryHookRegistry::new());
        let (hook, count) = CountingHook::new("restart", true);
        registry.register(hook).unwrap();
        registry.set_enabled("restart", false).unwrap();

        let engine = HookEngine::new(registry);
        engine.handle_event(event()).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_hook_is_isolated() {
        let registry = Arc::new(InMemoryHookRegistry::new());
        registry.register(CountingHook::panicking("bad")).unwrap();
        let (good, good_count) = CountingHook::new("good", true);
        registry.register(good).unwrap();

        let engine = HookEngine::new(registry);
        engine.handle_event(event()).await;
        assert_eq!(good_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attach_and_detach() {
        let bus = EventBus::new(warden_events::EventBusConfig::default());
        let registry = Arc::new(InMemoryHookRegistry::new());
        let engine = HookEngine::new(registry);

        engine.attach(&bus, EventFilter::new()).unwrap();
        assert_eq!(bus.subscription_count(), 1);
        engine.detach(&bus).unwrap();
        assert_eq!(bus.subscription_count(), 0);
        // Detaching twice is harmless.
        engine.detach(&bus).unwrap();
    }
}
