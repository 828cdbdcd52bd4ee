//! End-to-end: service health events -> engine -> restart hook
//!
//! A container that keeps failing verification burns through its cooldown
//! and attempt budget exactly as the ledger prescribes: repeated health
//! events inside one cooldown window produce a single remediation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use warden_events::{Event, EventBus, EventBusConfig, EventFilter};
use warden_hooks::{
    ContainerRestartHook, ContainerRuntime, ContainerStatus, HealthState, HookEngine,
    HookRegistry, HookSettings, InMemoryHookRegistry, ResourceLimits, RestartHookConfig,
    Result as HooksResult, SERVICE_HEALTH_EVENT,
};

/// Restarts always "work", verification always finds the container still
/// unhealthy: the DEGRADED path.
struct StubbornlyUnhealthyRuntime {
    restarts: AtomicUsize,
}

#[async_trait]
impl ContainerRuntime for StubbornlyUnhealthyRuntime {
    async fn status(&self, _target: &str) -> HooksResult<ContainerStatus> {
        Ok(ContainerStatus::Running)
    }

    async fn restart(&self, _target: &str) -> HooksResult<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn inspect_health(&self, _target: &str) -> HooksResult<HealthState> {
        Ok(HealthState::Unhealthy)
    }

    async fn update_limits(&self, _target: &str, _limits: &ResourceLimits) -> HooksResult<()> {
        Ok(())
    }
}

fn unhealthy_event(name: &str) -> Event {
    Event::new(SERVICE_HEALTH_EVENT, "container_monitor")
        .with_data("component", serde_json::json!(format!("container:{name}")))
        .with_data("status", serde_json::json!("unhealthy"))
}

async fn wait_all_processed(bus: &EventBus, expected: usize) {
    for _ in 0..100 {
        let processed = bus
            .recent_events(usize::MAX)
            .unwrap()
            .iter()
            .filter(|e| e.processed)
            .count();
        if processed >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("only some events were processed");
}

#[tokio::test]
async fn test_flapping_container_gets_exactly_two_remediations() {
    let bus = EventBus::new(EventBusConfig {
        poll_interval: Duration::from_millis(20),
        ..EventBusConfig::default()
    });
    bus.start().await.unwrap();

    let runtime = Arc::new(StubbornlyUnhealthyRuntime {
        restarts: AtomicUsize::new(0),
    });
    let hook = Arc::new(ContainerRestartHook::new(
        RestartHookConfig {
            settings: HookSettings {
                max_attempts: 3,
                cooldown_seconds: 1,
                ..HookSettings::default()
            },
            verify_delay_ms: 0,
            ..RestartHookConfig::default()
        },
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
    ));

    let registry: Arc<dyn HookRegistry> = Arc::new(InMemoryHookRegistry::new());
    registry.register(Arc::clone(&hook) as Arc<dyn warden_hooks::Hook>).unwrap();
    let engine = HookEngine::new(registry);
    engine
        .attach(&bus, EventFilter::new().with_event_type(SERVICE_HEALTH_EVENT))
        .unwrap();

    // Two events back to back: one remediation, one cooldown skip.
    bus.emit(unhealthy_event("web")).unwrap();
    bus.emit(unhealthy_event("web")).unwrap();
    wait_all_processed(&bus, 2).await;
    assert_eq!(runtime.restarts.load(Ordering::SeqCst), 1);

    // Let the cooldown expire, then two more: one remediation, one skip.
    tokio::time::sleep(Duration::from_millis(1300)).await;
    bus.emit(unhealthy_event("web")).unwrap();
    bus.emit(unhealthy_event("web")).unwrap();
    wait_all_processed(&bus, 4).await;

    assert_eq!(runtime.restarts.load(Ordering::SeqCst), 2);
    // Verification failed both times (DEGRADED), so attempts accumulate.
    assert_eq!(hook.attempts("web"), 2);

    engine.detach(&bus).unwrap();
    bus.stop().await.unwrap();
}

#[tokio::test]
async fn test_exhausted_container_stays_terminal_until_operator_reset() {
    let bus = EventBus::new(EventBusConfig {
        poll_interval: Duration::from_millis(20),
        ..EventBusConfig::default()
    });
    bus.start().await.unwrap();

    let runtime = Arc::new(StubbornlyUnhealthyRuntime {
        restarts: AtomicUsize::new(0),
    });
    let hook = Arc::new(ContainerRestartHook::new(
        RestartHookConfig {
            settings: HookSettings {
                max_attempts: 2,
                cooldown_seconds: 0,
                ..HookSettings::default()
            },
            verify_delay_ms: 0,
            ..RestartHookConfig::default()
        },
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
    ));

    let registry: Arc<dyn HookRegistry> = Arc::new(InMemoryHookRegistry::new());
    registry.register(Arc::clone(&hook) as Arc<dyn warden_hooks::Hook>).unwrap();
    let engine = HookEngine::new(registry);
    engine
        .attach(&bus, EventFilter::new().with_event_type(SERVICE_HEALTH_EVENT))
        .unwrap();

    for _ in 0..4 {
        bus.emit(unhealthy_event("api")).unwrap();
    }
    wait_all_processed(&bus, 4).await;

    // Two attempts consumed the budget; the rest were informational skips.
    assert_eq!(runtime.restarts.load(Ordering::SeqCst), 2);
    assert_eq!(hook.exhausted_targets(), vec!["api".to_string()]);

    // The operator reset reopens the target.
    hook.reset_target("api");
    bus.emit(unhealthy_event("api")).unwrap();
    wait_all_processed(&bus, 5).await;
    assert_eq!(runtime.restarts.load(Ordering::SeqCst), 3);

    engine.detach(&bus).unwrap();
    bus.stop().await.unwrap();
}
