//! Hook registry
//!
//! Stores hooks behind their ids and offers a registry-level enable switch
//! independent of each hook's own `enabled` setting: a kill switch that
//! works without touching hook configuration.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{HookError, Result};
use crate::hook::Hook;

/// Trait for managing hooks
///
/// Implementations must be thread-safe (`Send + Sync`); the engine reads
/// the registry concurrently with registration calls.
pub trait HookRegistry: Send + Sync {
    /// Register a hook under its id
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` when the id is taken.
    fn register(&self, hook: Arc<dyn Hook>) -> Result<String>;

    /// Remove a hook
    ///
    /// # Errors
    ///
    /// Returns `HookNotFound` when the id is unknown.
    fn unregister(&self, hook_id: &str) -> Result<()>;

    /// Fetch a hook by id
    fn get(&self, hook_id: &str) -> Result<Arc<dyn Hook>>;

    /// All registered hooks
    fn list(&self) -> Result<Vec<Arc<dyn Hook>>>;

    /// Hooks that are enabled at the registry level
    fn enabled_hooks(&self) -> Result<Vec<Arc<dyn Hook>>>;

    /// Flip the registry-level enable switch for a hook
    fn set_enabled(&self, hook_id: &str, enabled: bool) -> Result<()>;
}

struct RegistryEntry {
    hook: Arc<dyn Hook>,
    enabled: bool,
}

/// In-memory hook registry
#[derive(Default)]
pub struct InMemoryHookRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl InMemoryHookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }
}

impl HookRegistry for InMemoryHookRegistry {
    fn register(&self, hook: Arc<dyn Hook>) -> Result<String> {
        let hook_id = hook.id().to_string();
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HookError::Registry(format!("failed to acquire write lock: {e}")))?;
        if entries.contains_key(&hook_id) {
            return Err(HookError::AlreadyRegistered(hook_id));
        }
        entries.insert(
            hook_id.clone(),
            RegistryEntry {
                hook,
                enabled: true,
            },
        );
        debug!(hook_id = %hook_id, "Hook registered");
        Ok(hook_id)
    }

    fn unregister(&self, hook_id: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HookError::Registry(format!("failed to acquire write lock: {e}")))?;
        entries
            .remove(hook_id)
            .ok_or_else(|| HookError::HookNotFound(hook_id.to_string()))?;
        debug!(hook_id = %hook_id, "Hook unregistered");
        Ok(())
    }

    fn get(&self, hook_id: &str) -> Result<Arc<dyn Hook>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HookError::Registry(format!("failed to acquire read lock: {e}")))?;
        entries
            .get(hook_id)
            .map(|entry| Arc::clone(&entry.hook))
            .ok_or_else(|| HookError::HookNotFound(hook_id.to_string()))
    }

    fn list(&self) -> Result<Vec<Arc<dyn Hook>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HookError::Registry(format!("failed to acquire read lock: {e}")))?;
        Ok(entries
            .values()
            .map(|entry| Arc::clone(&entry.hook))
            .collect())
    }

    fn enabled_hooks(&self) -> Result<Vec<Arc<dyn Hook>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HookError::Registry(format!("failed to acquire read lock: {e}")))?;
        Ok(entries
            .values()
            .filter(|entry| entry.enabled)
            .map(|entry| Arc::clone(&entry.hook))
            .collect())
    }

    fn set_enabled(&self, hook_id: &str, enabled: bool) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| HookError::Registry(format!("failed to acquire write lock: {e}")))?;
        let entry = entries
            .get_mut(hook_id)
            .ok_or_else(|| HookError::HookNotFound(hook_id.to_string()))?;
        entry.enabled = enabled;
        debug!(hook_id = %hook_id, enabled = enabled, "Hook enable switch flipped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookSettings;
    use crate::types::{HookContext, HookResult};
    use async_trait::async_trait;

    struct NoopHook {
        id: String,
        settings: HookSettings,
    }

    impl NoopHook {
        fn new(id: &str) -> Arc<dyn Hook> {
            Arc::new(Self {
                id: id.to_string(),
                settings: HookSettings::default(),
            })
        }
    }

    #[async_trait]
    impl Hook for NoopHook {
        fn id(&self) -> &str {
            &self.id
        }

        fn settings(&self) -> &HookSettings {
            &self.settings
        }

        fn should_execute(&self, _ctx: &HookContext) -> bool {
            false
        }

        async fn execute(&self, _ctx: &HookContext) -> HookResult {
            HookResult::success("noop")
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = InMemoryHookRegistry::new();
        let id = registry.register(NoopHook::new("restart")).unwrap();
        assert_eq!(id, "restart");
        assert_eq!(registry.get("restart").unwrap().id(), "restart");
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = InMemoryHookRegistry::new();
        registry.register(NoopHook::new("restart")).unwrap();
        assert!(matches!(
            registry.register(NoopHook::new("restart")),
            Err(HookError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_unregister_unknown_hook() {
        let registry = InMemoryHookRegistry::new();
        assert!(matches!(
            registry.unregister("missing"),
            Err(HookError::HookNotFound(_))
        ));
    }

    #[test]
    fn test_enable_switch_filters_enabled_hooks() {
        let registry = InMemoryHookRegistry::new();
        registry.register(NoopHook::new("restart")).unwrap();
        registry.register(NoopHook::new("scaling")).unwrap();
        assert_eq!(registry.enabled_hooks().unwrap().len(), 2);

        registry.set_enabled("scaling", false).unwrap();
        let enabled = registry.enabled_hooks().unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id(), "restart");

        registry.set_enabled("scaling", true).unwrap();
        assert_eq!(registry.enabled_hooks().unwrap().len(), 2);
    }
}
