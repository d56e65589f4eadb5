//! In-memory registry of loaded plugins.
//!
//! The [`PluginRegistry`] is append-only: every successful load adds one
//! record, and only records in [`PluginState::Loaded`] are accepted. Loading
//! the same executable twice yields two entries, one per plugin instance.

use crate::error::LifecycleError;
use crate::lifecycle::{LoadedPlugin, PluginState};
use crate::protocol::PluginType;

/// Registry of loaded plugins.
///
/// # Example
///
/// ```
/// use pulse_control::{LoadedPlugin, PluginIdentity, PluginMeta, PluginRegistry, PluginType};
/// use time::OffsetDateTime;
///
/// let mut plugin = LoadedPlugin::detected("/opt/pulse/plugins/cpu");
/// let identity = PluginIdentity::new(PluginMeta::new("cpu", 1), PluginType::Collector, "");
/// plugin.mark_loaded(identity, OffsetDateTime::now_utc()).unwrap();
///
/// let mut registry = PluginRegistry::new();
/// registry.register(plugin).expect("loaded plugins are accepted");
/// assert_eq!(registry.find_by_name("cpu").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<LoadedPlugin>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Appends a loaded plugin.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotLoaded`] if the record has not reached
    /// [`PluginState::Loaded`].
    pub fn register(&mut self, plugin: LoadedPlugin) -> Result<(), LifecycleError> {
        if plugin.state() != PluginState::Loaded {
            return Err(LifecycleError::NotLoaded {
                state: plugin.state(),
            });
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Iterates over the registered plugins in load order.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedPlugin> {
        self.plugins.iter()
    }

    /// Returns every plugin that declared the given name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<&LoadedPlugin> {
        self.plugins
            .iter()
            .filter(|p| p.name() == Some(name))
            .collect()
    }

    /// Returns every plugin of the given type.
    #[must_use]
    pub fn find_by_type(&self, plugin_type: PluginType) -> Vec<&LoadedPlugin> {
        self.plugins
            .iter()
            .filter(|p| p.plugin_type() == Some(plugin_type))
            .collect()
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
