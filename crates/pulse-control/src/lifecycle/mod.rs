//! Plugin lifecycle states and the [`LoadedPlugin`] record.
//!
//! A record is created in [`PluginState::Detected`] the moment a load
//! attempt begins and only reaches [`PluginState::Loaded`] after a
//! successful handshake. There is no failed state: a record whose load
//! fails is dropped rather than transitioned.
//!
//! ```text
//! Detected ──▶ Loading ──▶ Loaded ──▶ Unloaded
//!     └──────────────────────▲
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::LifecycleError;
use crate::protocol::{PluginIdentity, PluginMeta, PluginType};

/// States a plugin passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// A load attempt has begun.
    Detected,
    /// The process is running but has not answered the handshake yet.
    Loading,
    /// The handshake succeeded.
    Loaded,
    /// The plugin has been removed from service.
    Unloaded,
}

impl PluginState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Unloaded => "unloaded",
        }
    }

    /// Returns whether the state machine allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Detected, Self::Loading | Self::Loaded)
                | (Self::Loading, Self::Loaded)
                | (Self::Loaded, Self::Unloaded)
        )
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plugin loaded, or being loaded, into the controller.
///
/// Identity fields are empty until the record reaches
/// [`PluginState::Loaded`].
///
/// # Example
///
/// ```
/// use pulse_control::{LoadedPlugin, PluginIdentity, PluginMeta, PluginState, PluginType};
/// use time::OffsetDateTime;
///
/// let mut plugin = LoadedPlugin::detected("/opt/pulse/plugins/cpu");
/// assert_eq!(plugin.state(), PluginState::Detected);
///
/// let identity = PluginIdentity::new(PluginMeta::new("cpu", 1), PluginType::Collector, "tok");
/// plugin.mark_loaded(identity, OffsetDateTime::now_utc()).unwrap();
/// assert_eq!(plugin.state(), PluginState::Loaded);
/// assert_eq!(plugin.name(), Some("cpu"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlugin {
    path: PathBuf,
    state: PluginState,
    identity: Option<PluginIdentity>,
    loaded_time: Option<OffsetDateTime>,
}

impl LoadedPlugin {
    /// Creates a record for a load attempt that has just begun.
    #[must_use]
    pub fn detected(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: PluginState::Detected,
            identity: None,
            loaded_time: None,
        }
    }

    /// Marks the process as started but not yet handshaken.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the record is
    /// [`PluginState::Detected`].
    pub const fn mark_loading(&mut self) -> Result<(), LifecycleError> {
        self.transition(PluginState::Loading)
    }

    /// Records a successful handshake.
    ///
    /// Stores the identity declared by the plugin and stamps the load time.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the record is
    /// [`PluginState::Detected`] or [`PluginState::Loading`].
    pub fn mark_loaded(
        &mut self,
        identity: PluginIdentity,
        loaded_time: OffsetDateTime,
    ) -> Result<(), LifecycleError> {
        self.transition(PluginState::Loaded)?;
        self.identity = Some(identity);
        self.loaded_time = Some(loaded_time);
        Ok(())
    }

    /// Takes a loaded plugin out of service.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the record is
    /// [`PluginState::Loaded`].
    pub const fn mark_unloaded(&mut self) -> Result<(), LifecycleError> {
        self.transition(PluginState::Unloaded)
    }

    const fn transition(&mut self, next: PluginState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Returns the executable path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PluginState {
        self.state
    }

    /// Returns the metadata declared during the handshake.
    #[must_use]
    pub fn meta(&self) -> Option<&PluginMeta> {
        self.identity.as_ref().map(PluginIdentity::meta)
    }

    /// Returns the plugin name declared during the handshake.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.meta().map(PluginMeta::name)
    }

    /// Returns the plugin type declared during the handshake.
    #[must_use]
    pub fn plugin_type(&self) -> Option<PluginType> {
        self.identity.as_ref().map(PluginIdentity::plugin_type)
    }

    /// Returns the session token issued during the handshake.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(PluginIdentity::token)
    }

    /// Returns when the plugin reached [`PluginState::Loaded`].
    #[must_use]
    pub const fn loaded_time(&self) -> Option<OffsetDateTime> {
        self.loaded_time
    }
}
