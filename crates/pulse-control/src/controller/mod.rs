//! The plugin controller.
//!
//! [`PluginController`] drives one load at a time: it prepares and starts the
//! plugin process through a [`ProcessLauncher`], runs the handshake, checks
//! the issued token against the configured [`TrustScheme`], and records the
//! plugin in its [`PluginRegistry`]. Any failure leaves the registry
//! untouched and the plugin process terminated.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use pulse_config::{ControlConfig, DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_PLUGIN_LOG_PATH};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::ControlError;
use crate::executor::{PendingProcess, ProcessExecutor, ProcessLauncher};
use crate::handshake::wait_for_response;
use crate::launch::{LaunchArgs, LaunchRequest};
use crate::lifecycle::LoadedPlugin;
use crate::protocol::{HandshakeResponse, PluginType};
use crate::registry::PluginRegistry;
use crate::sync::lock;
use crate::trust::TrustScheme;

/// Tracing target for controller operations.
const CONTROLLER_TARGET: &str = "pulse_control::controller";

/// Settings applied to every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    handshake_timeout: Duration,
    plugin_log_path: Utf8PathBuf,
    trust: TrustScheme,
}

impl ControllerSettings {
    /// Creates settings with the unauthenticated trust scheme.
    #[must_use]
    pub const fn new(handshake_timeout: Duration, plugin_log_path: Utf8PathBuf) -> Self {
        Self {
            handshake_timeout,
            plugin_log_path,
            trust: TrustScheme::Unauthenticated,
        }
    }

    /// Replaces the trust scheme.
    #[must_use]
    pub fn with_trust(mut self, trust: TrustScheme) -> Self {
        self.trust = trust;
        self
    }

    /// Returns how long a plugin may take to answer the handshake.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Returns the directory plugins are told to log into.
    #[must_use]
    pub fn plugin_log_path(&self) -> &Utf8Path {
        self.plugin_log_path.as_path()
    }

    /// Returns the trust scheme.
    #[must_use]
    pub const fn trust(&self) -> &TrustScheme {
        &self.trust
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            Utf8PathBuf::from(DEFAULT_PLUGIN_LOG_PATH),
        )
    }
}

impl From<&ControlConfig> for ControllerSettings {
    fn from(config: &ControlConfig) -> Self {
        Self::new(
            config.handshake_timeout(),
            config.plugin_log_path().to_path_buf(),
        )
    }
}

/// Loads plugins and keeps track of the ones that loaded.
///
/// The controller must be [started](Self::start) before it accepts loads.
/// Loads are handled one at a time; the controller is `Sync`, so it can be
/// shared by reference and concurrent callers simply queue.
///
/// # Example
///
/// ```no_run
/// use pulse_control::{ControllerSettings, PluginController, platform_launcher};
///
/// let controller = PluginController::new(platform_launcher(), ControllerSettings::default());
/// controller.start();
/// let plugin = controller.load("/opt/pulse/plugins/cpu")?;
/// println!("loaded {:?}", plugin.name());
/// # Ok::<(), pulse_control::ControlError>(())
/// ```
#[derive(Debug)]
pub struct PluginController<L> {
    launcher: L,
    settings: ControllerSettings,
    started: AtomicBool,
    load_lock: Mutex<()>,
    registry: Mutex<PluginRegistry>,
}

impl<L> PluginController<L> {
    /// Creates a stopped controller with an empty registry.
    #[must_use]
    pub const fn new(launcher: L, settings: ControllerSettings) -> Self {
        Self {
            launcher,
            settings,
            started: AtomicBool::new(false),
            load_lock: Mutex::new(()),
            registry: Mutex::new(PluginRegistry::new()),
        }
    }

    /// Starts accepting load requests. Starting twice has no further effect.
    pub fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            info!(target: CONTROLLER_TARGET, "plugin control started");
        }
    }

    /// Stops accepting load requests. Loaded plugins stay registered.
    pub fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            info!(target: CONTROLLER_TARGET, "plugin control stopped");
        }
    }

    /// Returns whether load requests are accepted.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Returns the settings applied to every load.
    #[must_use]
    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Returns the launcher used to start plugins.
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Builds the arguments handed to a plugin on its command line.
    #[must_use]
    pub fn generate_args(&self, run_as_daemon: bool) -> LaunchArgs {
        LaunchArgs::new(
            self.settings.trust.control_public_key().map(str::to_owned),
            self.settings.plugin_log_path.clone(),
            run_as_daemon,
        )
    }

    /// Returns copies of every loaded plugin, in load order.
    #[must_use]
    pub fn loaded_plugins(&self) -> Vec<LoadedPlugin> {
        lock(&self.registry).iter().cloned().collect()
    }

    /// Returns how many plugins are loaded.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Returns copies of the loaded plugins declaring `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<LoadedPlugin> {
        lock(&self.registry)
            .find_by_name(name)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns copies of the loaded plugins of `plugin_type`.
    #[must_use]
    pub fn find_by_type(&self, plugin_type: PluginType) -> Vec<LoadedPlugin> {
        lock(&self.registry)
            .find_by_type(plugin_type)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl<L: ProcessLauncher> PluginController<L> {
    /// Launches the plugin at `path`, performs the handshake, and registers
    /// the plugin on success.
    ///
    /// Returns a copy of the registered record. On failure nothing is
    /// registered and the plugin process is not left running.
    ///
    /// # Errors
    ///
    /// - [`ControlError::NotStarted`] before [`start`](Self::start); nothing
    ///   is launched.
    /// - [`ControlError::Launch`] and [`ControlError::Start`] when the
    ///   process cannot be prepared or spawned.
    /// - [`ControlError::Handshake`] when the handshake times out, is
    ///   malformed, or the process exits without a usable response.
    /// - [`ControlError::HandshakeRejected`] when the plugin reports failure.
    /// - [`ControlError::TrustUnsupported`] when the trust scheme cannot
    ///   verify the issued token.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedPlugin, ControlError> {
        if !self.is_started() {
            return Err(ControlError::NotStarted);
        }

        let plugin_path = path.as_ref();
        let _serialised = lock(&self.load_lock);
        info!(target: CONTROLLER_TARGET, path = %plugin_path.display(), "loading plugin");
        self.load_serialised(plugin_path).inspect_err(|error| {
            warn!(
                target: CONTROLLER_TARGET,
                path = %plugin_path.display(),
                %error,
                "plugin failed to load"
            );
        })
    }

    fn load_serialised(&self, path: &Path) -> Result<LoadedPlugin, ControlError> {
        let mut plugin = LoadedPlugin::detected(path);
        let request = LaunchRequest::new(path, self.generate_args(false));

        let pending = self
            .launcher
            .prepare(&request)
            .map_err(|source| ControlError::Launch {
                path: path.to_path_buf(),
                source,
            })?;
        let executor = pending.start().map_err(|source| ControlError::Start {
            path: path.to_path_buf(),
            source,
        })?;
        plugin.mark_loading()?;
        debug!(
            target: CONTROLLER_TARGET,
            path = %path.display(),
            pid = ?executor.pid(),
            state = %plugin.state(),
            "awaiting plugin handshake"
        );

        let response = wait_for_response(&executor, self.settings.handshake_timeout).map_err(
            |source| ControlError::Handshake {
                path: path.to_path_buf(),
                source,
            },
        )?;
        let identity = match response {
            HandshakeResponse::Success(identity) => identity,
            HandshakeResponse::Failure(failure) => {
                return Err(ControlError::HandshakeRejected {
                    path: path.to_path_buf(),
                    message: failure.error_message().to_owned(),
                });
            }
        };
        self.settings.trust.verify_token(identity.token())?;

        plugin.mark_loaded(identity, OffsetDateTime::now_utc())?;
        lock(&self.registry).register(plugin.clone())?;
        info!(
            target: CONTROLLER_TARGET,
            path = %path.display(),
            name = plugin.name().unwrap_or_default(),
            plugin_type = plugin.plugin_type().map(PluginType::as_str).unwrap_or_default(),
            "plugin loaded"
        );
        Ok(plugin)
    }
}
