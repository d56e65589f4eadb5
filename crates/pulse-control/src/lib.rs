//! Plugin control for the Pulse collection framework.
//!
//! `pulse-control` launches untrusted plugin binaries as child processes,
//! performs a bounded-time handshake with each one, and records the plugins
//! that loaded. It is the trust boundary between the controller and
//! independently built plugins.
//!
//! # Architecture
//!
//! - [`executor`] wraps one child process behind the [`ProcessExecutor`]
//!   capability trait and provides the platform launcher.
//! - [`handshake`] races a timeout watcher, a response reader, and process
//!   exit to produce exactly one [`HandshakeResponse`] or
//!   [`HandshakeError`].
//! - [`lifecycle`] holds the [`PluginState`] machine and the
//!   [`LoadedPlugin`] record.
//! - [`registry`] keeps the loaded plugins.
//! - [`controller`] ties the pieces together behind
//!   [`PluginController::load`].
//!
//! A plugin is invoked with its [`LaunchArgs`] as a single JSON argument and
//! answers with one JSON line on standard output:
//!
//! ```text
//! $ /opt/pulse/plugins/cpu '{"control_pub_key":null,"plugin_log_path":"/tmp","run_as_daemon":false}'
//! {"state":"success","meta":{"name":"cpu","version":1},"type":"collector","token":"abc"}
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulse_control::{ControllerSettings, PluginController, PluginType, platform_launcher};
//!
//! let controller = PluginController::new(platform_launcher(), ControllerSettings::default());
//! controller.start();
//! controller.load("/opt/pulse/plugins/cpu")?;
//! assert_eq!(controller.find_by_type(PluginType::Collector).len(), 1);
//! # Ok::<(), pulse_control::ControlError>(())
//! ```

pub mod controller;
pub mod error;
pub mod executor;
pub mod handshake;
pub mod launch;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod trust;

mod sync;

#[cfg(test)]
mod tests;

pub use self::controller::{ControllerSettings, PluginController};
pub use self::error::{ControlError, ExecutorError, HandshakeError, LifecycleError};
pub use self::executor::{
    PendingProcess, PlatformLauncher, ProcessExecutor, ProcessLauncher, platform_launcher,
};
pub use self::handshake::wait_for_response;
pub use self::launch::{LaunchArgs, LaunchRequest};
pub use self::lifecycle::{LoadedPlugin, PluginState};
pub use self::protocol::{
    HandshakeFailure, HandshakeResponse, PluginIdentity, PluginMeta, PluginType,
};
pub use self::registry::PluginRegistry;
pub use self::trust::TrustScheme;
