//! Shared configuration for the Pulse plugin control plane.
//!
//! [`ControlConfig`] gathers the knobs the controller and its binaries need:
//! how long a plugin may take to answer the handshake, which directory the
//! plugin should log into, and how the controller's own telemetry is filtered
//! and formatted.
//!
//! Values are layered by `ortho_config`: defaults first, then a TOML file
//! named by `--config-path` or `PULSE_CONFIG_PATH`, then `PULSE_*`
//! environment variables, then command-line flags. Every field has a
//! default, so loading with no sources yields [`ControlConfig::default`]:
//!
//! ```
//! use ortho_config::OrthoConfig;
//! use pulse_config::{ControlConfig, LogFormat};
//!
//! let config = ControlConfig::load_from_iter(["pulse-ctl", "--handshake-timeout-ms", "250"])
//!     .expect("flags parse");
//! assert_eq!(config.handshake_timeout_ms, 250);
//! assert_eq!(config.log_format(), LogFormat::Json);
//! ```

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_PLUGIN_LOG_PATH,
    default_handshake_timeout_ms, default_log_filter, default_log_filter_string,
    default_log_format, default_plugin_log_path,
};
pub use logging::LogFormat;

/// Resolved configuration for the plugin controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "PULSE")]
pub struct ControlConfig {
    /// Handshake budget granted to each plugin, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Directory passed to plugins for their own logs.
    pub plugin_log_path: Utf8PathBuf,
    /// `tracing` filter expression for the controller's own logs.
    pub log_filter: String,
    /// Output format for the controller's own logs.
    pub log_format: LogFormat,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            plugin_log_path: default_plugin_log_path(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl ControlConfig {
    /// Checks values that deserialise cleanly but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero handshake timeout or an
    /// empty log filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                message: String::from("handshake_timeout_ms must be greater than zero"),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: String::from("log_filter must not be empty"),
            });
        }
        Ok(())
    }

    /// Handshake budget as a [`Duration`].
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Directory passed to plugins for their own logs.
    #[must_use]
    pub fn plugin_log_path(&self) -> &Utf8Path {
        self.plugin_log_path.as_path()
    }

    /// Filter expression for the controller's own logs.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the controller's own logs.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Errors raised when a loaded configuration cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value parsed but failed validation.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the rejected value.
        message: String,
    },
}
