//! Default values applied when a configuration field is omitted.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Time a plugin is given to answer the handshake, in milliseconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 3_000;

/// Directory handed to plugins for their own log files.
pub const DEFAULT_PLUGIN_LOG_PATH: &str = "/tmp";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default handshake timeout in milliseconds.
#[must_use]
pub const fn default_handshake_timeout_ms() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_MS
}

/// Default plugin log directory.
#[must_use]
pub fn default_plugin_log_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PLUGIN_LOG_PATH)
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
