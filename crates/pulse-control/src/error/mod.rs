//! Domain errors raised while launching and handshaking with plugins.
//!
//! Each layer has its own `thiserror` enum so callers can match on the exact
//! failure: [`ExecutorError`] for the process layer, [`HandshakeError`] for
//! the handshake protocol, [`LifecycleError`] for state transitions, and
//! [`ControlError`] for everything surfaced by
//! [`PluginController::load`](crate::controller::PluginController::load).
//! I/O errors are wrapped in `Arc` to keep the enums cheap to move between
//! threads.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::PluginState;

/// Errors raised by process launchers and executors.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The plugin executable could not be inspected.
    #[error("plugin executable {path} is not accessible: {source}")]
    ExecutableNotFound {
        /// Path that was checked.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin path exists but is not a regular file.
    #[error("plugin path {path} is not a regular file")]
    NotAFile {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The launch arguments could not be encoded for the plugin.
    #[error("failed to serialise plugin launch arguments: {0}")]
    SerializeArgs(#[source] serde_json::Error),

    /// The operating system refused to spawn the process.
    #[error("failed to spawn plugin process {path}: {source}")]
    Spawn {
        /// Executable that was spawned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Process-based plugins are not supported on this platform.
    #[error("process-based plugins are not supported on {platform}")]
    UnsupportedPlatform {
        /// Name of the current operating system.
        platform: &'static str,
    },

    /// The process output stream has already been handed out.
    #[error("plugin output stream is no longer available")]
    StreamUnavailable,

    /// The process could not be signalled.
    #[error("failed to terminate plugin process {pid}: {source}")]
    Terminate {
        /// Process identifier.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Waiting for the process failed.
    #[error("failed to wait for plugin process {pid}: {source}")]
    Wait {
        /// Process identifier.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The process exited unsuccessfully.
    #[error("plugin process {pid} {}", describe_exit(.code))]
    Exited {
        /// Process identifier.
        pid: u32,
        /// Exit code, or `None` when the process was killed by a signal.
        code: Option<i32>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => String::from("was terminated by a signal"),
    }
}

/// Errors produced by the handshake protocol.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// No complete handshake arrived before the deadline; the process was
    /// terminated.
    #[error("timed out after {timeout_ms}ms waiting for a handshake response")]
    Timeout {
        /// Configured handshake timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The first line written by the plugin was not a valid response.
    #[error("malformed handshake response: {message}")]
    MalformedResponse {
        /// Human-readable description of the parse failure.
        message: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Reading the plugin output stream failed.
    #[error("failed to read plugin output: {source}")]
    Stream {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The process ended without leaving a usable handshake.
    #[error("{message}")]
    ProcessExit {
        /// Description of how the process ended.
        message: String,
        /// Exit failure reported by the executor, if any.
        #[source]
        source: Option<ExecutorError>,
    },

    /// The executor could not provide the plugin output stream.
    #[error("plugin output stream unavailable: {source}")]
    OutputUnavailable {
        /// Underlying executor error.
        #[source]
        source: ExecutorError,
    },
}

/// Errors raised by invalid lifecycle transitions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// The requested transition is not allowed from the current state.
    #[error("plugin cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: PluginState,
        /// Requested state.
        to: PluginState,
    },

    /// Only loaded plugins may enter the registry.
    #[error("only loaded plugins can be registered (state was {state})")]
    NotLoaded {
        /// State of the rejected record.
        state: PluginState,
    },
}

/// Errors returned by the plugin controller.
#[derive(Debug, Error)]
pub enum ControlError {
    /// `load` was called before `start`.
    #[error("plugin control must be started before loading plugins")]
    NotStarted,

    /// The plugin process could not be prepared.
    #[error("failed to launch plugin {path}: {source}")]
    Launch {
        /// Plugin executable.
        path: PathBuf,
        /// Underlying executor error.
        #[source]
        source: ExecutorError,
    },

    /// The plugin process could not be started.
    #[error("failed to start plugin {path}: {source}")]
    Start {
        /// Plugin executable.
        path: PathBuf,
        /// Underlying executor error.
        #[source]
        source: ExecutorError,
    },

    /// The handshake did not complete.
    #[error("handshake with plugin {path} failed: {source}")]
    Handshake {
        /// Plugin executable.
        path: PathBuf,
        /// Handshake failure.
        #[source]
        source: HandshakeError,
    },

    /// The plugin answered the handshake with a failure.
    #[error("plugin {path} did not load successfully: {message}")]
    HandshakeRejected {
        /// Plugin executable.
        path: PathBuf,
        /// Message supplied by the plugin.
        message: String,
    },

    /// The configured trust scheme cannot verify session tokens yet.
    #[error("trust scheme '{scheme}' is not supported yet")]
    TrustUnsupported {
        /// Name of the configured scheme.
        scheme: &'static str,
    },

    /// A lifecycle transition was rejected.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ControlError {
    /// Returns the handshake failure wrapped by this error, if any.
    #[must_use]
    pub const fn handshake_error(&self) -> Option<&HandshakeError> {
        match self {
            Self::Handshake { source, .. } => Some(source),
            _ => None,
        }
    }
}
