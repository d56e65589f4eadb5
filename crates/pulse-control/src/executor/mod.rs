//! Process-launch abstraction for plugin binaries.
//!
//! Launching is split into two steps so callers can tell a plugin that could
//! not be prepared from one that could not be started:
//!
//! 1. [`ProcessLauncher::prepare`] validates the request and builds the
//!    command, yielding a [`PendingProcess`].
//! 2. [`PendingProcess::start`] spawns it, yielding a running
//!    [`ProcessExecutor`].
//!
//! The executor is a capability interface over one child process:
//! termination, blocking wait-for-exit, and the readable output stream. It
//! knows nothing about plugins. The launcher for the current platform is
//! selected at construction time through [`platform_launcher`].

use std::io::Read;

use crate::error::ExecutorError;
use crate::launch::LaunchRequest;

#[cfg(target_os = "linux")]
mod process;
mod unsupported;

#[cfg(target_os = "linux")]
pub use self::process::{ChildExecutor, CommandLauncher, PreparedCommand};
pub use self::unsupported::{UnsupportedLauncher, UnsupportedProcess};

/// Tracing target for process operations.
pub(crate) const EXECUTOR_TARGET: &str = "pulse_control::executor";

/// A running child process.
///
/// All methods take `&self` so the handshake can terminate the process from
/// one thread while another blocks in [`ProcessExecutor::await_exit`].
pub trait ProcessExecutor: Send + Sync {
    /// Operating-system process identifier, when there is one.
    fn pid(&self) -> Option<u32>;

    /// Requests that the process stop.
    ///
    /// Idempotent: terminating a process that already exited succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Terminate`] if the process cannot be
    /// signalled.
    fn terminate(&self) -> Result<(), ExecutorError>;

    /// Blocks until the process exits.
    ///
    /// Repeated calls report the same outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Exited`] when the process ends unsuccessfully
    /// and [`ExecutorError::Wait`] when waiting itself fails.
    fn await_exit(&self) -> Result<(), ExecutorError>;

    /// Hands out the process's standard output.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::StreamUnavailable`] if the stream was already
    /// taken.
    fn output_stream(&self) -> Result<Box<dyn Read + Send>, ExecutorError>;
}

/// A prepared process that has not been started.
pub trait PendingProcess {
    /// Executor produced once the process runs.
    type Executor: ProcessExecutor;

    /// Spawns the process.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Spawn`] if the operating system refuses to
    /// run it.
    fn start(self) -> Result<Self::Executor, ExecutorError>;
}

/// Builds plugin processes for one platform.
pub trait ProcessLauncher {
    /// Prepared process type.
    type Process: PendingProcess;

    /// Validates the request and builds the process without starting it.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutorError`] when the executable is missing, is not a
    /// regular file, the arguments cannot be encoded, or the platform cannot
    /// run plugin processes.
    fn prepare(&self, request: &LaunchRequest) -> Result<Self::Process, ExecutorError>;
}

/// Launcher for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformLauncher = CommandLauncher;

/// Launcher for the current platform.
#[cfg(not(target_os = "linux"))]
pub type PlatformLauncher = UnsupportedLauncher;

/// Returns the launcher for the current platform.
#[must_use]
pub const fn platform_launcher() -> PlatformLauncher {
    #[cfg(target_os = "linux")]
    {
        CommandLauncher
    }
    #[cfg(not(target_os = "linux"))]
    {
        UnsupportedLauncher
    }
}
