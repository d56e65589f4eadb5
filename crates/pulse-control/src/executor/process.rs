//! Linux plugin processes built on `std::process`.
//!
//! Each plugin runs in its own process group so termination also reaches any
//! helpers it forked; otherwise a grandchild holding the stdout pipe open
//! would keep the handshake reader blocked after the plugin itself exited.
//!
//! Exit is detected by polling `waitid` with `WNOWAIT`, which observes the
//! exit without reaping. The group is killed while the exited leader still
//! reserves the group id, and only then is the child reaped.

use std::fs;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::{EXECUTOR_TARGET, PendingProcess, ProcessExecutor, ProcessLauncher};
use crate::error::ExecutorError;
use crate::launch::LaunchRequest;
use crate::sync::lock;

/// Delay between exit checks while waiting for a plugin.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Launches plugins as child processes.
///
/// The plugin receives the encoded launch arguments as its only argument,
/// a closed stdin, a piped stdout, and a discarded stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl ProcessLauncher for CommandLauncher {
    type Process = PreparedCommand;

    fn prepare(&self, request: &LaunchRequest) -> Result<Self::Process, ExecutorError> {
        let path = request.path();
        let metadata = fs::metadata(path).map_err(|source| ExecutorError::ExecutableNotFound {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        if !metadata.is_file() {
            return Err(ExecutorError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let argument = request.args().to_json()?;
        let mut command = Command::new(path);
        command
            .arg(argument)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0);

        debug!(
            target: EXECUTOR_TARGET,
            path = %path.display(),
            "prepared plugin command"
        );
        Ok(PreparedCommand {
            path: path.to_path_buf(),
            command,
        })
    }
}

/// A plugin command ready to spawn.
#[derive(Debug)]
pub struct PreparedCommand {
    path: PathBuf,
    command: Command,
}

impl PendingProcess for PreparedCommand {
    type Executor = ChildExecutor;

    fn start(mut self) -> Result<Self::Executor, ExecutorError> {
        let spawn_error = |source: io::Error| ExecutorError::Spawn {
            path: self.path.clone(),
            source: Arc::new(source),
        };
        let mut child = self.command.spawn().map_err(spawn_error)?;
        let pid = child.id();
        // The child leads its own group, so its pid is the group id.
        let group = match i32::try_from(pid) {
            Ok(raw) => Pid::from_raw(raw),
            Err(_) => {
                discard_child(&mut child, pid);
                return Err(spawn_error(io::Error::other(format!(
                    "process id {pid} is out of range"
                ))));
            }
        };
        let stdout = child.stdout.take();

        debug!(
            target: EXECUTOR_TARGET,
            path = %self.path.display(),
            pid,
            "plugin process started"
        );
        Ok(ChildExecutor {
            pid,
            group,
            state: Mutex::new(ChildState {
                child,
                status: None,
            }),
            stdout: Mutex::new(stdout),
        })
    }
}

/// A running plugin process.
#[derive(Debug)]
pub struct ChildExecutor {
    pid: u32,
    group: Pid,
    state: Mutex<ChildState>,
    stdout: Mutex<Option<ChildStdout>>,
}

#[derive(Debug)]
struct ChildState {
    child: Child,
    status: Option<ExitStatus>,
}

impl ChildExecutor {
    /// Reaps the child if it has exited, killing the rest of its group first.
    fn poll_exit(&self, state: &mut ChildState) -> Result<Option<ExitStatus>, ExecutorError> {
        if let Some(status) = state.status {
            return Ok(Some(status));
        }

        let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
        match waitid(Id::Pid(self.group), flags) {
            Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => return Ok(None),
            Ok(_) => {}
            Err(errno) => {
                return Err(ExecutorError::Wait {
                    pid: self.pid,
                    source: Arc::new(io::Error::from(errno)),
                });
            }
        }

        if let Err(error) = kill_group(self.pid, self.group) {
            warn!(
                target: EXECUTOR_TARGET,
                pid = self.pid,
                %error,
                "failed to clean up plugin process group"
            );
        }
        let status = state.child.wait().map_err(|source| ExecutorError::Wait {
            pid: self.pid,
            source: Arc::new(source),
        })?;
        state.status = Some(status);
        Ok(Some(status))
    }
}

impl ProcessExecutor for ChildExecutor {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn terminate(&self) -> Result<(), ExecutorError> {
        // Holding the state lock keeps the leader unreaped while we signal.
        let state = lock(&self.state);
        if state.status.is_some() {
            return Ok(());
        }
        debug!(target: EXECUTOR_TARGET, pid = self.pid, "terminating plugin process");
        kill_group(self.pid, self.group)
    }

    fn await_exit(&self) -> Result<(), ExecutorError> {
        let status = loop {
            let polled = {
                let mut state = lock(&self.state);
                self.poll_exit(&mut state)?
            };
            if let Some(status) = polled {
                break status;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        };

        debug!(
            target: EXECUTOR_TARGET,
            pid = self.pid,
            ?status,
            "plugin process exited"
        );
        if status.success() {
            return Ok(());
        }
        Err(ExecutorError::Exited {
            pid: self.pid,
            code: status.code(),
        })
    }

    fn output_stream(&self) -> Result<Box<dyn Read + Send>, ExecutorError> {
        let stdout = lock(&self.stdout)
            .take()
            .ok_or(ExecutorError::StreamUnavailable)?;
        Ok(Box::new(stdout))
    }
}

impl Drop for ChildExecutor {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if state.status.is_some() {
            return;
        }
        if let Err(error) = kill_group(self.pid, self.group) {
            warn!(target: EXECUTOR_TARGET, pid = self.pid, %error, "failed to kill plugin on drop");
        }
        match state.child.wait() {
            Ok(status) => state.status = Some(status),
            Err(error) => {
                warn!(target: EXECUTOR_TARGET, pid = self.pid, %error, "failed to reap plugin on drop");
            }
        }
    }
}

/// Kills and reaps a child that never became an executor.
pub(super) fn discard_child(child: &mut Child, pid: u32) -> Option<ExitStatus> {
    if let Err(error) = child.kill() {
        warn!(target: EXECUTOR_TARGET, pid, %error, "failed to kill discarded plugin");
    }
    match child.wait() {
        Ok(status) => Some(status),
        Err(error) => {
            warn!(target: EXECUTOR_TARGET, pid, %error, "failed to reap discarded plugin");
            None
        }
    }
}

fn kill_group(pid: u32, group: Pid) -> Result<(), ExecutorError> {
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(ExecutorError::Terminate {
            pid,
            source: Arc::new(io::Error::from(errno)),
        }),
    }
}
