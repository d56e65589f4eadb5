//! In-memory launcher and executor doubles backed by anonymous pipes.

use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::error::ExecutorError;
use crate::executor::{PendingProcess, ProcessExecutor, ProcessLauncher};
use crate::launch::LaunchRequest;
use crate::sync::lock;

/// Process identifier reported by every fake executor.
pub(crate) const FAKE_PID: u32 = 4242;

/// How a fake process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeExit {
    /// Exits by itself with the given status once its output is written.
    Code(i32),
    /// Exits by itself but a leftover helper keeps the output pipe open
    /// until the process is terminated.
    CodeHoldingOutput(i32),
    /// Exits by itself but a helper outside its process group keeps the
    /// output pipe open until the executor is dropped.
    CodeWithStrayOutput(i32),
    /// Runs until terminated, then reports death by signal.
    Hang,
}

/// Executor whose output is a pre-filled pipe.
pub(crate) struct FakeExecutor {
    exit: FakeExit,
    output: Mutex<Option<PipeReader>>,
    writer: Mutex<Option<PipeWriter>>,
    _stray_writer: Option<PipeWriter>,
    terminated: Mutex<bool>,
    terminated_changed: Condvar,
    terminate_calls: AtomicUsize,
}

impl FakeExecutor {
    pub(crate) fn new(output: &str, exit: FakeExit) -> Self {
        let (reader, mut writer) = io::pipe().expect("create pipe");
        writer
            .write_all(output.as_bytes())
            .expect("write fake output");
        let (held_writer, stray_writer) = match exit {
            FakeExit::Code(_) => (None, None),
            FakeExit::CodeHoldingOutput(_) | FakeExit::Hang => (Some(writer), None),
            FakeExit::CodeWithStrayOutput(_) => (None, Some(writer)),
        };
        Self {
            exit,
            output: Mutex::new(Some(reader)),
            writer: Mutex::new(held_writer),
            _stray_writer: stray_writer,
            terminated: Mutex::new(false),
            terminated_changed: Condvar::new(),
            terminate_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn terminate_calls(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        *lock(&self.terminated)
    }
}

impl ProcessExecutor for FakeExecutor {
    fn pid(&self) -> Option<u32> {
        Some(FAKE_PID)
    }

    fn terminate(&self) -> Result<(), ExecutorError> {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        drop(lock(&self.writer).take());
        *lock(&self.terminated) = true;
        self.terminated_changed.notify_all();
        Ok(())
    }

    fn await_exit(&self) -> Result<(), ExecutorError> {
        let code = match self.exit {
            FakeExit::Code(code)
            | FakeExit::CodeHoldingOutput(code)
            | FakeExit::CodeWithStrayOutput(code) => Some(code),
            FakeExit::Hang => {
                let mut terminated = lock(&self.terminated);
                while !*terminated {
                    terminated = self
                        .terminated_changed
                        .wait(terminated)
                        .expect("terminated flag poisoned");
                }
                None
            }
        };
        match code {
            Some(0) => Ok(()),
            code => Err(ExecutorError::Exited {
                pid: FAKE_PID,
                code,
            }),
        }
    }

    fn output_stream(&self) -> Result<Box<dyn Read + Send>, ExecutorError> {
        let reader = lock(&self.output)
            .take()
            .ok_or(ExecutorError::StreamUnavailable)?;
        Ok(Box::new(reader))
    }
}

/// What a [`FakeLauncher`] does with each request.
#[derive(Debug, Clone)]
pub(crate) enum FakePlan {
    /// Starts a [`FakeExecutor`] with this output and exit.
    Run { output: String, exit: FakeExit },
    /// Fails in `prepare`.
    RejectPrepare,
    /// Prepares fine but fails in `start`.
    RejectStart,
}

impl FakePlan {
    pub(crate) fn run(output: impl Into<String>, exit: FakeExit) -> Self {
        Self::Run {
            output: output.into(),
            exit,
        }
    }
}

/// Launcher that records requests and hands out fake processes.
pub(crate) struct FakeLauncher {
    plan: FakePlan,
    requests: Mutex<Vec<LaunchRequest>>,
    executors: Mutex<Vec<Arc<FakeExecutor>>>,
}

impl FakeLauncher {
    pub(crate) fn new(plan: FakePlan) -> Self {
        Self {
            plan,
            requests: Mutex::new(Vec::new()),
            executors: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen by `prepare`, in order.
    pub(crate) fn requests(&self) -> Vec<LaunchRequest> {
        lock(&self.requests).clone()
    }

    /// Executors created by `prepare`, in order.
    pub(crate) fn executors(&self) -> Vec<Arc<FakeExecutor>> {
        lock(&self.executors).clone()
    }
}

impl ProcessLauncher for FakeLauncher {
    type Process = FakePending;

    fn prepare(&self, request: &LaunchRequest) -> Result<Self::Process, ExecutorError> {
        lock(&self.requests).push(request.clone());
        let path = request.path().to_path_buf();
        match &self.plan {
            FakePlan::RejectPrepare => Err(ExecutorError::NotAFile { path }),
            FakePlan::RejectStart => Ok(FakePending::Refuse(path)),
            FakePlan::Run { output, exit } => {
                let executor = Arc::new(FakeExecutor::new(output, *exit));
                lock(&self.executors).push(Arc::clone(&executor));
                Ok(FakePending::Ready(SharedExecutor(executor)))
            }
        }
    }
}

/// A fake process awaiting `start`.
pub(crate) enum FakePending {
    Ready(SharedExecutor),
    Refuse(PathBuf),
}

impl PendingProcess for FakePending {
    type Executor = SharedExecutor;

    fn start(self) -> Result<Self::Executor, ExecutorError> {
        match self {
            Self::Ready(executor) => Ok(executor),
            Self::Refuse(path) => Err(ExecutorError::Spawn {
                path,
                source: Arc::new(io::Error::from(io::ErrorKind::PermissionDenied)),
            }),
        }
    }
}

/// Executor handle shared between the controller and the test.
pub(crate) struct SharedExecutor(Arc<FakeExecutor>);

impl ProcessExecutor for SharedExecutor {
    fn pid(&self) -> Option<u32> {
        self.0.pid()
    }

    fn terminate(&self) -> Result<(), ExecutorError> {
        self.0.terminate()
    }

    fn await_exit(&self) -> Result<(), ExecutorError> {
        self.0.await_exit()
    }

    fn output_stream(&self) -> Result<Box<dyn Read + Send>, ExecutorError> {
        self.0.output_stream()
    }
}
