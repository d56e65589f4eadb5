//! Launcher for platforms without process-based plugin support.

use std::io::Read;

use super::{PendingProcess, ProcessExecutor, ProcessLauncher};
use crate::error::ExecutorError;
use crate::launch::LaunchRequest;

/// Launcher that rejects every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedLauncher;

impl ProcessLauncher for UnsupportedLauncher {
    type Process = UnsupportedProcess;

    fn prepare(&self, _request: &LaunchRequest) -> Result<Self::Process, ExecutorError> {
        Err(ExecutorError::UnsupportedPlatform {
            platform: std::env::consts::OS,
        })
    }
}

/// Uninhabited process type; [`UnsupportedLauncher`] never produces one.
#[derive(Debug)]
pub enum UnsupportedProcess {}

impl PendingProcess for UnsupportedProcess {
    type Executor = Self;

    fn start(self) -> Result<Self::Executor, ExecutorError> {
        match self {}
    }
}

impl ProcessExecutor for UnsupportedProcess {
    fn pid(&self) -> Option<u32> {
        match *self {}
    }

    fn terminate(&self) -> Result<(), ExecutorError> {
        match *self {}
    }

    fn await_exit(&self) -> Result<(), ExecutorError> {
        match *self {}
    }

    fn output_stream(&self) -> Result<Box<dyn Read + Send>, ExecutorError> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::launch::LaunchArgs;

    #[test]
    fn every_request_is_rejected() {
        let request = LaunchRequest::new(
            "/opt/pulse/plugins/cpu",
            LaunchArgs::new(None, Utf8PathBuf::from("/tmp"), false),
        );
        let err = UnsupportedLauncher
            .prepare(&request)
            .expect_err("unsupported platform");
        assert!(matches!(err, ExecutorError::UnsupportedPlatform { .. }));
    }
}
