//! CLI entrypoint for the Pulse plugin controller.
//!
//! The binary delegates to [`pulse_ctl::run`], which resolves configuration,
//! installs telemetry, and loads each requested plugin in turn.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    pulse_ctl::run(std::env::args_os(), &mut stdout, &mut stderr)
}
