//! Command-line front end for the Pulse plugin controller.
//!
//! `pulse-ctl load <PLUGIN>...` starts a controller, loads each executable in
//! order, and prints one JSON line per plugin that completes its handshake.
//! Failures are reported on standard error and turn the exit status into a
//! failure once every plugin has been attempted.

mod cli;
mod config;
mod errors;
mod output;
pub mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pulse_config::ControlConfig;
use pulse_control::{ControllerSettings, PluginController, ProcessLauncher, platform_launcher};
use tracing::{info, warn};

use crate::cli::{Cli, CliCommand};
use crate::config::{ConfigLoader, OrthoConfigLoader, split_arguments};
use crate::errors::AppError;
use crate::output::PluginSummary;

const CLI_TARGET: &str = "pulse_ctl";

/// Runs the CLI against the supplied arguments and output streams.
///
/// Leading configuration flags are layered over `PULSE_*` environment
/// variables, the configuration file, and the defaults. Help and version
/// requests are written to `stdout` and succeed. Every other failure is
/// written to `stderr` and yields [`ExitCode::FAILURE`].
pub fn run<I, T, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, T, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let split = split_arguments(&args);
    let cli = match Cli::try_parse_from(&split.command) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(stderr, "{}", AppError::CliUsage(error));
            return ExitCode::FAILURE;
        }
    };

    let outcome = loader
        .load(&split.config)
        .and_then(|config| execute(&cli, &config, stdout, stderr));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "pulse-ctl: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write, E: Write>(
    cli: &Cli,
    config: &ControlConfig,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), AppError> {
    let _telemetry = telemetry::initialise(config)?;

    match &cli.command {
        CliCommand::Load { plugins } => {
            let controller =
                PluginController::new(platform_launcher(), ControllerSettings::from(config));
            controller.start();
            let outcome = load_all(&controller, plugins, stdout, stderr);
            controller.stop();
            outcome
        }
    }
}

fn load_all<L, W, E>(
    controller: &PluginController<L>,
    plugins: &[PathBuf],
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), AppError>
where
    L: ProcessLauncher,
    W: Write,
    E: Write,
{
    let mut failed = 0_usize;
    for path in plugins {
        match controller.load(path) {
            Ok(plugin) => PluginSummary::from_plugin(&plugin)?.emit(stdout)?,
            Err(error) => {
                failed += 1;
                let _ = writeln!(stderr, "pulse-ctl: {}: {error}", path.display());
            }
        }
    }

    info!(
        target: CLI_TARGET,
        loaded = controller.loaded_count(),
        failed,
        "load run finished"
    );
    if failed == 0 {
        return Ok(());
    }
    warn!(target: CLI_TARGET, failed, total = plugins.len(), "some plugins failed to load");
    Err(AppError::LoadFailures {
        failed,
        total: plugins.len(),
    })
}
