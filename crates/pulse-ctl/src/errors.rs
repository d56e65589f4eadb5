//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use pulse_config::ConfigError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("failed to load configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to format plugin load time: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("failed to serialise plugin summary: {0}")]
    SerialisePlugin(#[from] serde_json::Error),
    #[error("failed to write plugin summary: {0}")]
    EmitPlugin(#[from] io::Error),
    #[error("{failed} of {total} plugin(s) failed to load")]
    LoadFailures { failed: usize, total: usize },
}
