//! Process-wide tracing setup for `pulse-ctl`.
//!
//! Events go to standard error so that standard output carries only the
//! JSON plugin summaries.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use pulse_config::{ControlConfig, LogFormat};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Format chosen by the first successful installation.
static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Returns the format the installed subscriber renders with.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Reasons the subscriber could not be installed.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid `EnvFilter` directive list.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// The rejected directive list.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Some other subscriber was already registered globally.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber described by `config`.
///
/// Only the first successful call has an effect; later calls hand back the
/// handle of the subscriber already installed, whatever their `config`
/// says.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an invalid filter and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already
/// registered.
///
/// # Examples
///
/// ```rust
/// use pulse_config::{ControlConfig, LogFormat};
/// use pulse_ctl::telemetry;
///
/// # fn main() -> Result<(), pulse_ctl::telemetry::TelemetryError> {
/// let handle = telemetry::initialise(&ControlConfig::default())?;
/// assert_eq!(handle.format(), LogFormat::Json);
///
/// let compact = ControlConfig {
///     log_format: LogFormat::Compact,
///     ..ControlConfig::default()
/// };
/// assert_eq!(telemetry::initialise(&compact)?.format(), LogFormat::Json);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &ControlConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install(config))
        .map(|format| TelemetryHandle { format: *format })
}

fn parse_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter {
        filter: filter.to_owned(),
        message: error.to_string(),
    })
}

fn install(config: &ControlConfig) -> Result<LogFormat, TelemetryError> {
    let env_filter = parse_filter(config.log_filter())?;
    let format = config.log_format();
    let base = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(format.allows_ansi() && io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(base.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(base.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(format)
}
