//! Command-line interface definitions.
//!
//! Configuration flags are consumed by the configuration loader before clap
//! sees the arguments, so they are described in the help text rather than
//! declared here.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface for the Pulse plugin controller.
#[derive(Parser, Debug)]
#[command(
    name = "pulse-ctl",
    disable_help_subcommand = true,
    override_usage = "pulse-ctl [CONFIG FLAGS] load <PLUGIN>...",
    after_help = concat!(
        "Configuration flags must come before the command:\n",
        "  --config-path <PATH>          TOML file to read (or PULSE_CONFIG_PATH)\n",
        "  --handshake-timeout-ms <MS>   Per-plugin handshake timeout\n",
        "  --plugin-log-path <DIR>       Directory passed to plugins for their logs\n",
        "  --log-filter <FILTER>         Tracing filter, for example `pulse_control=debug`\n",
        "  --log-format <FORMAT>         `json` or `compact`\n",
        "Each flag may also be set as PULSE_<NAME> in the environment."
    )
)]
pub(crate) struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations supported by the controller front end.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Loads plugins in order and prints one JSON line per loaded plugin.
    Load {
        /// Plugin executables to load.
        #[arg(value_name = "PLUGIN", required = true, num_args = 1..)]
        plugins: Vec<PathBuf>,
    },
}
