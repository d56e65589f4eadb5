//! Output format for the controller's own logs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How log events are rendered on standard error.
///
/// Parsing is case-insensitive so `--log-format JSON` and a `log_format =
/// "json"` entry in a configuration file select the same format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, with fields flattened to the top level.
    #[default]
    Json,
    /// Single-line text meant for a terminal.
    Compact,
}

impl LogFormat {
    /// Returns whether events may carry ANSI colour codes.
    ///
    /// JSON output never does, so log collectors receive clean documents
    /// even when standard error is a terminal.
    #[must_use]
    pub const fn allows_ansi(self) -> bool {
        matches!(self, Self::Compact)
    }
}
