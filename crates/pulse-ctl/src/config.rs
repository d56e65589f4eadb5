//! Routes the leading configuration flags to `ortho_config`.
//!
//! `pulse-ctl [CONFIG FLAGS] load <PLUGIN>...`: every recognised flag before
//! the first other token belongs to the configuration loader. Everything from
//! that token on is parsed by clap as the command.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use pulse_config::ControlConfig;

use crate::errors::AppError;

/// Flags understood by [`ControlConfig`]'s loader.
///
/// Must list one entry per `ControlConfig` field plus `--config-path`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--handshake-timeout-ms",
    "--plugin-log-path",
    "--log-filter",
    "--log-format",
];

/// Source of the resolved configuration.
pub(crate) trait ConfigLoader {
    /// Loads configuration from the configuration flags of an invocation.
    fn load(&self, args: &[OsString]) -> Result<ControlConfig, AppError>;
}

/// Loads defaults, file, `PULSE_*` environment and flags through
/// `ortho_config`, then validates the result.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<ControlConfig, AppError> {
        let config = ControlConfig::load_from_iter(args.iter().cloned())
            .map_err(AppError::LoadConfiguration)?;
        config.validate()?;
        Ok(config)
    }
}

/// Arguments of one invocation, split between loader and command parser.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SplitArguments {
    /// Program name followed by the configuration flags and their values.
    pub(crate) config: Vec<OsString>,
    /// Program name followed by the command tokens.
    pub(crate) command: Vec<OsString>,
}

/// Whether a token is a configuration flag, and if so whether its value is
/// the following token.
fn config_flag(token: &OsStr) -> Option<bool> {
    let text = token.to_string_lossy();
    if !text.starts_with("--") {
        return None;
    }
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    CONFIG_CLI_FLAGS.contains(&flag).then_some(!inline_value)
}

/// Splits `args` at the first token that is neither a configuration flag
/// nor the value of one.
pub(crate) fn split_arguments(args: &[OsString]) -> SplitArguments {
    let mut tokens = args.iter();
    let Some(program) = tokens.next() else {
        return SplitArguments::default();
    };

    let mut config = vec![program.clone()];
    let mut command = vec![program.clone()];
    let mut awaiting_value = false;
    let mut rest = tokens.peekable();
    while let Some(token) = rest.peek() {
        let takes_value = config_flag(token);
        if !awaiting_value && takes_value.is_none() {
            break;
        }
        awaiting_value = !awaiting_value && takes_value.unwrap_or(false);
        config.push((*token).clone());
        rest.next();
    }
    command.extend(rest.cloned());
    SplitArguments { config, command }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline_value("--log-filter=debug", Some(false))]
    #[case::separate_value("--log-filter", Some(true))]
    #[case::command("load", None)]
    #[case::unknown_flag("--help", None)]
    fn classifies_tokens(#[case] token: &str, #[case] expected: Option<bool>) {
        assert_eq!(config_flag(OsStr::new(token)), expected);
    }

    #[rstest]
    fn leading_flags_go_to_the_loader() {
        let split = split_arguments(&os(&[
            "pulse-ctl",
            "--log-filter",
            "off",
            "--log-format=compact",
            "load",
            "a",
        ]));
        assert_eq!(
            split.config,
            os(&["pulse-ctl", "--log-filter", "off", "--log-format=compact"])
        );
        assert_eq!(split.command, os(&["pulse-ctl", "load", "a"]));
    }

    #[rstest]
    fn flags_after_the_command_stay_with_it() {
        let split = split_arguments(&os(&["pulse-ctl", "load", "--log-filter", "a"]));
        assert_eq!(split.config, os(&["pulse-ctl"]));
        assert_eq!(split.command, os(&["pulse-ctl", "load", "--log-filter", "a"]));
    }

    #[rstest]
    fn flag_values_may_look_like_commands() {
        let split = split_arguments(&os(&["pulse-ctl", "--config-path", "load", "load", "a"]));
        assert_eq!(split.config, os(&["pulse-ctl", "--config-path", "load"]));
        assert_eq!(split.command, os(&["pulse-ctl", "load", "a"]));
    }

    #[rstest]
    fn empty_arguments_split_to_nothing() {
        assert_eq!(split_arguments(&[]), SplitArguments::default());
    }
}
