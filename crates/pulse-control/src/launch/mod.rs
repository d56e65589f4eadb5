//! Launch arguments handed to a plugin process.
//!
//! A plugin is invoked as `<executable> <json>`, where the single argument is
//! the serialised [`LaunchArgs`]:
//!
//! ```text
//! {"control_pub_key":null,"plugin_log_path":"/tmp","run_as_daemon":false}
//! ```

use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

/// Configuration payload passed to a plugin on its command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchArgs {
    control_pub_key: Option<String>,
    plugin_log_path: Utf8PathBuf,
    run_as_daemon: bool,
}

impl LaunchArgs {
    /// Creates launch arguments.
    #[must_use]
    pub const fn new(
        control_pub_key: Option<String>,
        plugin_log_path: Utf8PathBuf,
        run_as_daemon: bool,
    ) -> Self {
        Self {
            control_pub_key,
            plugin_log_path,
            run_as_daemon,
        }
    }

    /// Returns the control public key, if the trust scheme provides one.
    #[must_use]
    pub fn control_pub_key(&self) -> Option<&str> {
        self.control_pub_key.as_deref()
    }

    /// Returns the directory the plugin should log into.
    #[must_use]
    pub fn plugin_log_path(&self) -> &Utf8Path {
        self.plugin_log_path.as_path()
    }

    /// Returns whether the plugin is asked to daemonise.
    #[must_use]
    pub const fn run_as_daemon(&self) -> bool {
        self.run_as_daemon
    }

    /// Encodes the arguments as the single command-line argument.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::SerializeArgs`] if encoding fails.
    pub fn to_json(&self) -> Result<String, ExecutorError> {
        serde_json::to_string(self).map_err(ExecutorError::SerializeArgs)
    }
}

/// Everything a launcher needs to start one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    path: PathBuf,
    args: LaunchArgs,
}

impl LaunchRequest {
    /// Creates a launch request for the executable at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, args: LaunchArgs) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// Returns the executable path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Returns the launch arguments.
    #[must_use]
    pub const fn args(&self) -> &LaunchArgs {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn placeholder_key_serialises_as_null() {
        let args = LaunchArgs::new(None, Utf8PathBuf::from("/tmp"), false);
        let value: serde_json::Value =
            serde_json::from_str(&args.to_json().expect("encode")).expect("decode");
        assert_eq!(
            value,
            json!({
                "control_pub_key": null,
                "plugin_log_path": "/tmp",
                "run_as_daemon": false,
            })
        );
    }

    #[test]
    fn request_exposes_path_and_args() {
        let args = LaunchArgs::new(Some(String::from("key")), Utf8PathBuf::from("/var/log"), true);
        let request = LaunchRequest::new("/opt/pulse/plugins/cpu", args.clone());
        assert_eq!(request.path(), Path::new("/opt/pulse/plugins/cpu"));
        assert_eq!(request.args(), &args);
        assert_eq!(request.args().control_pub_key(), Some("key"));
        assert!(request.args().run_as_daemon());
    }
}
