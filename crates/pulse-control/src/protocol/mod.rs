//! Wire types for the plugin handshake.
//!
//! After startup a plugin writes one JSON object per line to its standard
//! output. The first line is the handshake response; its `state` field
//! selects between a success payload (identity, type, session token) and a
//! failure carrying the plugin's own error message:
//!
//! ```text
//! {"state":"success","meta":{"name":"cpu","version":2},"type":"collector","token":"abc"}
//! {"state":"failure","error_message":"bad config"}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Category a plugin declares for itself.
///
/// # Example
///
/// ```
/// use pulse_control::PluginType;
///
/// assert_eq!(PluginType::Collector.as_str(), "collector");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    /// Gathers metrics from a source.
    Collector,
    /// Transforms collected metrics.
    Processor,
    /// Sends metrics to a destination.
    Publisher,
}

impl PluginType {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collector => "collector",
            Self::Processor => "processor",
            Self::Publisher => "publisher",
        }
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity a plugin declares about itself.
///
/// Fields beyond `name` and `version` are vendor-defined and passed through
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    name: String,
    version: u32,
    #[serde(flatten)]
    vendor: BTreeMap<String, serde_json::Value>,
}

impl PluginMeta {
    /// Creates metadata without vendor fields.
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            vendor: BTreeMap::new(),
        }
    }

    /// Adds a vendor-defined field.
    #[must_use]
    pub fn with_vendor_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.vendor.insert(key.into(), value);
        self
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the vendor-defined fields.
    #[must_use]
    pub const fn vendor(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.vendor
    }
}

/// Success payload of a handshake: who the plugin is and the token it issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
    meta: PluginMeta,
    #[serde(rename = "type")]
    plugin_type: PluginType,
    #[serde(default)]
    token: String,
}

impl PluginIdentity {
    /// Creates an identity payload.
    #[must_use]
    pub fn new(meta: PluginMeta, plugin_type: PluginType, token: impl Into<String>) -> Self {
        Self {
            meta,
            plugin_type,
            token: token.into(),
        }
    }

    /// Returns the declared metadata.
    #[must_use]
    pub const fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    /// Returns the declared plugin type.
    #[must_use]
    pub const fn plugin_type(&self) -> PluginType {
        self.plugin_type
    }

    /// Returns the session token issued by the plugin.
    #[must_use]
    pub const fn token(&self) -> &str {
        self.token.as_str()
    }
}

/// Failure payload of a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeFailure {
    #[serde(default)]
    error_message: String,
}

impl HandshakeFailure {
    /// Creates a failure payload.
    #[must_use]
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
        }
    }

    /// Returns the message supplied by the plugin.
    #[must_use]
    pub const fn error_message(&self) -> &str {
        self.error_message.as_str()
    }
}

/// The single message a plugin emits after startup.
///
/// # Example
///
/// ```
/// use pulse_control::HandshakeResponse;
///
/// let line = r#"{"state":"failure","error_message":"bad config"}"#;
/// let response: HandshakeResponse = serde_json::from_str(line).unwrap();
/// assert!(!response.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HandshakeResponse {
    /// The plugin initialised and declared its identity.
    Success(PluginIdentity),
    /// The plugin could not initialise.
    Failure(HandshakeFailure),
}

impl HandshakeResponse {
    /// Returns whether the plugin reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
