//! Trust relationship between the controller and its plugins.
//!
//! Plugins are untrusted binaries. The controller hands each one a control
//! public key at launch and receives a session token in the handshake. Only
//! [`TrustScheme::Unauthenticated`] is implemented: tokens are recorded as
//! opaque identifiers. [`TrustScheme::KeyedHandshake`] is the extension
//! point for a scheme in which the plugin signs a seed that the controller
//! verifies against its key; selecting it today makes every load fail with
//! [`ControlError::TrustUnsupported`].

use crate::error::ControlError;

/// How the controller authenticates plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrustScheme {
    /// Tokens are accepted without verification.
    #[default]
    Unauthenticated,
    /// Tokens must be verifiable with the controller's key pair.
    KeyedHandshake {
        /// Public key passed to plugins at launch.
        control_public_key: String,
    },
}

impl TrustScheme {
    /// Returns the scheme name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::KeyedHandshake { .. } => "keyed_handshake",
        }
    }

    /// Returns the public key to hand to plugins, if the scheme has one.
    #[must_use]
    pub const fn control_public_key(&self) -> Option<&str> {
        match self {
            Self::Unauthenticated => None,
            Self::KeyedHandshake { control_public_key } => Some(control_public_key.as_str()),
        }
    }

    /// Checks the session token a plugin issued during its handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::TrustUnsupported`] for schemes that cannot
    /// verify tokens yet.
    pub fn verify_token(&self, _token: &str) -> Result<(), ControlError> {
        match self {
            Self::Unauthenticated => Ok(()),
            Self::KeyedHandshake { .. } => Err(ControlError::TrustUnsupported {
                scheme: self.name(),
            }),
        }
    }
}
