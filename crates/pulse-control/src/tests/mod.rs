//! Crate-level test support and behaviour tests.
//!
//! Tests that write or spawn script plugins must hold [`serial`] for their
//! whole duration: a script opened for writing while another test forks
//! would fail to execute with `ETXTBSY`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::protocol::{HandshakeFailure, HandshakeResponse, PluginIdentity, PluginMeta, PluginType};

pub(crate) mod fakes;

#[cfg(target_os = "linux")]
mod behaviour;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serialises tests that touch real processes.
pub(crate) fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Encodes a success handshake line without the trailing newline.
pub(crate) fn success_line(name: &str, version: u32, plugin_type: PluginType, token: &str) -> String {
    let identity = PluginIdentity::new(PluginMeta::new(name, version), plugin_type, token);
    serde_json::to_string(&HandshakeResponse::Success(identity)).expect("encode success line")
}

/// Encodes a failure handshake line without the trailing newline.
pub(crate) fn failure_line(message: &str) -> String {
    serde_json::to_string(&HandshakeResponse::Failure(HandshakeFailure::new(message)))
        .expect("encode failure line")
}

#[test]
fn success_line_uses_the_wire_format() {
    let line = success_line("cpu", 2, PluginType::Collector, "abc");
    let value: serde_json::Value = serde_json::from_str(&line).expect("decode");
    assert_eq!(
        value,
        serde_json::json!({
            "state": "success",
            "meta": {"name": "cpu", "version": 2},
            "type": "collector",
            "token": "abc",
        })
    );
}
