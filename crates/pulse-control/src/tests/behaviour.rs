//! Behaviour-driven tests for loading script plugins.

use std::sync::MutexGuard;
use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::controller::{ControllerSettings, PluginController};
use crate::error::{ControlError, HandshakeError};
use crate::executor::CommandLauncher;
use crate::lifecycle::{LoadedPlugin, PluginState};
use crate::protocol::PluginType;

use super::scripts::{ScriptPlugin, emit};
use super::{failure_line, serial, success_line};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    _serial: MutexGuard<'static, ()>,
    controller: Option<PluginController<CommandLauncher>>,
    plugin: Option<ScriptPlugin>,
    result: Option<Result<LoadedPlugin, ControlError>>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld {
        _serial: serial(),
        controller: None,
        plugin: None,
        result: None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn controller(world: &TestWorld) -> &PluginController<CommandLauncher> {
    world.controller.as_ref().expect("controller not configured")
}

fn plugin(world: &TestWorld) -> &ScriptPlugin {
    world.plugin.as_ref().expect("plugin not configured")
}

fn loaded(world: &TestWorld) -> &LoadedPlugin {
    world
        .result
        .as_ref()
        .expect("no load attempted")
        .as_ref()
        .expect("expected the load to succeed")
}

fn load_error(world: &TestWorld) -> &ControlError {
    world
        .result
        .as_ref()
        .expect("no load attempted")
        .as_ref()
        .expect_err("expected the load to fail")
}

fn plugin_type(kind: &str) -> PluginType {
    match kind.trim_matches('"') {
        "collector" => PluginType::Collector,
        "processor" => PluginType::Processor,
        "publisher" => PluginType::Publisher,
        other => panic!("unknown plugin type '{other}'"),
    }
}

fn settings(timeout_ms: u64) -> ControllerSettings {
    ControllerSettings::new(Duration::from_millis(timeout_ms), Utf8PathBuf::from("/tmp"))
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a started plugin controller with a {timeout_ms} millisecond handshake")]
fn given_started_controller(world: &mut TestWorld, timeout_ms: u64) {
    let controller = PluginController::new(CommandLauncher, settings(timeout_ms));
    controller.start();
    world.controller = Some(controller);
}

#[given("a plugin controller that has not been started")]
fn given_stopped_controller(world: &mut TestWorld) {
    world.controller = Some(PluginController::new(CommandLauncher, settings(3_000)));
}

#[given("a plugin that answers success as {name} of type {kind} with token {token}")]
fn given_success_plugin(world: &mut TestWorld, name: String, kind: String, token: String) {
    world.plugin = Some(ScriptPlugin::success(
        name.trim_matches('"'),
        plugin_type(&kind),
        token.trim_matches('"'),
    ));
}

#[given("a plugin that exits without writing anything")]
fn given_silent_plugin(world: &mut TestWorld) {
    world.plugin = Some(ScriptPlugin::silent(0));
}

#[given("a plugin that sleeps past the deadline")]
fn given_sleeping_plugin(world: &mut TestWorld) {
    world.plugin = Some(ScriptPlugin::sleeper());
}

#[given("a plugin that writes invalid JSON")]
fn given_garbage_plugin(world: &mut TestWorld) {
    world.plugin = Some(ScriptPlugin::garbage());
}

#[given("a plugin that reports failure {message}")]
fn given_failing_plugin(world: &mut TestWorld, message: String) {
    world.plugin = Some(ScriptPlugin::failure(message.trim_matches('"')));
}

#[given("a plugin that answers success and then exits with status {code}")]
fn given_success_then_exit(world: &mut TestWorld, code: i32) {
    let line = success_line("cpu", 1, PluginType::Collector, "abc");
    world.plugin = Some(ScriptPlugin::new(&format!("{}\nexit {code}", emit(&line))));
}

#[given("a plugin that writes extra lines after answering success as {name}")]
fn given_chatty_plugin(world: &mut TestWorld, name: String) {
    let line = success_line(name.trim_matches('"'), 1, PluginType::Publisher, "extra");
    let body = format!(
        "{}\necho 'not json'\n{}",
        emit(&line),
        emit(&failure_line("ignored"))
    );
    world.plugin = Some(ScriptPlugin::new(&body));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the plugin is loaded")]
fn when_loaded(world: &mut TestWorld) {
    let result = controller(world).load(plugin(world).path());
    world.result = Some(result);
}

#[when("the controller is started twice")]
fn when_started_twice(world: &mut TestWorld) {
    let controller = controller(world);
    controller.start();
    controller.start();
}

#[when("the controller is stopped twice")]
fn when_stopped_twice(world: &mut TestWorld) {
    let controller = controller(world);
    controller.stop();
    controller.stop();
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the plugin is loaded as {name} of type {kind} with token {token}")]
fn then_loaded_as(world: &mut TestWorld, name: String, kind: String, token: String) {
    let plugin = loaded(world);
    assert_eq!(plugin.state(), PluginState::Loaded);
    assert_eq!(plugin.name(), Some(name.trim_matches('"')));
    assert_eq!(plugin.plugin_type(), Some(plugin_type(&kind)));
    assert_eq!(plugin.token(), Some(token.trim_matches('"')));
}

#[then("the load time is set")]
fn then_load_time_set(world: &mut TestWorld) {
    assert!(loaded(world).loaded_time().is_some());
}

#[then("the load fails with {error_kind}")]
fn then_load_fails(world: &mut TestWorld, error_kind: String) {
    let err = load_error(world);
    let matched = match error_kind.trim_matches('"') {
        "not_started" => matches!(err, ControlError::NotStarted),
        "rejected" => matches!(err, ControlError::HandshakeRejected { .. }),
        "timeout" => matches!(err.handshake_error(), Some(HandshakeError::Timeout { .. })),
        "malformed" => matches!(
            err.handshake_error(),
            Some(HandshakeError::MalformedResponse { .. })
        ),
        "process_exit" => matches!(
            err.handshake_error(),
            Some(HandshakeError::ProcessExit { .. })
        ),
        other => panic!(
            "unsupported error kind: '{other}' \
             (supported: not_started, rejected, timeout, malformed, process_exit)"
        ),
    };
    assert!(matched, "expected {error_kind}, got: {err}");
}

#[then("the error message contains {text}")]
fn then_error_contains(world: &mut TestWorld, text: String) {
    let expected = text.trim_matches('"');
    let message = load_error(world).to_string();
    assert!(
        message.contains(expected),
        "expected '{expected}' in '{message}'"
    );
}

#[then("{count} plugin(s) are registered")]
fn then_registered(world: &mut TestWorld, count: usize) {
    assert_eq!(controller(world).loaded_count(), count);
}

#[then("the plugin process is no longer running")]
fn then_not_running(world: &mut TestWorld) {
    assert!(!plugin(world).is_running());
}

#[then("no plugin process was launched")]
fn then_not_launched(world: &mut TestWorld) {
    assert!(!plugin(world).was_launched());
}

#[then("the controller accepts loads")]
fn then_accepts(world: &mut TestWorld) {
    assert!(controller(world).is_started());
}

#[then("the controller rejects loads")]
fn then_rejects(world: &mut TestWorld) {
    assert!(!controller(world).is_started());
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/plugin_loading.feature")]
fn plugin_loading_behaviour(world: TestWorld) {
    let _ = world;
}
