//! End-to-end: script source → controller → dispatcher → recorded commands.

use std::thread;
use std::time::{Duration, Instant};

use leap_desktop::action::RecordingRunner;
use leap_desktop::config::CommandConfig;
use leap_desktop::script::ScriptGestureSource;
use leap_desktop::{Controller, DesktopConfig, Dispatcher, ExternalCommand, GestureKind, LogConfig};

/// Replay `script` against a dispatcher built from `config` and return
/// every command it ran.
fn replay_with(config: &DesktopConfig, script: &str) -> Vec<ExternalCommand> {
    let runner = RecordingRunner::new();
    let dispatcher = Dispatcher::new(config, &LogConfig::default(), runner.clone());

    let mut controller = Controller::new(ScriptGestureSource::from_text(script).unwrap()).unwrap();
    controller.add_listener(dispatcher).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !controller.is_finished() {
        assert!(Instant::now() < deadline, "script never finished");
        thread::sleep(Duration::from_millis(5));
    }
    assert!(controller.remove_listener().is_some());
    runner.commands()
}

fn replay(script: &str) -> Vec<ExternalCommand> {
    replay_with(&DesktopConfig::default(), script)
}

fn xte(key: &str) -> ExternalCommand {
    let tap = format!("key {key}");
    ExternalCommand::new([
        "xte",
        "keydown Control_L",
        "keydown Alt_L",
        tap.as_str(),
        "keyup Alt_L",
        "keyup Control_L",
    ])
}

fn lock() -> ExternalCommand {
    ExternalCommand::new(["gnome-screensaver-command", "--lock"])
}

#[test]
fn swipe_left_goes_to_previous_desktop() {
    let cmds = replay("connect\nswipe id=1 state=stop direction=-1,0,0\n");
    assert_eq!(cmds, vec![xte("Left")]);
}

#[test]
fn swipe_right_goes_to_next_desktop() {
    let cmds = replay("connect\nswipe id=1 state=stop direction=0.5,0.1,0\n");
    assert_eq!(cmds, vec![xte("Right")]);
}

#[test]
fn steep_swipe_runs_nothing() {
    let cmds = replay("connect\nswipe id=1 state=stop direction=0.3,0.5,0\n");
    assert!(cmds.is_empty());
}

#[test]
fn vertical_swipe_in_dead_zone_runs_nothing() {
    let cmds = replay("connect\nswipe id=1 state=stop direction=0,0.1,0\n");
    assert!(cmds.is_empty());
}

#[test]
fn screen_tap_locks() {
    let cmds = replay("connect\nscreen_tap id=9 state=start position=-40,120,7 direction=0.2,0.9,0.1\n");
    assert_eq!(cmds, vec![lock()]);
}

#[test]
fn every_swipe_update_is_dispatched() {
    // Each event is classified on its own; a swipe reported over three
    // frames triggers three times.
    let cmds = replay(
        "connect\n\
         frame\nswipe id=3 state=start direction=1,0,0\n\
         frame\nswipe id=3 state=update direction=1,0.05,0\n\
         frame\nswipe id=3 state=stop direction=0.9,0.1,0\n",
    );
    assert_eq!(cmds, vec![xte("Right"), xte("Right"), xte("Right")]);
}

#[test]
fn circles_and_key_taps_are_diagnostic_only() {
    let cmds = replay(
        "connect\n\
         frame\ncircle id=2 state=start progress=0.1 normal=0,0,1 direction=0,0,1\n\
         frame\ncircle id=2 state=update progress=0.7 normal=0,0,1 direction=0,0,1\n\
         frame\ncircle id=2 state=stop progress=1.2 normal=0,0,1 direction=0,0,1\n\
         key_tap id=3\n",
    );
    assert!(cmds.is_empty());
}

#[test]
fn gestures_before_connect_are_dropped() {
    // Gesture kinds are enabled in on_connect; until then frames arrive
    // with their gestures stripped.
    let cmds = replay("screen_tap id=1\nconnect\nscreen_tap id=2\n");
    assert_eq!(cmds, vec![lock()]);
}

#[test]
fn only_configured_gestures_are_enabled() {
    let mut config = DesktopConfig::default();
    config.gestures.enabled = vec![GestureKind::ScreenTap];
    let cmds = replay_with(
        &config,
        "connect\nswipe id=1 state=stop direction=-1,0,0\nscreen_tap id=2\n",
    );
    assert_eq!(cmds, vec![lock()]);
}

#[test]
fn configured_commands_replace_defaults() {
    let config = DesktopConfig {
        commands: CommandConfig {
            next_desktop: ExternalCommand::new(["wmctrl", "-s", "1"]),
            ..CommandConfig::default()
        },
        ..DesktopConfig::default()
    };
    let cmds = replay_with(&config, "connect\nswipe id=1 state=stop direction=1,0,0\n");
    assert_eq!(cmds, vec![ExternalCommand::new(["wmctrl", "-s", "1"])]);
}

#[test]
fn mixed_session() {
    let cmds = replay(
        "connect\n\
         frame id=100\n\
         hand id=1 palm=0,200,0 tips=0,250,0;10,240,0\n\
         hand id=2 palm=100,200,0\n\
         swipe id=5 state=stop direction=-0.95,0.1,0.2 speed=1500\n\
         circle id=6 state=update progress=2.0 normal=0,0,-1 direction=0,0,1\n\
         frame id=101\n\
         screen_tap id=7\n\
         disconnect\n",
    );
    assert_eq!(cmds, vec![xte("Left"), lock()]);
}
