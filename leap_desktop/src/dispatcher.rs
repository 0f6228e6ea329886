//! Gesture dispatcher — the listener that turns gestures into desktop
//! actions.
//!
//! | Gesture | Condition | Action |
//! |---|---|---|
//! | Swipe | `x < detect`, `|y| < tolerance` | previous desktop |
//! | Swipe | `x > detect`, `|y| < tolerance` | next desktop |
//! | Screen tap | always | lock screen |
//! | Circle, key tap | — | none (logged only) |
//!
//! With the default `detect = 0.0`, a swipe with `x == 0` matches neither
//! branch.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_4, TAU};
use std::fmt;

use tracing::{debug, debug_span, info};

use crate::action::{Action, CommandRunner};
use crate::config::{CommandConfig, DesktopConfig, SwipeConfig};
use crate::controller::{ControllerHandle, Listener};
use crate::gesture::{Frame, GestureDetail, GestureEvent, GestureId, GestureKind, GestureState};
use crate::logging::LogConfig;
use crate::vector::Vector;

// ════════════════════════════════════════════════════════════════════════════
// Classification rules
// ════════════════════════════════════════════════════════════════════════════

/// Action for a swipe with the given direction, if any.
pub fn classify_swipe(direction: Vector, cfg: &SwipeConfig) -> Option<Action> {
    let horizontal = direction.y.abs() < cfg.tolerance;
    if direction.x < cfg.detect && horizontal {
        Some(Action::PreviousDesktop)
    } else if direction.x > cfg.detect && horizontal {
        Some(Action::NextDesktop)
    } else {
        None
    }
}

/// Action for any gesture.  At most one per event.
pub fn classify(gesture: &GestureEvent, cfg: &SwipeConfig) -> Option<Action> {
    match gesture.detail {
        GestureDetail::Swipe { .. }  => classify_swipe(gesture.direction, cfg),
        GestureDetail::ScreenTap     => Some(Action::LockScreen),
        GestureDetail::Circle { .. } => None,
        GestureDetail::KeyTap        => None,
    }
}

/// Which way a circle is being drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockDirection {
    Clockwise,
    Counterclockwise,
}

impl fmt::Display for ClockDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClockDirection::Clockwise        => "clockwise",
            ClockDirection::Counterclockwise => "counterclockwise",
        })
    }
}

/// Clockwise when the pointing direction is within 45° of the circle
/// normal.
pub fn clock_direction(pointing: Vector, normal: Vector) -> ClockDirection {
    if pointing.angle_to(&normal) <= FRAC_PI_4 {
        ClockDirection::Clockwise
    } else {
        ClockDirection::Counterclockwise
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ProgressCache — last circle progress per gesture id
// ════════════════════════════════════════════════════════════════════════════

/// Remembers the most recent progress of each live circle so the swept
/// angle can be computed without keeping old frames around.
#[derive(Debug, Default)]
pub struct ProgressCache {
    last: HashMap<GestureId, f32>,
}

impl ProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `progress` for `id` and return the angle (radians) swept
    /// since the previous observation.
    ///
    /// `Start` never looks back and yields 0, as does a gesture with no
    /// earlier observation.  Terminal states evict the entry.
    pub fn observe(&mut self, id: GestureId, state: GestureState, progress: f32) -> f32 {
        let swept = match state {
            GestureState::Start => 0.0,
            _ => self.last.get(&id).map_or(0.0, |prev| (progress - prev) * TAU),
        };
        if state.is_terminal() {
            self.last.remove(&id);
        } else {
            self.last.insert(id, progress);
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Dispatcher
// ════════════════════════════════════════════════════════════════════════════

pub struct Dispatcher<R: CommandRunner> {
    swipe:           SwipeConfig,
    commands:        CommandConfig,
    enabled:         Vec<GestureKind>,
    runner:          R,
    progress:        ProgressCache,
    frame_summaries: bool,
}

impl<R: CommandRunner> Dispatcher<R> {
    pub fn new(config: &DesktopConfig, log: &LogConfig, runner: R) -> Self {
        Dispatcher {
            swipe:           config.swipe.clone(),
            commands:        config.commands.clone(),
            enabled:         config.gestures.enabled.clone(),
            runner,
            progress:        ProgressCache::new(),
            frame_summaries: log.frame_summaries,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn progress(&self) -> &ProgressCache {
        &self.progress
    }

    /// Classify one gesture, log it, and run the matching command.
    /// Returns the action taken.
    pub fn dispatch(&mut self, gesture: &GestureEvent) -> Option<Action> {
        match gesture.detail {
            GestureDetail::Circle { progress, radius, normal } => {
                let swept = self.progress.observe(gesture.id, gesture.state, progress);
                debug!(
                    "Circle id: {}, {}, progress: {:.3}, radius: {:.1}, angle: {:.1} degrees, {}",
                    gesture.id,
                    gesture.state,
                    progress,
                    radius,
                    swept.to_degrees(),
                    clock_direction(gesture.direction, normal),
                );
            }
            GestureDetail::Swipe { speed } => {
                debug!(
                    "Swipe id: {}, state: {}, position: {}, direction: {}, speed: {:.1}",
                    gesture.id, gesture.state, gesture.position, gesture.direction, speed,
                );
            }
            GestureDetail::KeyTap => {
                debug!(
                    "Key Tap id: {}, {}, position: {}, direction: {}",
                    gesture.id, gesture.state, gesture.position, gesture.direction,
                );
            }
            GestureDetail::ScreenTap => {
                debug!(
                    "Screen Tap id: {}, {}, position: {}, direction: {}",
                    gesture.id, gesture.state, gesture.position, gesture.direction,
                );
            }
        }

        let action = classify(gesture, &self.swipe)?;
        info!("{} → {}", gesture.kind(), action);
        self.runner.run(self.commands.command_for(action));
        Some(action)
    }

    fn log_frame(&self, frame: &Frame) {
        if self.frame_summaries && frame.hands.len() == 2 {
            info!(
                "Frame id: {}, timestamp: {}, hands: {}, fingers: {}, gestures: {}",
                frame.id,
                frame.timestamp,
                frame.hands.len(),
                frame.finger_count(),
                frame.gestures.len(),
            );
        }
        if let Some(hand) = frame.hands.first() {
            if let Some(avg) = hand.average_tip_position() {
                debug!(
                    "Hand has {} fingers, average finger tip position: {}",
                    hand.fingers.len(),
                    avg
                );
            }
        }
    }
}

impl<R: CommandRunner + 'static> Listener for Dispatcher<R> {
    fn on_init(&mut self, _controller: &ControllerHandle) {
        self.progress.clear();
        info!("Initialized");
    }

    fn on_connect(&mut self, controller: &ControllerHandle) {
        info!("Connected");
        for kind in &self.enabled {
            controller.enable_gesture(*kind);
        }
    }

    fn on_disconnect(&mut self, _controller: &ControllerHandle) {
        info!("Disconnected");
    }

    fn on_exit(&mut self, _controller: &ControllerHandle) {
        info!("Exited");
    }

    fn on_frame(&mut self, _controller: &ControllerHandle, frame: &Frame) {
        let _span = debug_span!("frame", id = frame.id).entered();
        self.log_frame(frame);
        for gesture in &frame.gestures {
            self.dispatch(gesture);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
