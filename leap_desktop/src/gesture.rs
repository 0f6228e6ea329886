//! Tracking data delivered by a gesture source: frames, hands, fingers and
//! the recognized gestures inside each frame.
//!
//! These types are plain data.  Sources build them once per sensor frame
//! and the dispatcher drops them after processing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::vector::Vector;

// ════════════════════════════════════════════════════════════════════════════
// GestureKind / GestureState
// ════════════════════════════════════════════════════════════════════════════

/// The four gesture types the sensor recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Circle,
    Swipe,
    KeyTap,
    ScreenTap,
}

impl GestureKind {
    pub const ALL: &'static [GestureKind] = &[
        GestureKind::Circle,
        GestureKind::KeyTap,
        GestureKind::ScreenTap,
        GestureKind::Swipe,
    ];

    /// Bit used in the controller's enabled-gesture mask.
    pub fn bit(self) -> u8 {
        match self {
            GestureKind::Circle    => 1 << 0,
            GestureKind::Swipe     => 1 << 1,
            GestureKind::KeyTap    => 1 << 2,
            GestureKind::ScreenTap => 1 << 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GestureKind::Circle    => "circle",
            GestureKind::Swipe     => "swipe",
            GestureKind::KeyTap    => "key_tap",
            GestureKind::ScreenTap => "screen_tap",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a gesture.  Discrete gestures (taps) are reported
/// once, in `Stop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Start,
    Update,
    Stop,
    Invalid,
}

impl GestureState {
    /// `Stop` and `Invalid` end a gesture; its id will not be seen again.
    pub fn is_terminal(self) -> bool {
        matches!(self, GestureState::Stop | GestureState::Invalid)
    }
}

impl fmt::Display for GestureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GestureState::Start   => "STATE_START",
            GestureState::Update  => "STATE_UPDATE",
            GestureState::Stop    => "STATE_STOP",
            GestureState::Invalid => "STATE_INVALID",
        })
    }
}

impl FromStr for GestureState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start"   => Ok(GestureState::Start),
            "update"  => Ok(GestureState::Update),
            "stop"    => Ok(GestureState::Stop),
            "invalid" => Ok(GestureState::Invalid),
            other     => Err(format!("unknown gesture state \"{other}\"")),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureEvent
// ════════════════════════════════════════════════════════════════════════════

/// Identifier assigned by the sensor.  Stable for the whole
/// Start → Update → Stop lifetime of one gesture.
pub type GestureId = i32;

/// Attributes that only exist for one gesture type.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureDetail {
    /// `progress` counts full turns (1.0 = one loop).  `normal` is the
    /// circle plane's normal.
    Circle { progress: f32, radius: f32, normal: Vector },
    /// Speed in mm/s.
    Swipe { speed: f32 },
    KeyTap,
    ScreenTap,
}

/// One recognized gesture in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureEvent {
    pub id:        GestureId,
    pub state:     GestureState,
    /// Unit direction.  For circles: the pointing direction of the finger
    /// drawing the circle.
    pub direction: Vector,
    /// For circles: the circle centre.
    pub position:  Vector,
    pub detail:    GestureDetail,
}

impl GestureEvent {
    pub fn kind(&self) -> GestureKind {
        match self.detail {
            GestureDetail::Circle { .. } => GestureKind::Circle,
            GestureDetail::Swipe { .. }  => GestureKind::Swipe,
            GestureDetail::KeyTap        => GestureKind::KeyTap,
            GestureDetail::ScreenTap     => GestureKind::ScreenTap,
        }
    }

    pub fn swipe(id: GestureId, state: GestureState, direction: Vector, speed: f32) -> Self {
        GestureEvent {
            id,
            state,
            direction,
            position: Vector::ZERO,
            detail: GestureDetail::Swipe { speed },
        }
    }

    pub fn screen_tap(id: GestureId, position: Vector, direction: Vector) -> Self {
        GestureEvent {
            id,
            state: GestureState::Stop,
            direction,
            position,
            detail: GestureDetail::ScreenTap,
        }
    }

    pub fn key_tap(id: GestureId, position: Vector, direction: Vector) -> Self {
        GestureEvent {
            id,
            state: GestureState::Stop,
            direction,
            position,
            detail: GestureDetail::KeyTap,
        }
    }

    pub fn circle(
        id: GestureId,
        state: GestureState,
        progress: f32,
        pointing: Vector,
        normal: Vector,
    ) -> Self {
        GestureEvent {
            id,
            state,
            direction: pointing,
            position: Vector::ZERO,
            detail: GestureDetail::Circle { progress, radius: 0.0, normal },
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame / Hand / Finger
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Finger {
    pub id:           i32,
    pub tip_position: Vector,
    pub direction:    Vector,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hand {
    pub id:            i32,
    pub palm_position: Vector,
    pub palm_normal:   Vector,
    pub direction:     Vector,
    pub fingers:       Vec<Finger>,
}

impl Hand {
    /// Mean finger-tip position, or `None` for a hand with no visible
    /// fingers.
    pub fn average_tip_position(&self) -> Option<Vector> {
        if self.fingers.is_empty() { return None; }
        let sum = self.fingers.iter()
            .fold(Vector::ZERO, |acc, f| acc + f.tip_position);
        Some(sum / self.fingers.len() as f32)
    }
}

/// One capture cycle of the sensor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub id:        i64,
    /// Microseconds, source-defined epoch.
    pub timestamp: i64,
    pub hands:     Vec<Hand>,
    pub gestures:  Vec<GestureEvent>,
}

impl Frame {
    pub fn finger_count(&self) -> usize {
        self.hands.iter().map(|h| h.fingers.len()).sum()
    }
}
