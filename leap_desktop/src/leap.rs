//! Gesture source backed by a real LeapMotion controller.
//!
//! Requires the `leap` feature flag and the LeapC shared library installed.
//!
//! LeapC reports hands only; the gesture events older SDKs produced are
//! derived here from palm motion so the dispatcher sees the same stream
//! either way:
//!
//! * **Swipe**: palm speed above `SWIPE_MIN_SPEED`.  Start when it crosses
//!   the threshold, Update while it stays above, Stop when it falls back.
//!   Direction is the normalised palm velocity.
//! * **Screen tap**: a fast push toward the screen (−Z), one Stop event.
//! * **Key tap**: a fast downward drop (−Y), one Stop event.
//!
//! Circles are not derived.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use leaprs::*;
use tracing::{debug, error, warn};

use crate::controller::{ControllerEvent, GestureSource};
use crate::gesture::{Finger, Frame, GestureEvent, GestureId, GestureState, Hand};
use crate::vector::Vector;

/// LeapC vector → [`Vector`].
macro_rules! leap_vec {
    ($v:expr) => {{
        let v = $v;
        Vector::new(v.x, v.y, v.z)
    }};
}

// Thresholds (empirically tuned)
const SWIPE_MIN_SPEED: f32      = 1000.0; // mm/s — palm speed that starts a swipe
const TAP_MIN_SPEED:   f32      = 500.0;  // mm/s — axis speed that counts as a tap
const TAP_MAX_DRIFT:   f32      = 250.0;  // mm/s — other axes must stay below this
const TAP_COOLDOWN:    Duration = Duration::from_millis(400);
const POLL_TIMEOUT_MS: u32      = 100;

/// Polls LeapC and forwards connection changes and tracking frames.
#[derive(Debug, Default)]
pub struct LeapGestureSource;

impl GestureSource for LeapGestureSource {
    fn run(self: Box<Self>, tx: Sender<ControllerEvent>) {
        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => { error!("Failed to create LeapC connection: {:?}", e); return; }
        };
        if let Err(e) = connection.open() {
            error!("Failed to open LeapMotion device: {:?}", e);
            return;
        }

        let start = Instant::now();
        let mut frame_id: i64 = 0;
        let mut synth = GestureSynth::default();

        loop {
            let msg = match connection.poll(POLL_TIMEOUT_MS) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            let event = match msg.event() {
                Event::Connection(_)     => ControllerEvent::Connect,
                Event::ConnectionLost(_) => ControllerEvent::Disconnect,
                Event::Tracking(frame) => {
                    frame_id += 1;
                    let tracked: Vec<_> = frame.hands().collect();
                    let hands: Vec<Hand> = tracked.iter().map(convert_hand).collect();
                    let velocities: Vec<(i32, Vector)> = tracked.iter()
                        .map(|h| (hand_id(h), leap_vec!(h.palm().velocity())))
                        .collect();
                    let gestures = synth.update(&hands, &velocities);
                    ControllerEvent::Frame(Frame {
                        id: frame_id,
                        timestamp: start.elapsed().as_micros() as i64,
                        hands,
                        gestures,
                    })
                }
                _ => continue,
            };

            if tx.send(event).is_err() {
                debug!("Controller gone; closing LeapC connection");
                return;
            }
        }
    }
}

/// One hand of each chirality is tracked at a time, so chirality is a
/// stable id.
fn hand_id(hand: &leaprs::Hand) -> i32 {
    match hand.hand_type() {
        HandType::Left  => 1,
        HandType::Right => 2,
    }
}

fn convert_hand(hand: &leaprs::Hand) -> Hand {
    let id   = hand_id(hand);
    let palm = hand.palm();
    let fingers = hand.digits().enumerate().map(|(i, digit)| {
        let distal = digit.distal();
        let base   = leap_vec!(distal.prev_joint());
        let tip    = leap_vec!(distal.next_joint());
        Finger {
            id:           id * 10 + i as i32,
            tip_position: tip,
            direction:    (tip - base).normalized(),
        }
    }).collect();

    Hand {
        id,
        palm_position: leap_vec!(palm.position()),
        palm_normal:   leap_vec!(palm.normal()),
        direction:     leap_vec!(palm.direction()),
        fingers,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSynth — palm motion → gesture events
// ════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct GestureSynth {
    next_id:  GestureId,
    /// Hand id → id of the swipe it is currently performing.
    swiping:  HashMap<i32, GestureId>,
    last_tap: HashMap<i32, Instant>,
}

impl GestureSynth {
    fn update(&mut self, hands: &[Hand], velocities: &[(i32, Vector)]) -> Vec<GestureEvent> {
        let mut out = Vec::new();

        for &(hand_id, velocity) in velocities {
            let Some(hand) = hands.iter().find(|h| h.id == hand_id) else { continue };
            let speed = velocity.magnitude();

            // ── swipe ─────────────────────────────────────────────────────
            let active = self.swiping.get(&hand_id).copied();
            match (active, speed > SWIPE_MIN_SPEED) {
                (None, true) => {
                    let id = self.fresh_id();
                    self.swiping.insert(hand_id, id);
                    out.push(self.swipe(id, GestureState::Start, hand, velocity));
                }
                (Some(id), true)  => out.push(self.swipe(id, GestureState::Update, hand, velocity)),
                (Some(id), false) => {
                    self.swiping.remove(&hand_id);
                    out.push(self.swipe(id, GestureState::Stop, hand, velocity));
                }
                (None, false) => {}
            }
            if self.swiping.contains_key(&hand_id) { continue; }

            // ── taps ──────────────────────────────────────────────────────
            let cooling = self.last_tap.get(&hand_id)
                .is_some_and(|t| t.elapsed() < TAP_COOLDOWN);
            if cooling { continue; }

            let drift_xy = velocity.x.abs().max(velocity.y.abs());
            let drift_xz = velocity.x.abs().max(velocity.z.abs());
            let tap = if -velocity.z > TAP_MIN_SPEED && drift_xy < TAP_MAX_DRIFT {
                Some(GestureEvent::screen_tap(self.fresh_id(), tip_or_palm(hand), velocity.normalized()))
            } else if -velocity.y > TAP_MIN_SPEED && drift_xz < TAP_MAX_DRIFT {
                Some(GestureEvent::key_tap(self.fresh_id(), tip_or_palm(hand), velocity.normalized()))
            } else {
                None
            };
            if let Some(tap) = tap {
                self.last_tap.insert(hand_id, Instant::now());
                out.push(tap);
            }
        }

        // Hands that left the field of view end their swipe as invalid.
        let gone: Vec<(i32, GestureId)> = self.swiping.iter()
            .filter(|(hand_id, _)| !velocities.iter().any(|(h, _)| h == *hand_id))
            .map(|(h, g)| (*h, *g))
            .collect();
        for (hand_id, id) in gone {
            warn!("Hand {} lost mid-swipe", hand_id);
            self.swiping.remove(&hand_id);
            out.push(GestureEvent::swipe(id, GestureState::Invalid, Vector::ZERO, 0.0));
        }
        out
    }

    fn fresh_id(&mut self) -> GestureId {
        self.next_id += 1;
        self.next_id
    }

    fn swipe(&self, id: GestureId, state: GestureState, hand: &Hand, velocity: Vector) -> GestureEvent {
        GestureEvent {
            position: hand.palm_position,
            ..GestureEvent::swipe(id, state, velocity.normalized(), velocity.magnitude())
        }
    }
}

/// Index finger tip when tracked, palm otherwise.
fn tip_or_palm(hand: &Hand) -> Vector {
    hand.fingers.get(1).map_or(hand.palm_position, |f| f.tip_position)
}
