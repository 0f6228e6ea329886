//! # leap_desktop
//!
//! LeapMotion gesture listener that drives the desktop: swipe left or right
//! to change virtual desktop, tap toward the screen to lock it.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Condition | Action | Default command |
//! |---|---|---|---|
//! | Swipe | leftward, roughly horizontal | Previous desktop | `xte` Ctrl+Alt+Left |
//! | Swipe | rightward, roughly horizontal | Next desktop | `xte` Ctrl+Alt+Right |
//! | Screen tap | any | Lock screen | `gnome-screensaver-command --lock` |
//! | Circle | — | logged (swept angle, clock direction) | — |
//! | Key tap | — | logged | — |
//!
//! Commands are configurable in `~/.config/leap-desktop/config.toml`.
//!
//! ## Pieces
//!
//! * [`controller::Controller`] runs a [`controller::GestureSource`] on its
//!   own thread and calls a [`controller::Listener`] for every event.
//! * [`dispatcher::Dispatcher`] is the listener that classifies gestures
//!   and runs commands through a [`action::CommandRunner`].
//!
//! ## Feature flags
//!
//! * (default) — **Script mode**: events are read from a script file or
//!   stdin (see [`script`]).
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.

pub mod action;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod gesture;
#[cfg(feature = "leap")]
pub mod leap;
pub mod logging;
pub mod script;
pub mod vector;

pub use action::{Action, CommandRunner, ExternalCommand};
pub use config::DesktopConfig;
pub use controller::{Controller, ControllerEvent, ControllerHandle, GestureSource, Listener};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use gesture::{Frame, GestureEvent, GestureKind, GestureState};
pub use logging::LogConfig;
pub use vector::Vector;
