//! Controller — connects a gesture source to a listener.
//!
//! A [`GestureSource`] runs on its own thread and pushes
//! [`ControllerEvent`]s into an `mpsc` channel.  The controller drains that
//! channel on a dispatch thread and calls the registered [`Listener`] once
//! per event.  Listeners never need to know whether events come from real
//! hardware or from a script.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::gesture::{Frame, GestureKind};

/// How long the dispatch thread waits for an event before re-checking its
/// stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ════════════════════════════════════════════════════════════════════════════
// ControllerEvent / GestureSource
// ════════════════════════════════════════════════════════════════════════════

/// Everything a source can report.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    /// The sensor became available.
    Connect,
    /// The sensor went away.
    Disconnect,
    /// One captured frame.
    Frame(Frame),
}

/// Anything that can deliver [`ControllerEvent`]s over a channel.
///
/// `run` returns when the source is exhausted or the receiver is gone.
pub trait GestureSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<ControllerEvent>);
}

/// Spawn a gesture source on its own thread and return the receiving end.
pub fn spawn_gesture_source<G: GestureSource>(source: G) -> Result<Receiver<ControllerEvent>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("leap-source".into())
        .spawn(move || Box::new(source).run(tx))
        .map_err(|e| Error::Source(format!("failed to spawn source thread: {e}")))?;
    Ok(rx)
}

// ════════════════════════════════════════════════════════════════════════════
// Listener
// ════════════════════════════════════════════════════════════════════════════

/// Callbacks invoked by the controller, one per event kind.
///
/// All callbacks run on the controller's dispatch thread.
pub trait Listener: Send + 'static {
    /// Called once when the listener is registered.
    fn on_init(&mut self, _controller: &ControllerHandle) {}
    fn on_connect(&mut self, _controller: &ControllerHandle) {}
    fn on_disconnect(&mut self, _controller: &ControllerHandle) {}
    /// Called once when the listener is removed.
    fn on_exit(&mut self, _controller: &ControllerHandle) {}
    fn on_frame(&mut self, controller: &ControllerHandle, frame: &Frame);
}

// ════════════════════════════════════════════════════════════════════════════
// ControllerHandle — the part of the controller listeners may touch
// ════════════════════════════════════════════════════════════════════════════

/// Shared, cheaply cloneable view of controller settings.
///
/// Gestures of a kind that has not been enabled are stripped from frames
/// before the listener sees them.
#[derive(Clone, Debug, Default)]
pub struct ControllerHandle {
    enabled: Arc<AtomicU8>,
}

impl ControllerHandle {
    pub fn enable_gesture(&self, kind: GestureKind) {
        self.enabled.fetch_or(kind.bit(), Ordering::SeqCst);
    }

    pub fn disable_gesture(&self, kind: GestureKind) {
        self.enabled.fetch_and(!kind.bit(), Ordering::SeqCst);
    }

    pub fn is_gesture_enabled(&self, kind: GestureKind) -> bool {
        self.enabled.load(Ordering::SeqCst) & kind.bit() != 0
    }

    fn retain_enabled(&self, frame: &mut Frame) {
        let mask = self.enabled.load(Ordering::SeqCst);
        frame.gestures.retain(|g| mask & g.kind().bit() != 0);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Controller
// ════════════════════════════════════════════════════════════════════════════

struct Dispatch {
    stop:   Arc<AtomicBool>,
    thread: JoinHandle<(Box<dyn Listener>, Receiver<ControllerEvent>)>,
}

/// Owns the source channel and, while a listener is registered, the
/// dispatch thread.  At most one listener at a time.
pub struct Controller {
    handle:   ControllerHandle,
    events:   Option<Receiver<ControllerEvent>>,
    dispatch: Option<Dispatch>,
    finished: Arc<AtomicBool>,
}

impl Controller {
    /// Start `source` on its own thread.
    pub fn new<G: GestureSource>(source: G) -> Result<Self> {
        Ok(Self::from_receiver(spawn_gesture_source(source)?))
    }

    /// Use an existing event channel.
    pub fn from_receiver(events: Receiver<ControllerEvent>) -> Self {
        Controller {
            handle:   ControllerHandle::default(),
            events:   Some(events),
            dispatch: None,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    /// True once the source has closed its channel and every event it sent
    /// has been dispatched.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn has_listener(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Register `listener` and start dispatching to it.
    pub fn add_listener<L: Listener>(&mut self, listener: L) -> Result<()> {
        if self.dispatch.is_some() {
            return Err(Error::ListenerRegistered);
        }
        let rx = self.events.take().ok_or(Error::ListenerRegistered)?;

        let stop     = Arc::new(AtomicBool::new(false));
        let handle   = self.handle.clone();
        let finished = Arc::clone(&self.finished);
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("leap-dispatch".into())
            .spawn(move || {
                let mut listener: Box<dyn Listener> = Box::new(listener);
                listener.on_init(&handle);
                dispatch_loop(listener.as_mut(), &handle, &rx, &stop_flag, &finished);
                (listener, rx)
            })
            .map_err(|e| Error::Source(format!("failed to spawn dispatch thread: {e}")))?;

        self.dispatch = Some(Dispatch { stop, thread });
        Ok(())
    }

    /// Stop dispatching, call `on_exit`, and hand the listener back.
    ///
    /// Events not yet dispatched stay queued for the next listener.
    pub fn remove_listener(&mut self) -> Option<Box<dyn Listener>> {
        let dispatch = self.dispatch.take()?;
        dispatch.stop.store(true, Ordering::SeqCst);
        match dispatch.thread.join() {
            Ok((mut listener, rx)) => {
                listener.on_exit(&self.handle);
                self.events = Some(rx);
                Some(listener)
            }
            Err(_) => {
                error!("Dispatch thread panicked; listener lost");
                None
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.remove_listener();
    }
}

fn dispatch_loop(
    listener: &mut dyn Listener,
    handle:   &ControllerHandle,
    rx:       &Receiver<ControllerEvent>,
    stop:     &AtomicBool,
    finished: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(ControllerEvent::Connect)    => listener.on_connect(handle),
            Ok(ControllerEvent::Disconnect) => listener.on_disconnect(handle),
            Ok(ControllerEvent::Frame(mut frame)) => {
                handle.retain_enabled(&mut frame);
                listener.on_frame(handle, &frame);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Gesture source finished");
                finished.store(true, Ordering::SeqCst);
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
