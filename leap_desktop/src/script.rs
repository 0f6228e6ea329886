//! Script-driven gesture source — replays tracking events written as text.
//!
//! Used when no LeapMotion hardware is available, and by the tests.
//!
//! ```text
//! # comments start with '#'
//! connect
//! frame id=1 timestamp=16000
//! hand id=1 palm=0,180,0 tips=-20,210,5;0,220,0;20,215,5
//! swipe id=4 state=stop direction=-1,0,0 speed=1400
//! screen_tap id=5
//! circle id=6 state=update progress=1.25 radius=30 normal=0,0,-1 direction=0,0,-1
//! key_tap id=7 position=0,150,20 direction=0,-1,0
//! disconnect
//! ```
//!
//! Hand and gesture lines belong to the current frame; one is opened
//! implicitly if needed.  A blank line, `frame`, `connect`, `disconnect` or
//! end of input closes the current frame and emits it.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::controller::{ControllerEvent, GestureSource};
use crate::error::{Error, Result};
use crate::gesture::{Finger, Frame, GestureDetail, GestureEvent, GestureState, Hand};
use crate::vector::Vector;

// ════════════════════════════════════════════════════════════════════════════
// ScriptParser — line-at-a-time
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ScriptParser {
    line:          usize,
    current:       Option<Frame>,
    next_frame_id: i64,
}

impl Default for ScriptParser {
    fn default() -> Self {
        ScriptParser { line: 0, current: None, next_frame_id: 1 }
    }
}

impl ScriptParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line.  Returns the events it completes, which may be none.
    ///
    /// On error the line is discarded and the parser stays usable.
    pub fn feed(&mut self, raw: &str) -> Result<Vec<ControllerEvent>> {
        self.line += 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        let mut out = Vec::new();

        let mut words = text.split_whitespace();
        let Some(keyword) = words.next() else {
            out.extend(self.flush());
            return Ok(out);
        };
        let mut fields = Fields::parse(words, self.line)?;

        match keyword {
            "connect" | "disconnect" => {
                fields.finish()?;
                out.extend(self.flush());
                out.push(if keyword == "connect" {
                    ControllerEvent::Connect
                } else {
                    ControllerEvent::Disconnect
                });
            }
            "frame" => {
                let id        = fields.opt_i64("id")?.unwrap_or(self.next_frame_id);
                let timestamp = fields.opt_i64("timestamp")?.unwrap_or(0);
                fields.finish()?;
                let next = self.next_id_after(id)?;
                out.extend(self.flush());
                self.open_frame(id, timestamp, next);
            }
            "hand" => {
                let open_hands = self.current.as_ref().map_or(0, |f| f.hands.len());
                let hand = parse_hand(&mut fields, open_hands as i32 + 1)?;
                self.frame()?.hands.push(hand);
            }
            "swipe" | "screen_tap" | "key_tap" | "circle" => {
                let gesture = parse_gesture(keyword, &mut fields)?;
                self.frame()?.gestures.push(gesture);
            }
            other => return Err(self.error(format!("unknown keyword \"{other}\""))),
        }
        Ok(out)
    }

    /// Emit the frame still open at end of input, if any.
    pub fn finish(&mut self) -> Option<ControllerEvent> {
        self.flush()
    }

    fn open_frame(&mut self, id: i64, timestamp: i64, next: i64) {
        self.current = Some(Frame { id, timestamp, ..Default::default() });
        self.next_frame_id = next;
    }

    fn next_id_after(&self, id: i64) -> Result<i64> {
        id.checked_add(1).ok_or_else(|| self.error(format!("frame id {id} is out of range")))
    }

    /// The open frame, opening an implicit one first if needed.
    fn frame(&mut self) -> Result<&mut Frame> {
        if self.current.is_none() {
            let id = self.next_frame_id;
            let next = self.next_id_after(id)?;
            self.open_frame(id, 0, next);
        }
        Ok(self.current.get_or_insert_with(Frame::default))
    }

    fn flush(&mut self) -> Option<ControllerEvent> {
        self.current.take().map(ControllerEvent::Frame)
    }

    fn error(&self, message: String) -> Error {
        Error::Script { line: self.line, message }
    }
}

/// Parse a complete script.  Fails on the first bad line.
pub fn parse_script(text: &str) -> Result<Vec<ControllerEvent>> {
    let mut parser = ScriptParser::new();
    let mut events = Vec::new();
    for line in text.lines() {
        events.extend(parser.feed(line)?);
    }
    events.extend(parser.finish());
    Ok(events)
}

// ── key=value fields ──────────────────────────────────────────────────────

struct Fields<'a> {
    values: HashMap<&'a str, &'a str>,
    line:   usize,
}

impl<'a> Fields<'a> {
    fn parse(words: impl Iterator<Item = &'a str>, line: usize) -> Result<Self> {
        let mut values = HashMap::new();
        for word in words {
            let (key, value) = word.split_once('=').ok_or_else(|| Error::Script {
                line,
                message: format!("expected key=value, got \"{word}\""),
            })?;
            if values.insert(key, value).is_some() {
                return Err(Error::Script { line, message: format!("duplicate field {key}") });
            }
        }
        Ok(Fields { values, line })
    }

    fn err(&self, message: String) -> Error {
        Error::Script { line: self.line, message }
    }

    fn opt<T: std::str::FromStr>(&mut self, key: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.values.remove(key) {
            None    => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|e| self.err(format!("{key}: {e}"))),
        }
    }

    fn req<T: std::str::FromStr>(&mut self, key: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        self.opt(key)?.ok_or_else(|| self.err(format!("missing {key}=")))
    }

    fn opt_i64(&mut self, key: &str) -> Result<Option<i64>> {
        self.opt(key)
    }

    fn opt_vector(&mut self, key: &str) -> Result<Vector> {
        Ok(self.opt(key)?.unwrap_or(Vector::ZERO))
    }

    /// Reject leftover keys so typos don't pass silently.
    fn finish(&self) -> Result<()> {
        let mut extra: Vec<&str> = self.values.keys().copied().collect();
        if extra.is_empty() { return Ok(()); }
        extra.sort_unstable();
        Err(self.err(format!("unexpected field(s): {}", extra.join(", "))))
    }
}

fn parse_hand(fields: &mut Fields<'_>, default_id: i32) -> Result<Hand> {
    let id: i32       = fields.opt("id")?.unwrap_or(default_id);
    let palm_position: Vector = fields.req("palm")?;
    let palm_normal   = fields.opt_vector("normal")?;
    let direction     = fields.opt_vector("direction")?;
    let tips: Option<String> = fields.opt("tips")?;
    fields.finish()?;

    let mut fingers = Vec::new();
    for (i, tip) in tips.iter().flat_map(|t| t.split(';')).enumerate() {
        let tip_position: Vector = tip.parse().map_err(|e| fields.err(format!("tips: {e}")))?;
        let finger_id = i32::try_from(i)
            .ok()
            .and_then(|i| id.checked_mul(10)?.checked_add(i))
            .ok_or_else(|| fields.err(format!("hand id {id} is too large for finger ids")))?;
        fingers.push(Finger { id: finger_id, tip_position, direction });
    }
    Ok(Hand { id, palm_position, palm_normal, direction, fingers })
}

fn parse_gesture(keyword: &str, fields: &mut Fields<'_>) -> Result<GestureEvent> {
    let id: i32 = fields.req("id")?;
    let state: Option<GestureState> = fields.opt("state")?;
    let discrete_state = state.unwrap_or(GestureState::Stop);

    let event = match keyword {
        "swipe" => {
            let direction: Vector = fields.req("direction")?;
            let position = fields.opt_vector("position")?;
            let speed: f32 = fields.opt("speed")?.unwrap_or(0.0);
            let state = state.ok_or_else(|| fields.err("missing state=".into()))?;
            GestureEvent { id, state, direction, position, detail: GestureDetail::Swipe { speed } }
        }
        "circle" => {
            let progress: f32 = fields.req("progress")?;
            let radius: f32   = fields.opt("radius")?.unwrap_or(0.0);
            let normal        = fields.opt_vector("normal")?;
            let direction     = fields.opt_vector("direction")?;
            let position      = fields.opt_vector("center")?;
            let state = state.ok_or_else(|| fields.err("missing state=".into()))?;
            GestureEvent {
                id,
                state,
                direction,
                position,
                detail: GestureDetail::Circle { progress, radius, normal },
            }
        }
        _ => {
            let direction = fields.opt_vector("direction")?;
            let position  = fields.opt_vector("position")?;
            let detail = if keyword == "screen_tap" {
                GestureDetail::ScreenTap
            } else {
                GestureDetail::KeyTap
            };
            GestureEvent { id, state: discrete_state, direction, position, detail }
        }
    };
    fields.finish()?;
    Ok(event)
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptGestureSource
// ════════════════════════════════════════════════════════════════════════════

enum ScriptInput {
    /// Parsed up front (files, inline text).
    Parsed(Vec<ControllerEvent>),
    /// Parsed line by line as it arrives (stdin).  Bad lines are logged and
    /// skipped.
    Stream(Box<dyn BufRead + Send>),
}

/// Gesture source that replays a script.
pub struct ScriptGestureSource {
    input: ScriptInput,
    /// Delay after each frame.
    pace:  Duration,
}

impl ScriptGestureSource {
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(Self::from_events(parse_script(text)?))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text)
    }

    pub fn from_events(events: Vec<ControllerEvent>) -> Self {
        ScriptGestureSource { input: ScriptInput::Parsed(events), pace: Duration::ZERO }
    }

    pub fn from_reader<R: io::Read + Send + 'static>(reader: R) -> Self {
        ScriptGestureSource {
            input: ScriptInput::Stream(Box::new(BufReader::new(reader))),
            pace:  Duration::ZERO,
        }
    }

    pub fn stdin() -> Self {
        Self::from_reader(io::stdin())
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Number of events known up front (0 for streamed input).
    pub fn len(&self) -> usize {
        match &self.input {
            ScriptInput::Parsed(events) => events.len(),
            ScriptInput::Stream(_)      => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Send one event, pausing after frames.  False once the receiver is gone.
fn send_paced(tx: &Sender<ControllerEvent>, pace: Duration, event: ControllerEvent) -> bool {
    let is_frame = matches!(event, ControllerEvent::Frame(_));
    if tx.send(event).is_err() { return false; }
    if is_frame && !pace.is_zero() {
        thread::sleep(pace);
    }
    true
}

impl GestureSource for ScriptGestureSource {
    fn run(self: Box<Self>, tx: Sender<ControllerEvent>) {
        let ScriptGestureSource { input, pace } = *self;
        let reader = match input {
            ScriptInput::Parsed(events) => {
                for event in events {
                    if !send_paced(&tx, pace, event) { return; }
                }
                return;
            }
            ScriptInput::Stream(reader) => reader,
        };

        let mut parser = ScriptParser::new();
        for line in reader.lines() {
            let line = match line {
                Ok(l)  => l,
                Err(e) => { warn!("Script input error: {}", e); break; }
            };
            match parser.feed(&line) {
                Ok(events) => {
                    for event in events {
                        if !send_paced(&tx, pace, event) { return; }
                    }
                }
                Err(e) => warn!("Skipping {}", e),
            }
        }
        if let Some(event) = parser.finish() {
            send_paced(&tx, pace, event);
        }
        debug!("Script input exhausted");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureKind;
    use std::sync::mpsc;

    fn frames(events: &[ControllerEvent]) -> Vec<&Frame> {
        events.iter().filter_map(|e| match e {
            ControllerEvent::Frame(f) => Some(f),
            _ => None,
        }).collect()
    }

    #[test]
    fn parses_full_example() {
        let events = parse_script(
            "# demo\n\
             connect\n\
             frame id=1 timestamp=16000\n\
             hand id=1 palm=0,180,0 tips=-20,210,5;0,220,0;20,215,5\n\
             swipe id=4 state=stop direction=-1,0,0 speed=1400\n\
             screen_tap id=5\n\
             circle id=6 state=update progress=1.25 radius=30 normal=0,0,-1 direction=0,0,-1\n\
             key_tap id=7 position=0,150,20 direction=0,-1,0\n\
             disconnect\n",
        )
        .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ControllerEvent::Connect);
        assert_eq!(events[2], ControllerEvent::Disconnect);

        let f = frames(&events)[0];
        assert_eq!((f.id, f.timestamp), (1, 16000));
        assert_eq!(f.hands[0].fingers.len(), 3);
        assert_eq!(f.hands[0].fingers[1].tip_position, Vector::new(0.0, 220.0, 0.0));
        let kinds: Vec<GestureKind> = f.gestures.iter().map(|g| g.kind()).collect();
        assert_eq!(
            kinds,
            [GestureKind::Swipe, GestureKind::ScreenTap, GestureKind::Circle, GestureKind::KeyTap]
        );
        assert_eq!(f.gestures[0].direction, Vector::new(-1.0, 0.0, 0.0));
        assert_eq!(f.gestures[1].state, GestureState::Stop);
        assert_eq!(
            f.gestures[2].detail,
            GestureDetail::Circle { progress: 1.25, radius: 30.0, normal: Vector::new(0.0, 0.0, -1.0) }
        );
    }

    #[test]
    fn gestures_open_implicit_frames() {
        let events = parse_script(
            "swipe id=1 state=start direction=1,0,0\n\
             \n\
             swipe id=1 state=stop direction=1,0,0\n",
        )
        .unwrap();
        let f = frames(&events);
        assert_eq!(f.len(), 2);
        assert_eq!((f[0].id, f[1].id), (1, 2));
    }

    #[test]
    fn frame_ids_continue_after_explicit_id() {
        let events = parse_script("frame id=40\nframe\nscreen_tap id=1\n").unwrap();
        let ids: Vec<i64> = frames(&events).iter().map(|f| f.id).collect();
        assert_eq!(ids, [40, 41]);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_script("connect\n\nswipe id=1 direction=1,0,0\n").unwrap_err();
        assert!(matches!(err, Error::Script { line: 3, .. }), "{err}");

        let err = parse_script("wave id=1\n").unwrap_err();
        assert!(err.to_string().contains("unknown keyword"));

        let err = parse_script("screen_tap id=1 positon=0,0,0\n").unwrap_err();
        assert!(err.to_string().contains("positon"));

        let err = parse_script("circle id=2 state=start\n").unwrap_err();
        assert!(err.to_string().contains("progress"));

        let err = parse_script("swipe id=x state=stop\n").unwrap_err();
        assert!(matches!(err, Error::Script { line: 1, .. }));

        let err = parse_script("hand tips=1,2,3\n").unwrap_err();
        assert!(err.to_string().contains("palm"));
    }

    #[test]
    fn parser_recovers_after_bad_line() {
        let mut parser = ScriptParser::new();
        assert!(parser.feed("swipe id=1 state=stop direction=oops").is_err());
        assert!(parser.feed("screen_tap id=2").unwrap().is_empty());
        match parser.finish() {
            Some(ControllerEvent::Frame(f)) => assert_eq!(f.gestures.len(), 1),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_ids_are_errors() {
        let err = parse_script("hand id=300000000 palm=0,0,0 tips=1,1,1\n").unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");

        let err = parse_script("frame id=9223372036854775807\n").unwrap_err();
        assert!(matches!(err, Error::Script { line: 1, .. }), "{err}");

        // Largest id that still has a successor.
        let events = parse_script("frame id=9223372036854775806\nscreen_tap id=1\n").unwrap();
        assert_eq!(frames(&events)[0].id, i64::MAX - 1);
    }

    #[test]
    fn parser_survives_out_of_range_ids() {
        let mut parser = ScriptParser::new();
        assert!(parser.feed("frame id=9223372036854775807").is_err());
        assert!(parser.feed("hand id=300000000 palm=0,0,0 tips=1,1,1").is_err());
        assert!(parser.feed("screen_tap id=2").unwrap().is_empty());
        match parser.finish() {
            Some(ControllerEvent::Frame(f)) => assert_eq!((f.id, f.gestures.len()), (1, 1)),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn bad_hand_line_opens_no_frame() {
        let mut parser = ScriptParser::new();
        assert!(parser.feed("hand tips=1,2,3").is_err());
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = parse_script("swipe id=1 id=2 state=stop direction=1,0,0\n").unwrap_err();
        assert!(err.to_string().contains("duplicate field id"), "{err}");
    }

    #[test]
    fn streamed_input_skips_bad_lines() {
        let text = "connect\nbogus\nscreen_tap id=3\n";
        let source = ScriptGestureSource::from_reader(io::Cursor::new(text.as_bytes().to_vec()));
        assert!(source.is_empty());
        let (tx, rx) = mpsc::channel();
        Box::new(source).run(tx);
        let events: Vec<ControllerEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ControllerEvent::Connect);
        assert_eq!(frames(&events)[0].gestures[0].id, 3);
    }

    #[test]
    fn parsed_source_replays_everything() {
        let source = ScriptGestureSource::from_text("connect\nscreen_tap id=1\ndisconnect\n").unwrap();
        assert_eq!(source.len(), 3);
        let (tx, rx) = mpsc::channel();
        Box::new(source).run(tx);
        assert_eq!(rx.iter().count(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScriptGestureSource::from_path(Path::new("/nonexistent/leap.script"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io { .. }));
    }
}
