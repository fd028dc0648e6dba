use crate::machine::Pin;
use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

/// the board's six controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
}

pub const BUTTON_COUNT: usize = 6;

impl Button {
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::Up => "btn.up",
            Button::Down => "btn.down",
            Button::Left => "btn.left",
            Button::Right => "btn.right",
            Button::A => "btn.a",
            Button::B => "btn.b",
        }
    }

    /// where the button is wired on the ATmega32u4
    pub fn pin(self) -> Pin {
        match self {
            Button::Up => Pin::new('F', 7),
            Button::Down => Pin::new('F', 4),
            Button::Left => Pin::new('F', 5),
            Button::Right => Pin::new('F', 6),
            Button::A => Pin::new('E', 6),
            Button::B => Pin::new('B', 4),
        }
    }
}

/// what the host loop should do about a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Button(Button, bool),
    Quit,
}

const ARDUBOY_KEYMAP: [(KeyCode, Button); 6] = [
    (KeyCode::Up, Button::Up),
    (KeyCode::Down, Button::Down),
    (KeyCode::Left, Button::Left),
    (KeyCode::Right, Button::Right),
    (KeyCode::Char('z'), Button::A),
    (KeyCode::Char('x'), Button::B),
];

/// reads key transitions from the host
pub trait Input {
    /// Collect whatever happened since the last call, waiting at most
    /// `timeout` for the first event.
    fn poll_events(&mut self, timeout: Duration, out: &mut Vec<HostEvent>) -> Result<(), io::Error>;
}

/// Turns a stream of key presses (and auto-repeats) into press/release pairs.
///
/// Terminals only report presses. A key counts as held for as long as it
/// keeps being reported, and is released once it has been quiet for
/// `release_after`.
#[derive(Debug)]
pub struct HoldTracker {
    release_after: Duration,
    last_seen: [Option<Instant>; BUTTON_COUNT],
}

impl HoldTracker {
    pub fn new(release_after: Duration) -> Self {
        HoldTracker {
            release_after,
            last_seen: [None; BUTTON_COUNT],
        }
    }

    pub fn press(&mut self, button: Button, now: Instant, out: &mut Vec<HostEvent>) {
        if self.last_seen[button.index()].replace(now).is_none() {
            out.push(HostEvent::Button(button, true));
        }
    }

    pub fn expire(&mut self, now: Instant, out: &mut Vec<HostEvent>) {
        for button in Button::ALL {
            let seen = &mut self.last_seen[button.index()];
            if let Some(t) = *seen {
                if now.duration_since(t) >= self.release_after {
                    *seen = None;
                    out.push(HostEvent::Button(button, false));
                }
            }
        }
    }
}

/// keyboard input from the controlling terminal, via crossterm
pub struct KeyboardInput {
    keymap: HashMap<KeyCode, Button>,
    holds: HoldTracker,
}

impl KeyboardInput {
    pub fn new(release_after: Duration) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(KeyboardInput {
            keymap: HashMap::from(ARDUBOY_KEYMAP),
            holds: HoldTracker::new(release_after),
        })
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for KeyboardInput {
    fn poll_events(&mut self, timeout: Duration, out: &mut Vec<HostEvent>) -> Result<(), io::Error> {
        let mut wait = timeout;
        while poll(wait)? {
            wait = Duration::ZERO;
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Char('q') | KeyCode::Esc => out.push(HostEvent::Quit),
                    code => match self.keymap.get(&code) {
                        Some(&button) => self.holds.press(button, Instant::now(), out),
                        None => debug!(?code, "unmapped key"),
                    },
                }
            }
        }
        self.holds.expire(Instant::now(), out);
        Ok(())
    }
}

/// scripted Input for tests: hands out one batch per poll
pub struct DummyInput {
    batches: Vec<Vec<HostEvent>>,
}

impl DummyInput {
    pub fn new(mut batches: Vec<Vec<HostEvent>>) -> Self {
        batches.reverse();
        DummyInput { batches }
    }
}

impl Input for DummyInput {
    fn poll_events(&mut self, _timeout: Duration, out: &mut Vec<HostEvent>) -> Result<(), io::Error> {
        if let Some(batch) = self.batches.pop() {
            out.extend(batch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_index_in_order() {
        for (i, b) in Button::ALL.iter().enumerate() {
            assert_eq!(b.index(), i);
        }
    }

    #[test]
    fn test_wiring() {
        assert_eq!(Button::Up.pin(), Pin::new('F', 7));
        assert_eq!(Button::B.pin(), Pin::new('B', 4));
        assert_eq!(Button::A.name(), "btn.a");
    }

    #[test]
    fn test_repeats_are_one_press() {
        let mut h = HoldTracker::new(Duration::from_millis(100));
        let mut out = Vec::new();
        let t0 = Instant::now();
        h.press(Button::Left, t0, &mut out);
        h.press(Button::Left, t0 + Duration::from_millis(30), &mut out);
        h.expire(t0 + Duration::from_millis(60), &mut out);
        h.press(Button::Left, t0 + Duration::from_millis(90), &mut out);
        assert_eq!(out, vec![HostEvent::Button(Button::Left, true)]);
    }

    #[test]
    fn test_release_after_quiet_period() {
        let mut h = HoldTracker::new(Duration::from_millis(100));
        let mut out = Vec::new();
        let t0 = Instant::now();
        h.press(Button::A, t0, &mut out);
        h.press(Button::B, t0 + Duration::from_millis(50), &mut out);
        h.expire(t0 + Duration::from_millis(120), &mut out);
        assert_eq!(
            out,
            vec![
                HostEvent::Button(Button::A, true),
                HostEvent::Button(Button::B, true),
                HostEvent::Button(Button::A, false),
            ]
        );
        out.clear();
        h.expire(t0 + Duration::from_millis(200), &mut out);
        assert_eq!(out, vec![HostEvent::Button(Button::B, false)]);
    }

    #[test]
    fn test_dummy_input_batches() -> Result<(), io::Error> {
        let mut i = DummyInput::new(vec![vec![HostEvent::Quit], vec![]]);
        let mut out = Vec::new();
        i.poll_events(Duration::ZERO, &mut out)?;
        assert_eq!(out, vec![HostEvent::Quit]);
        i.poll_events(Duration::ZERO, &mut out)?;
        i.poll_events(Duration::ZERO, &mut out)?;
        assert_eq!(out.len(), 1);
        Ok(())
    }
}
