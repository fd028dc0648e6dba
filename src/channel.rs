//! Moves button transitions from whoever reads the keyboard to the simulated
//! input pins.
//!
//! Two strategies, picked once at startup:
//!
//! * inline: the host loop and the simulation share a thread, so a
//!   transition is written to the pin straight away
//! * queued: the host owns an [`EventSender`] on its own thread; transitions
//!   go through a bounded queue that the scheduler drains between bursts
//!
//! Both debounce: reporting the state a button is already in does nothing,
//! so the simulation never sees the same edge twice.

use crate::input::{Button, BUTTON_COUNT};
use crate::machine::{Pin, Simulator};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, warn};

/// a button changed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    pub button: Button,
    pub pressed: bool,
}

/// outcome of a `notify`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// already in that state
    Unchanged,
    /// written to the pin
    Applied,
    /// on the queue, waiting for the next drain
    Queued,
    /// queue was full
    Dropped,
}

#[derive(Debug, Clone, Copy)]
pub struct InputLine {
    pub button: Button,
    pub pin: Pin,
    pub pressed: bool,
}

/// the simulated side of every button
#[derive(Debug, Clone)]
pub struct InputLines {
    lines: [InputLine; BUTTON_COUNT],
}

impl InputLines {
    pub fn new() -> Self {
        InputLines {
            lines: Button::ALL.map(|button| InputLine {
                button,
                pin: button.pin(),
                pressed: false,
            }),
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.lines[button.index()].pressed
    }

    /// Drive every pin to its released level. Buttons are active-low with
    /// pull-ups, so released is high.
    pub fn pull_up(&self, sim: &mut impl Simulator) {
        for line in &self.lines {
            sim.raise_input_line(line.pin, !line.pressed);
        }
    }

    /// write `event` to its pin; false if it isn't a transition
    pub fn apply(&mut self, event: PendingEvent, sim: &mut impl Simulator) -> bool {
        let line = &mut self.lines[event.button.index()];
        if line.pressed == event.pressed {
            return false;
        }
        line.pressed = event.pressed;
        debug!(button = line.button.name(), pressed = event.pressed, "input line");
        sim.raise_input_line(line.pin, !event.pressed);
        true
    }
}

impl Default for InputLines {
    fn default() -> Self {
        Self::new()
    }
}

/// Strategy chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Inline,
    Queued { capacity: usize },
}

/// consumer end, owned by the scheduler
pub struct EventChannel {
    lines: InputLines,
    queue: Option<Receiver<PendingEvent>>,
}

impl EventChannel {
    pub fn inline() -> Self {
        EventChannel {
            lines: InputLines::new(),
            queue: None,
        }
    }

    /// a queued channel and the producer handle to give to the host thread
    pub fn queued(capacity: usize) -> (Self, EventSender) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let channel = EventChannel {
            lines: InputLines::new(),
            queue: Some(rx),
        };
        (channel, EventSender::new(tx))
    }

    pub fn with_strategy(strategy: Strategy) -> (Self, Option<EventSender>) {
        match strategy {
            Strategy::Inline => (Self::inline(), None),
            Strategy::Queued { capacity } => {
                let (channel, sender) = Self::queued(capacity);
                (channel, Some(sender))
            }
        }
    }

    pub fn is_queued(&self) -> bool {
        self.queue.is_some()
    }

    pub fn lines(&self) -> &InputLines {
        &self.lines
    }

    /// Inline delivery. Only valid from the thread that runs the simulation;
    /// on a queued channel the host must go through its [`EventSender`].
    pub fn notify(&mut self, button: Button, pressed: bool, sim: &mut impl Simulator) -> Notify {
        debug_assert!(self.queue.is_none(), "inline notify on a queued channel");
        if self.lines.apply(PendingEvent { button, pressed }, sim) {
            Notify::Applied
        } else {
            Notify::Unchanged
        }
    }

    /// apply everything queued so far, oldest first; returns how many edges hit a pin
    pub fn drain(&mut self, sim: &mut impl Simulator) -> usize {
        let Some(queue) = &self.queue else {
            return 0;
        };
        let mut edges = 0;
        for event in queue.try_iter() {
            if self.lines.apply(event, &mut *sim) {
                edges += 1;
            }
        }
        edges
    }
}

/// producer end of a queued channel; lives on the host thread
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PendingEvent>,
    // last state successfully handed to the queue
    mirror: [bool; BUTTON_COUNT],
    dropped: u64,
}

impl EventSender {
    fn new(tx: Sender<PendingEvent>) -> Self {
        EventSender {
            tx,
            mirror: [false; BUTTON_COUNT],
            dropped: 0,
        }
    }

    /// Never blocks. When the queue is full the event is dropped and the
    /// debounce state is left alone, so the host's next report of the same
    /// state tries again.
    pub fn notify(&mut self, button: Button, pressed: bool) -> Notify {
        let known = &mut self.mirror[button.index()];
        if *known == pressed {
            return Notify::Unchanged;
        }
        match self.tx.try_send(PendingEvent { button, pressed }) {
            Ok(()) => {
                *known = pressed;
                Notify::Queued
            }
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(
                    button = button.name(),
                    pressed,
                    dropped = self.dropped,
                    "input queue full, dropping event"
                );
                Notify::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(button = button.name(), "simulation gone, event discarded");
                Notify::Dropped
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
