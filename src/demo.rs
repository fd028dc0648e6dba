//! A stand-in board so the frontend has something to run without a real
//! instruction-level core.
//!
//! The "firmware" runs a 60Hz game loop: the directional buttons move a
//! cursor, a ball bounces around leaving an afterglow trail, A toggles display
//! inversion and B toggles a block that strobes far faster than the terminal
//! redraws (it should read as a steady grey, not flicker).

use crate::input::{Button, BUTTON_COUNT};
use crate::machine::{Burst, CpuState, DisplayController, DisplayFlag, Pin, Simulator};
use std::collections::HashMap;

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
const PAGES: usize = HEIGHT / 8;

const CURSOR: usize = 6;
const BALL: usize = 3;
const STROBE: (usize, usize, usize) = (100, 8, 16);

pub struct DemoBoard {
    frequency_hz: u64,
    cycle: u64,
    halt_at: Option<u64>,
    frame_period: u64,
    strobe_period: u64,
    next_frame: u64,
    next_strobe: u64,

    pins: HashMap<Pin, bool>,
    // button state as of the previous game frame, for edge detection
    previous: [bool; BUTTON_COUNT],

    vram: [u8; WIDTH * PAGES],
    inverted: bool,
    strobing: bool,
    strobe_lit: bool,
    cursor: (usize, usize),
    ball: (usize, usize),
    velocity: (isize, isize),
}

impl DemoBoard {
    pub fn new(frequency_hz: u64) -> Self {
        let frame_period = (frequency_hz / 60).max(1);
        let strobe_period = (frequency_hz / 1000).max(1);
        DemoBoard {
            frequency_hz,
            cycle: 0,
            halt_at: None,
            frame_period,
            strobe_period,
            next_frame: frame_period,
            next_strobe: strobe_period,
            pins: HashMap::new(),
            previous: [false; BUTTON_COUNT],
            vram: [0; WIDTH * PAGES],
            inverted: false,
            strobing: false,
            strobe_lit: false,
            cursor: (WIDTH / 2, HEIGHT / 2),
            ball: (10, 10),
            velocity: (1, 1),
        }
    }

    /// stop with `CpuState::Done` once this many cycles have run
    pub fn halt_after(mut self, cycles: u64) -> Self {
        self.halt_at = Some(cycles);
        self
    }

    /// buttons read low when pressed; an undriven pin floats high
    fn pressed(&self, button: Button) -> bool {
        !self.pins.get(&button.pin()).copied().unwrap_or(true)
    }

    fn game_frame(&mut self) {
        let now = Button::ALL.map(|b| self.pressed(b));
        let edge = |b: Button| now[b.index()] && !self.previous[b.index()];
        if edge(Button::A) {
            self.inverted = !self.inverted;
        }
        if edge(Button::B) {
            self.strobing = !self.strobing;
        }
        self.previous = now;

        let (mut x, mut y) = self.cursor;
        if now[Button::Left.index()] {
            x = x.saturating_sub(1);
        }
        if now[Button::Right.index()] {
            x = (x + 1).min(WIDTH - CURSOR);
        }
        if now[Button::Up.index()] {
            y = y.saturating_sub(1);
        }
        if now[Button::Down.index()] {
            y = (y + 1).min(HEIGHT - CURSOR);
        }
        self.cursor = (x, y);

        let (bx, by) = self.ball;
        let (mut vx, mut vy) = self.velocity;
        if (bx == 0 && vx < 0) || (bx + BALL >= WIDTH && vx > 0) {
            vx = -vx;
        }
        if (by == 0 && vy < 0) || (by + BALL >= HEIGHT && vy > 0) {
            vy = -vy;
        }
        self.velocity = (vx, vy);
        self.ball = ((bx as isize + vx) as usize, (by as isize + vy) as usize);

        self.render();
    }

    fn render(&mut self) {
        self.vram.fill(0);
        let (cx, cy) = self.cursor;
        self.fill(cx, cy, CURSOR, CURSOR, true);
        let (bx, by) = self.ball;
        self.fill(bx, by, BALL, BALL, true);
        let (sx, sy, side) = STROBE;
        self.fill(sx, sy, side, side, self.strobing && self.strobe_lit);
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize, on: bool) {
        for py in y..(y + h).min(HEIGHT) {
            for px in x..(x + w).min(WIDTH) {
                let byte = &mut self.vram[(py / 8) * WIDTH + px];
                let bit = 1 << (py % 8);
                if on {
                    *byte |= bit;
                } else {
                    *byte &= !bit;
                }
            }
        }
    }
}

impl Simulator for DemoBoard {
    fn run_burst(&mut self, max_cycles: u64) -> Burst {
        let start = self.cycle;
        let mut end = start + max_cycles;
        if let Some(h) = self.halt_at {
            end = end.min(h.max(start));
        }
        loop {
            let next = self.next_frame.min(self.next_strobe);
            if next > end {
                break;
            }
            self.cycle = next;
            if next == self.next_strobe {
                self.next_strobe += self.strobe_period;
                self.strobe_lit = !self.strobe_lit;
                let (sx, sy, side) = STROBE;
                let lit = self.strobing && self.strobe_lit;
                self.fill(sx, sy, side, side, lit);
            }
            if next == self.next_frame {
                self.next_frame += self.frame_period;
                self.game_frame();
            }
        }
        self.cycle = end;
        let state = match self.halt_at {
            Some(h) if end >= h => CpuState::Done,
            _ => CpuState::Running,
        };
        Burst {
            cycles: end - start,
            state,
        }
    }

    fn current_cycle(&self) -> u64 {
        self.cycle
    }

    fn raise_input_line(&mut self, pin: Pin, level: bool) {
        self.pins.insert(pin, level);
    }

    fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }
}

impl DisplayController for DemoBoard {
    fn size(&self) -> (usize, usize) {
        (WIDTH, HEIGHT)
    }

    fn read_pixel_grid(&self) -> &[u8] {
        &self.vram
    }

    fn read_flag(&self, flag: DisplayFlag) -> bool {
        match flag {
            DisplayFlag::DisplayOn => true,
            DisplayFlag::Inverted => self.inverted,
            DisplayFlag::SegmentRemap | DisplayFlag::ComScanReversed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MHZ_16: u64 = 16_000_000;

    fn lit(board: &DemoBoard, x: usize, y: usize) -> bool {
        board.vram[(y / 8) * WIDTH + x] >> (y % 8) & 1 == 1
    }

    fn press(board: &mut DemoBoard, button: Button, pressed: bool) {
        board.raise_input_line(button.pin(), !pressed);
    }

    fn frames(board: &mut DemoBoard, n: u64) {
        board.run_burst(board.frame_period * n);
    }

    #[test]
    fn test_burst_runs_requested_cycles() {
        let mut b = DemoBoard::new(MHZ_16);
        let burst = b.run_burst(1000);
        assert_eq!(burst, Burst { cycles: 1000, state: CpuState::Running });
        assert_eq!(b.current_cycle(), 1000);
    }

    #[test]
    fn test_halts_at_limit() {
        let mut b = DemoBoard::new(MHZ_16).halt_after(2_500);
        assert_eq!(b.run_burst(2_000).state, CpuState::Running);
        assert_eq!(b.run_burst(2_000), Burst { cycles: 500, state: CpuState::Done });
        assert_eq!(b.run_burst(2_000), Burst { cycles: 0, state: CpuState::Done });
        assert_eq!(b.current_cycle(), 2_500);
    }

    #[test]
    fn test_cursor_follows_held_button() {
        let mut b = DemoBoard::new(MHZ_16);
        frames(&mut b, 1);
        let (x, y) = b.cursor;
        assert!(lit(&b, x, y));
        press(&mut b, Button::Right, true);
        frames(&mut b, 5);
        press(&mut b, Button::Right, false);
        frames(&mut b, 5);
        assert_eq!(b.cursor, (x + 5, y));
    }

    #[test]
    fn test_a_toggles_inversion_once_per_press() {
        let mut b = DemoBoard::new(MHZ_16);
        press(&mut b, Button::A, true);
        frames(&mut b, 10);
        assert!(b.read_flag(DisplayFlag::Inverted));
        press(&mut b, Button::A, false);
        frames(&mut b, 1);
        press(&mut b, Button::A, true);
        frames(&mut b, 1);
        assert!(!b.read_flag(DisplayFlag::Inverted));
    }

    #[test]
    fn test_strobe_blinks_between_frames() {
        let mut b = DemoBoard::new(MHZ_16);
        press(&mut b, Button::B, true);
        frames(&mut b, 1);
        let (sx, sy, _) = STROBE;
        let mut seen = [false; 2];
        for _ in 0..4 {
            b.run_burst(b.strobe_period);
            seen[lit(&b, sx, sy) as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_grid_is_page_layout() {
        let b = DemoBoard::new(MHZ_16);
        assert_eq!(b.read_pixel_grid().len(), WIDTH * HEIGHT / 8);
    }
}
