//! The two ways of wiring the scheduler to a terminal.
//!
//! Cooperative: one thread polls the keyboard, runs the scheduler until it
//! yields, redraws, and goes round again. Threaded: the scheduler gets a
//! thread of its own and the host thread only moves keys one way and frames
//! the other.
//!
//! Quitting is process-level in both: the host loop returns and `main` exits,
//! taking a still-running simulation thread with it.

use crate::channel::EventSender;
use crate::display::Surface;
use crate::error::Error;
use crate::input::{HostEvent, Input};
use crate::machine::{CpuState, Machine};
use crate::persistence::{Frame, FrameHandoff};
use crate::scheduler::{ExecutionScheduler, HostSignal, Step};
use crossbeam_channel::TryRecvError;
use std::io;
use std::thread;
use std::time::Duration;
use tracing::info;

/// how long the threaded host waits on the keyboard before checking for frames
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// why the host loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Terminated(CpuState),
}

/// draws whatever the scheduler last published
pub struct Presenter<S: Surface> {
    surface: S,
    frames: FrameHandoff,
    frame: Frame,
}

impl<S: Surface> Presenter<S> {
    pub fn new(surface: S, frames: FrameHandoff) -> Self {
        Presenter {
            surface,
            frames,
            frame: Frame::default(),
        }
    }

    /// re-present the latest luminance grid
    pub fn on_redraw_ready(&mut self) -> Result<(), io::Error> {
        self.frames.copy_into(&mut self.frame);
        self.surface.draw(&self.frame)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

pub fn run_cooperative<M, I, S>(
    scheduler: &mut ExecutionScheduler<M>,
    input: &mut I,
    presenter: &mut Presenter<S>,
) -> Result<Exit, Error>
where
    M: Machine,
    I: Input,
    S: Surface,
{
    let mut events = Vec::new();
    loop {
        events.clear();
        input.poll_events(Duration::ZERO, &mut events)?;
        for &event in &events {
            match event {
                HostEvent::Quit => return Ok(Exit::Quit),
                HostEvent::Button(button, pressed) => {
                    scheduler.on_input_event(button, pressed);
                }
            }
        }
        match scheduler.on_idle() {
            Step::Continue => {}
            Step::Yield => presenter.on_redraw_ready()?,
            Step::Terminated(state) => return Ok(Exit::Terminated(state)),
        }
    }
}

pub fn run_threaded<M, I, S>(
    mut scheduler: ExecutionScheduler<M>,
    mut sender: EventSender,
    input: &mut I,
    presenter: &mut Presenter<S>,
) -> Result<Exit, Error>
where
    M: Machine + Send + 'static,
    I: Input,
    S: Surface,
{
    // FrameReady coalesces, so a small queue is plenty
    let (signals, host) = crossbeam_channel::bounded(2);
    let sim = thread::Builder::new()
        .name("simulation".into())
        .spawn(move || scheduler.run_until_terminated(&signals))?;

    let mut events = Vec::new();
    loop {
        events.clear();
        input.poll_events(POLL_INTERVAL, &mut events)?;
        for &event in &events {
            match event {
                HostEvent::Quit => {
                    info!(dropped_input = sender.dropped(), "quit requested");
                    return Ok(Exit::Quit);
                }
                HostEvent::Button(button, pressed) => {
                    sender.notify(button, pressed);
                }
            }
        }

        let mut redraw = false;
        loop {
            match host.try_recv() {
                Ok(HostSignal::FrameReady) => redraw = true,
                Ok(HostSignal::Terminated(state)) => {
                    if redraw {
                        presenter.on_redraw_ready()?;
                    }
                    sim.join().map_err(|_| Error::SimulationPanicked)?;
                    return Ok(Exit::Terminated(state));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(Error::SimulationPanicked),
            }
        }
        // several signals in one go still only need the newest frame
        if redraw {
            presenter.on_redraw_ready()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::EventChannel;
    use crate::config::SchedulerConfig;
    use crate::demo::DemoBoard;
    use crate::display::DummySurface;
    use crate::input::{Button, DummyInput};
    use crate::machine::Simulator;

    const MHZ_16: u64 = 16_000_000;

    fn config() -> SchedulerConfig {
        let mut c = SchedulerConfig::from_micros(MHZ_16, 1000, 7572, 90_864).unwrap();
        c.throttle = false;
        c
    }

    fn board(redraws: u64) -> DemoBoard {
        // halt a little after the last redraw
        DemoBoard::new(MHZ_16).halt_after(redraws * 12 * 121_152 + 1_500)
    }

    #[test]
    fn test_cooperative_draws_every_yield_then_stops() -> Result<(), Error> {
        let frames = FrameHandoff::new();
        let mut s = ExecutionScheduler::new(board(3), EventChannel::inline(), config(), frames.clone())?;
        let mut input = DummyInput::new(vec![vec![HostEvent::Button(Button::Right, true)]]);
        let mut p = Presenter::new(DummySurface::new(), frames);

        let exit = run_cooperative(&mut s, &mut input, &mut p)?;
        assert_eq!(exit, Exit::Terminated(CpuState::Done));
        assert_eq!(p.surface().frames.len(), 3);
        assert_eq!(s.stats().redraws, 3);
        assert_eq!(s.stats().input_edges, 1);
        let seqs: Vec<u64> = p.surface().frames.iter().map(|f| f.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_cooperative_quit_runs_nothing() -> Result<(), Error> {
        let frames = FrameHandoff::new();
        let mut s = ExecutionScheduler::new(board(3), EventChannel::inline(), config(), frames.clone())?;
        let mut input = DummyInput::new(vec![vec![HostEvent::Quit]]);
        let mut p = Presenter::new(DummySurface::new(), frames);

        assert_eq!(run_cooperative(&mut s, &mut input, &mut p)?, Exit::Quit);
        assert_eq!(s.machine().current_cycle(), 0);
        assert!(p.surface().frames.is_empty());
        Ok(())
    }

    #[test]
    fn test_threaded_runs_to_termination() -> Result<(), Error> {
        let frames = FrameHandoff::new();
        let (channel, sender) = EventChannel::queued(8);
        let s = ExecutionScheduler::new(board(3), channel, config(), frames.clone())?;
        let mut input = DummyInput::new(vec![vec![HostEvent::Button(Button::A, true)]]);
        let mut p = Presenter::new(DummySurface::new(), frames);

        let exit = run_threaded(s, sender, &mut input, &mut p)?;
        assert_eq!(exit, Exit::Terminated(CpuState::Done));
        let drawn = &p.surface().frames;
        assert!(!drawn.is_empty() && drawn.len() <= 3);
        assert!(drawn.windows(2).all(|w| w[0].sequence <= w[1].sequence));
        Ok(())
    }
}
