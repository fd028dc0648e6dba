//! # scheduler
//!
//! Runs the board in bounded bursts and keeps it honest against the wall
//! clock. Between bursts it:
//!
//!  * applies queued input
//!  * sleeps off any lead simulated time has over real time
//!  * fires periodic timers whose cycle deadline has passed: the afterglow
//!    update, and the redraw trigger that hands control back to the host
//!
//! Timers are only checked at burst boundaries, so each one can fire up to
//! `burst_cycles` late. A timer that has fallen a whole period or more behind
//! (a debugger pause, a stalled host) fires once and restarts its period from
//! the current cycle rather than firing repeatedly to catch up. Exactly one
//! period behind counts: the next accumulated deadline would already be due.

use crate::channel::{EventChannel, Notify};
use crate::clock::{Epoch, TimeSynchronizer};
use crate::config::SchedulerConfig;
use crate::error::ConfigError;
use crate::input::Button;
use crate::machine::{CpuState, DisplayFlag, Machine};
use crate::persistence::{FrameFlags, FrameHandoff, PersistenceBuffer};
use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdatePersistence,
    TriggerRedraw,
}

/// a periodic timer keyed on the simulated cycle counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub next_deadline: u64,
    pub period: u64,
    pub action: Action,
}

impl ScheduleEntry {
    /// first fires one period after `now`
    pub fn new(now: u64, period: u64, action: Action) -> Self {
        assert!(period > 0, "ScheduleEntry period must be at least one cycle");
        ScheduleEntry {
            next_deadline: now + period,
            period,
            action,
        }
    }

    pub fn is_due(&self, cycle: u64) -> bool {
        cycle >= self.next_deadline
    }

    /// Move the deadline on after firing at `cycle`. If `deadline + period`
    /// is already at or before `cycle` the period restarts from `cycle`.
    pub fn reschedule(&mut self, cycle: u64) {
        let next = self.next_deadline + self.period;
        self.next_deadline = if next <= cycle { cycle + self.period } else { next };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    YieldPending,
    Terminated(CpuState),
}

/// what a single `step` ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// a frame is ready; the host should redraw and service input
    Yield,
    Terminated(CpuState),
}

/// what the simulation thread tells the host thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    FrameReady,
    Terminated(CpuState),
}

/// how often each action has fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub bursts: u64,
    pub persistence_updates: u64,
    pub redraws: u64,
    pub input_edges: u64,
}

pub struct ExecutionScheduler<M: Machine> {
    machine: M,
    channel: EventChannel,
    persistence: PersistenceBuffer,
    timers: Vec<ScheduleEntry>,
    config: SchedulerConfig,
    sync: Option<TimeSynchronizer>,
    frames: FrameHandoff,
    state: State,
    stats: Stats,
}

impl<M: Machine> ExecutionScheduler<M> {
    /// Fails if the board's clock doesn't match the one used for pacing and
    /// timer periods.
    pub fn new(
        mut machine: M,
        channel: EventChannel,
        config: SchedulerConfig,
        frames: FrameHandoff,
    ) -> Result<Self, ConfigError> {
        let pacing = config.clock.frequency_hz();
        if machine.frequency_hz() != pacing {
            return Err(ConfigError::FrequencyMismatch {
                machine: machine.frequency_hz(),
                pacing,
            });
        }
        let (width, height) = machine.size();
        let now = machine.current_cycle();
        channel.lines().pull_up(&mut machine);
        Ok(ExecutionScheduler {
            persistence: PersistenceBuffer::new(width, height),
            timers: vec![
                ScheduleEntry::new(now, config.persistence_period, Action::UpdatePersistence),
                ScheduleEntry::new(now, config.redraw_period, Action::TriggerRedraw),
            ],
            machine,
            channel,
            config,
            sync: None,
            frames,
            state: State::Running,
            stats: Stats::default(),
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn persistence(&self) -> &PersistenceBuffer {
        &self.persistence
    }

    pub fn timers(&self) -> &[ScheduleEntry] {
        &self.timers
    }

    /// wall-clock origin, once the first throttled step has pinned it
    pub fn epoch(&self) -> Option<Epoch> {
        self.sync.as_ref().map(TimeSynchronizer::epoch)
    }

    /// run one burst and whatever timers it made due
    pub fn step(&mut self) -> Step {
        if let State::Terminated(s) = self.state {
            return Step::Terminated(s);
        }
        if self.config.throttle && self.sync.is_none() {
            // cycle zero is pinned to the first step, not to construction
            info!(
                frequency_hz = self.config.clock.frequency_hz(),
                burst_cycles = self.config.burst_cycles,
                queued_input = self.channel.is_queued(),
                "scheduler started"
            );
            self.sync = Some(TimeSynchronizer::new(self.config.clock, Epoch::now()));
        }

        self.drain_input();
        let burst = self.machine.run_burst(self.config.burst_cycles);
        self.stats.bursts += 1;
        if burst.state.is_terminal() {
            info!(state = ?burst.state, cycle = self.machine.current_cycle(), "simulation terminated");
            self.state = State::Terminated(burst.state);
            return Step::Terminated(burst.state);
        }

        let cycle = self.machine.current_cycle();
        if let Some(sync) = &self.sync {
            sync.sleep_until(cycle);
        }

        for i in 0..self.timers.len() {
            let entry = &mut self.timers[i];
            if !entry.is_due(cycle) {
                continue;
            }
            let action = entry.action;
            entry.reschedule(cycle);
            self.fire(action);
        }

        if self.state == State::YieldPending {
            self.drain_input();
            self.publish_frame();
            self.state = State::Running;
            return Step::Yield;
        }
        Step::Continue
    }

    fn fire(&mut self, action: Action) {
        match action {
            Action::UpdatePersistence => {
                self.persistence.update(
                    self.machine.read_pixel_grid(),
                    self.config.luma_decay,
                    self.config.luma_increase,
                );
                self.stats.persistence_updates += 1;
            }
            Action::TriggerRedraw => {
                self.stats.redraws += 1;
                self.state = State::YieldPending;
            }
        }
    }

    fn drain_input(&mut self) {
        self.stats.input_edges += self.channel.drain(&mut self.machine) as u64;
    }

    fn publish_frame(&self) {
        let flags = FrameFlags {
            display_on: self.machine.read_flag(DisplayFlag::DisplayOn),
            inverted: self.machine.read_flag(DisplayFlag::Inverted),
            mirror_x: self.machine.read_flag(DisplayFlag::SegmentRemap),
            mirror_y: self.machine.read_flag(DisplayFlag::ComScanReversed),
        };
        self.frames.publish(&self.persistence, flags);
    }

    /// Host idle hook for cooperative mode: simulate until the next redraw
    /// or until the board stops.
    pub fn on_idle(&mut self) -> Step {
        loop {
            match self.step() {
                Step::Continue => {}
                step => return step,
            }
        }
    }

    /// Host key hook for cooperative mode; the host and the simulation share
    /// this thread, so the pin is written immediately.
    pub fn on_input_event(&mut self, button: Button, pressed: bool) -> Notify {
        let notify = self.channel.notify(button, pressed, &mut self.machine);
        if notify == Notify::Applied {
            self.stats.input_edges += 1;
        }
        notify
    }

    /// Simulation thread body for threaded mode. Frame notifications coalesce:
    /// if the host hasn't picked up the last one there's no point queueing
    /// another, since it will read the newest frame anyway.
    pub fn run_until_terminated(&mut self, signals: &Sender<HostSignal>) -> CpuState {
        loop {
            match self.step() {
                Step::Continue => {}
                Step::Yield => match signals.try_send(HostSignal::FrameReady) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => {
                        debug!("host gone, simulation keeps running until process exit");
                    }
                },
                Step::Terminated(state) => {
                    let _ = signals.send(HostSignal::Terminated(state));
                    return state;
                }
            }
        }
    }
}
