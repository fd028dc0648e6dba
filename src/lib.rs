//! # arduboy
//!
//! Terminal frontend for a cycle-accurate Arduboy (ATmega32u4 @ 16MHz,
//! 128x64 SSD1306) that keeps the simulation in step with the wall clock.
//!
//! ## Design
//!
//! * the instruction-level core and the display controller are somebody
//!   else's problem; they sit behind the `Simulator` and `DisplayController`
//!   traits
//! * simulation runs in bursts of a fixed number of cycles; between bursts
//!   the scheduler sleeps off any lead over real time, so simulated time never
//!   races ahead but can fall behind on a slow host
//! * periodic work is keyed on the cycle counter, not on wall time:
//!    - every 7572us (one SSD1306 refresh) the afterglow model samples the
//!      panel
//!    - every 12 of those the terminal is redrawn and the host gets control
//! * the terminal can't keep up with the panel, so pixels are integrated into
//!   a luminance grid that ramps up fast and fades slower
//! * input either goes straight to the pins (one thread) or over a bounded
//!   queue drained between bursts (simulation on its own thread)
//!
//! Model
//!
//! main
//!  |-- Args -> SchedulerConfig, Strategy
//!  |-- DemoBoard (Simulator + DisplayController)
//!  |-- ExecutionScheduler(board, EventChannel, FrameHandoff)
//!  |    `-- step()
//!  |         |-- channel.drain()            // queued input, oldest first
//!  |         |-- board.run_burst(n)
//!  |         |-- sync.sleep_until(cycle)    // throttle to wall clock
//!  |         `-- for each due timer: fire once, reschedule
//!  `-- host loop (cooperative or threaded)
//!       |-- KeyboardInput -> on_input_event / EventSender
//!       `-- Presenter: FrameHandoff -> TermSurface
pub mod channel;
pub mod clock;
pub mod config;
pub mod demo;
pub mod display;
pub mod error;
pub mod host;
pub mod input;
pub mod machine;
pub mod persistence;
pub mod scheduler;
