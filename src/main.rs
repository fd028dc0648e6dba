use arduboy::channel::EventChannel;
use arduboy::config::{Args, SchedulerConfig};
use arduboy::demo::{self, DemoBoard};
use arduboy::display::TermSurface;
use arduboy::error::Error;
use arduboy::host::{self, Exit, Presenter};
use arduboy::input::KeyboardInput;
use arduboy::persistence::FrameHandoff;
use arduboy::scheduler::ExecutionScheduler;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Error> {
    // stdout belongs to the terminal UI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // bad settings are fatal before anything runs
    let args = Args::parse();
    let config = SchedulerConfig::try_from(&args)?;
    let strategy = args.strategy()?;

    let mut board = DemoBoard::new(config.clock.frequency_hz());
    if let Some(ms) = args.run_for_ms {
        board = board.halt_after(config.clock.usec_to_cycles(ms.saturating_mul(1000)));
    }

    let frames = FrameHandoff::new();
    let (channel, sender) = EventChannel::with_strategy(strategy);
    let mut scheduler = ExecutionScheduler::new(board, channel, config, frames.clone())?;

    let mut input = KeyboardInput::new(args.key_release())?;
    let mut presenter = Presenter::new(TermSurface::new(demo::WIDTH, demo::HEIGHT)?, frames);

    let exit = match sender {
        None => host::run_cooperative(&mut scheduler, &mut input, &mut presenter)?,
        Some(sender) => host::run_threaded(scheduler, sender, &mut input, &mut presenter)?,
    };

    // put the terminal back before printing anything
    drop(input);
    println!();
    if let Exit::Terminated(state) = exit {
        println!("simulation stopped: {:?}", state);
    }
    Ok(())
}
