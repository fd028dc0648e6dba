use crate::channel::Strategy;
use crate::clock::SimulatedClock;
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::time::Duration;

const MHZ_16: u64 = 16_000_000;
/// SSD1306 internal refresh at its default oscillator settings
const SSD1306_FRAME_PERIOD_US: u64 = 7572;
/// a terminal redraw for every 12 panel refreshes
const REDRAW_PERIOD_US: u64 = SSD1306_FRAME_PERIOD_US * 12;
const LUMA_INC: u8 = (256 * 2 / 3) as u8;
const LUMA_DECAY: u8 = (256 / 3) as u8;

/// how simulation and the host loop share the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// one thread alternates between simulating and servicing the terminal
    Cooperative,
    /// simulation runs on its own thread; input crosses over a queue
    Threaded,
}

/// Arduboy board simulator with a terminal display
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Cooperative)]
    pub mode: Mode,

    /// simulated cycles between scheduler checkpoints
    #[arg(long, default_value_t = 16_000)]
    pub burst_cycles: u64,

    /// how often the afterglow model samples the panel, in microseconds
    #[arg(long, default_value_t = SSD1306_FRAME_PERIOD_US)]
    pub persistence_us: u64,

    /// how often the terminal is redrawn, in microseconds
    #[arg(long, default_value_t = REDRAW_PERIOD_US)]
    pub redraw_us: u64,

    #[arg(long, default_value_t = LUMA_DECAY)]
    pub luma_decay: u8,

    #[arg(long, default_value_t = LUMA_INC)]
    pub luma_increase: u8,

    /// input events that may wait between bursts (threaded mode)
    #[arg(long, default_value_t = 64)]
    pub queue_capacity: usize,

    #[arg(long, default_value_t = MHZ_16)]
    pub frequency_hz: u64,

    /// run as fast as the host allows instead of pacing to wall-clock time
    #[arg(long)]
    pub unthrottled: bool,

    /// release a key once the terminal has stopped repeating it for this long
    #[arg(long, default_value_t = 400)]
    pub key_release_ms: u64,

    /// halt the demo board after this much simulated time
    #[arg(long)]
    pub run_for_ms: Option<u64>,
}

/// validated scheduler settings, periods already in cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub clock: SimulatedClock,
    pub burst_cycles: u64,
    pub persistence_period: u64,
    pub redraw_period: u64,
    pub luma_decay: u8,
    pub luma_increase: u8,
    pub throttle: bool,
}

impl SchedulerConfig {
    /// settings from microsecond periods, checked before anything runs
    pub fn from_micros(
        frequency_hz: u64,
        burst_cycles: u64,
        persistence_us: u64,
        redraw_us: u64,
    ) -> Result<Self, ConfigError> {
        let clock = SimulatedClock::new(frequency_hz)?;
        if burst_cycles == 0 {
            return Err(ConfigError::EmptyBurst);
        }
        let persistence_period = clock.usec_to_cycles(persistence_us);
        if persistence_period == 0 {
            return Err(ConfigError::EmptyPeriod {
                name: "persistence",
                micros: persistence_us,
            });
        }
        let redraw_period = clock.usec_to_cycles(redraw_us);
        if redraw_period == 0 {
            return Err(ConfigError::EmptyPeriod {
                name: "redraw",
                micros: redraw_us,
            });
        }
        if redraw_period < persistence_period {
            return Err(ConfigError::RedrawFasterThanPersistence {
                redraw: redraw_period,
                persistence: persistence_period,
            });
        }
        Ok(SchedulerConfig {
            clock,
            burst_cycles,
            persistence_period,
            redraw_period,
            luma_decay: LUMA_DECAY,
            luma_increase: LUMA_INC,
            throttle: true,
        })
    }
}

impl TryFrom<&Args> for SchedulerConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut config = SchedulerConfig::from_micros(
            args.frequency_hz,
            args.burst_cycles,
            args.persistence_us,
            args.redraw_us,
        )?;
        config.luma_decay = args.luma_decay;
        config.luma_increase = args.luma_increase;
        config.throttle = !args.unthrottled;
        Ok(config)
    }
}

impl Args {
    /// the input delivery strategy this mode needs
    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        match self.mode {
            Mode::Cooperative => Ok(Strategy::Inline),
            Mode::Threaded if self.queue_capacity == 0 => Err(ConfigError::EmptyQueue),
            Mode::Threaded => Ok(Strategy::Queued {
                capacity: self.queue_capacity,
            }),
        }
    }

    pub fn key_release(&self) -> Duration {
        Duration::from_millis(self.key_release_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("arduboy").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_match_board() -> Result<(), ConfigError> {
        let args = parse(&[]);
        let c = SchedulerConfig::try_from(&args)?;
        assert_eq!(c.clock.frequency_hz(), 16_000_000);
        assert_eq!(c.persistence_period, 121_152);
        assert_eq!(c.redraw_period, 12 * 121_152);
        assert_eq!((c.luma_decay, c.luma_increase), (85, 170));
        assert!(c.throttle);
        assert_eq!(args.strategy()?, Strategy::Inline);
        Ok(())
    }

    #[test]
    fn test_threaded_uses_queue() -> Result<(), ConfigError> {
        let args = parse(&["--mode", "threaded", "--queue-capacity", "8", "--unthrottled"]);
        assert_eq!(args.strategy()?, Strategy::Queued { capacity: 8 });
        assert!(!SchedulerConfig::try_from(&args)?.throttle);
        Ok(())
    }

    #[test]
    fn test_fatal_configs() {
        let cases: [(&[&str], ConfigError); 5] = [
            (&["--frequency-hz", "0"], ConfigError::Frequency(0)),
            (&["--burst-cycles", "0"], ConfigError::EmptyBurst),
            (
                &["--persistence-us", "0"],
                ConfigError::EmptyPeriod {
                    name: "persistence",
                    micros: 0,
                },
            ),
            (
                &["--redraw-us", "0"],
                ConfigError::EmptyPeriod {
                    name: "redraw",
                    micros: 0,
                },
            ),
            (
                &["--redraw-us", "1000"],
                ConfigError::RedrawFasterThanPersistence {
                    redraw: 16_000,
                    persistence: 121_152,
                },
            ),
        ];
        for (argv, expected) in cases {
            assert_eq!(SchedulerConfig::try_from(&parse(argv)), Err(expected));
        }
    }

    #[test]
    fn test_zero_queue_rejected() {
        let args = parse(&["--mode", "threaded", "--queue-capacity", "0"]);
        assert_eq!(args.strategy(), Err(ConfigError::EmptyQueue));
    }
}
