use std::io;
use thiserror::Error;

/// Rejected configuration. Always raised before the first burst runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported clock frequency: {0} Hz")]
    Frequency(u64),
    #[error("burst size must be at least one cycle")]
    EmptyBurst,
    #[error("{name} period must be at least one cycle (got {micros} us)")]
    EmptyPeriod { name: &'static str, micros: u64 },
    #[error("redraw period ({redraw} cycles) is shorter than the persistence period ({persistence} cycles)")]
    RedrawFasterThanPersistence { redraw: u64, persistence: u64 },
    #[error("input queue needs room for at least one event")]
    EmptyQueue,
    #[error("board runs at {machine} Hz but pacing is configured for {pacing} Hz")]
    FrequencyMismatch { machine: u64, pacing: u64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("simulation thread panicked")]
    SimulationPanicked,
}
