use crate::error::ConfigError;
use std::time::{Duration, Instant};
use tracing::trace;

const NANOS_PER_SEC: u128 = 1_000_000_000;
const MICROS_PER_SEC: u128 = 1_000_000;

/// anything faster than this can't be represented with nanosecond resolution
const MAX_FREQUENCY_HZ: u64 = 1_000_000_000;

/// converts between simulated cycles and wall-clock time at a fixed frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedClock {
    frequency_hz: u64,
}

impl SimulatedClock {
    pub fn new(frequency_hz: u64) -> Result<Self, ConfigError> {
        if frequency_hz == 0 || frequency_hz > MAX_FREQUENCY_HZ {
            return Err(ConfigError::Frequency(frequency_hz));
        }
        Ok(SimulatedClock { frequency_hz })
    }

    pub fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    pub fn cycles_to_ns(&self, cycles: u64) -> u64 {
        // widen so cycles * 1e9 can't overflow for any u64 cycle count
        let ns = cycles as u128 * NANOS_PER_SEC / self.frequency_hz as u128;
        ns.min(u64::MAX as u128) as u64
    }

    pub fn ns_to_cycles(&self, ns: u64) -> u64 {
        (ns as u128 * self.frequency_hz as u128 / NANOS_PER_SEC) as u64
    }

    pub fn usec_to_cycles(&self, micros: u64) -> u64 {
        (micros as u128 * self.frequency_hz as u128 / MICROS_PER_SEC) as u64
    }
}

/// wall-clock origin that simulated cycle zero is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    origin: Instant,
}

impl Epoch {
    pub fn now() -> Self {
        Epoch {
            origin: Instant::now(),
        }
    }

    pub fn elapsed_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos().min(u64::MAX as u128) as u64
    }
}

/// what `sleep_until` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// simulation was ahead; the thread slept this long
    Slept(Duration),
    /// simulation is behind wall-clock by this many nanoseconds
    Behind(u64),
}

/// Throttles simulated time so it never runs ahead of wall-clock time.
///
/// This never fast-forwards: if the simulation falls behind (a slow host, a
/// debugger pause) it just returns and lets the simulation catch up at full
/// speed.
pub struct TimeSynchronizer {
    clock: SimulatedClock,
    epoch: Epoch,
}

impl TimeSynchronizer {
    pub fn new(clock: SimulatedClock, epoch: Epoch) -> Self {
        TimeSynchronizer { clock, epoch }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// block until wall-clock time catches up with `target_cycle`
    pub fn sleep_until(&self, target_cycle: u64) -> Pace {
        let deadline_ns = self.clock.cycles_to_ns(target_cycle);
        let pace = residual(deadline_ns, self.epoch.elapsed_ns());
        match pace {
            Pace::Slept(d) => spin_sleep::sleep(d),
            Pace::Behind(lag_ns) => trace!(target_cycle, lag_ns, "simulation behind wall clock"),
        }
        pace
    }
}

/// how long to wait to meet `deadline_ns`, given `elapsed_ns` since the epoch
pub fn residual(deadline_ns: u64, elapsed_ns: u64) -> Pace {
    if elapsed_ns >= deadline_ns {
        Pace::Behind(elapsed_ns - deadline_ns)
    } else {
        Pace::Slept(Duration::from_nanos(deadline_ns - elapsed_ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MHZ_16: u64 = 16_000_000;

    #[test]
    fn test_rejects_unsupported_frequency() {
        assert_eq!(SimulatedClock::new(0), Err(ConfigError::Frequency(0)));
        assert!(SimulatedClock::new(MAX_FREQUENCY_HZ + 1).is_err());
    }

    #[test]
    fn test_cycle_conversions() {
        let c = SimulatedClock::new(MHZ_16).unwrap();
        assert_eq!(c.cycles_to_ns(16), 1_000);
        assert_eq!(c.cycles_to_ns(MHZ_16), 1_000_000_000);
        assert_eq!(c.ns_to_cycles(1_000), 16);
        assert_eq!(c.usec_to_cycles(7572), 121_152);
    }

    #[test]
    fn test_huge_cycle_count_does_not_overflow() {
        let c = SimulatedClock::new(1).unwrap();
        assert_eq!(c.cycles_to_ns(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_residual_when_behind() {
        assert_eq!(residual(1_000, 1_000), Pace::Behind(0));
        assert_eq!(residual(1_000, 5_000), Pace::Behind(4_000));
    }

    #[test]
    fn test_residual_when_ahead() {
        assert_eq!(residual(5_000, 1_000), Pace::Slept(Duration::from_nanos(4_000)));
    }

    #[test]
    fn test_sleep_until_never_returns_early() {
        let c = SimulatedClock::new(MHZ_16).unwrap();
        let sync = TimeSynchronizer::new(c, Epoch::now());
        // 5ms worth of cycles
        let target = c.usec_to_cycles(5_000);
        sync.sleep_until(target);
        assert!(sync.epoch().elapsed_ns() >= c.cycles_to_ns(target));
    }

    #[test]
    fn test_sleep_until_returns_immediately_when_behind() {
        let c = SimulatedClock::new(MHZ_16).unwrap();
        let sync = TimeSynchronizer::new(c, Epoch::now());
        std::thread::sleep(Duration::from_millis(2));
        let before = Instant::now();
        assert!(matches!(sync.sleep_until(16), Pace::Behind(_)));
        assert!(before.elapsed() < Duration::from_millis(50));
    }
}
