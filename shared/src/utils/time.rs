//! Time-related utilities

use std::time::{SystemTime, UNIX_EPOCH};

/// Clocks a timestamp can be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockSource {
    /// Hardware-rate monotonic clock; the tracer's origin clock
    MonotonicRaw,
    /// NTP-slewed monotonic clock
    Monotonic,
    /// Wall clock
    Realtime,
}

impl ClockSource {
    /// Clocks readable on this platform, origin clock first
    #[cfg(target_os = "linux")]
    pub const AVAILABLE: &'static [ClockSource] = &[
        ClockSource::MonotonicRaw,
        ClockSource::Monotonic,
        ClockSource::Realtime,
    ];

    #[cfg(not(target_os = "linux"))]
    pub const AVAILABLE: &'static [ClockSource] = &[ClockSource::MonotonicRaw, ClockSource::Realtime];

    /// Name used in trace metadata and timeline headers
    pub fn name(self) -> &'static str {
        match self {
            ClockSource::MonotonicRaw => "CLOCK_MONOTONIC_RAW",
            ClockSource::Monotonic => "CLOCK_MONOTONIC",
            ClockSource::Realtime => "CLOCK_REALTIME",
        }
    }
}

/// Read a clock in nanoseconds
#[cfg(target_os = "linux")]
pub fn clock_nanos(source: ClockSource) -> u64 {
    let clock = match source {
        ClockSource::MonotonicRaw => libc::CLOCK_MONOTONIC_RAW,
        ClockSource::Monotonic => libc::CLOCK_MONOTONIC,
        ClockSource::Realtime => libc::CLOCK_REALTIME,
    };
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: clock_gettime only writes through the valid pointer it is given.
    if unsafe { libc::clock_gettime(clock, &mut ts) } == 0 {
        (ts.tv_sec as u64)
            .saturating_mul(1_000_000_000)
            .saturating_add(ts.tv_nsec as u64)
    } else {
        0
    }
}

/// Read a clock in nanoseconds
#[cfg(not(target_os = "linux"))]
pub fn clock_nanos(source: ClockSource) -> u64 {
    use std::time::Instant;
    static EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

    match source {
        ClockSource::Realtime => system_time_nanos(),
        ClockSource::MonotonicRaw | ClockSource::Monotonic => {
            let epoch = EPOCH.get_or_init(Instant::now);
            epoch.elapsed().as_nanos() as u64 + 1
        }
    }
}

/// Get the current system time in nanoseconds since UNIX epoch
pub fn system_time_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_raw_does_not_go_backwards() {
        let first = clock_nanos(ClockSource::MonotonicRaw);
        let second = clock_nanos(ClockSource::MonotonicRaw);
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn test_realtime_is_after_2020() {
        let nanos = clock_nanos(ClockSource::Realtime);
        assert!(nanos / 1_000_000_000 > 1_600_000_000);
    }

    #[test]
    fn test_origin_clock_listed_first() {
        assert_eq!(ClockSource::AVAILABLE[0], ClockSource::MonotonicRaw);
        assert_eq!(ClockSource::MonotonicRaw.name(), "CLOCK_MONOTONIC_RAW");
    }
}
