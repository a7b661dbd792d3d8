//! Shared time base
//!
//! Every report uses one zero point captured when the tracer starts. Device
//! timestamps arrive as absolute readings of the origin clock and are
//! normalized against it; host timestamps are taken directly from [`TimeBase::now`].

use crate::error::OrderingError;
use chrono::{DateTime, Utc};
use lumen_shared::utils::time::{clock_nanos, ClockSource};

/// Immutable origin of the tracer timeline
#[derive(Debug, Clone)]
pub struct TimeBase {
    origin: u64,
    clocks: Vec<(ClockSource, u64)>,
    wall_clock: DateTime<Utc>,
}

impl TimeBase {
    /// Capture the origin from the raw monotonic clock
    pub fn new() -> Self {
        let clocks: Vec<(ClockSource, u64)> = ClockSource::AVAILABLE
            .iter()
            .map(|&source| (source, clock_nanos(source)))
            .collect();
        Self {
            origin: clocks[0].1,
            clocks,
            wall_clock: Utc::now(),
        }
    }

    /// Build a time base around a known origin
    pub fn with_origin(origin: u64) -> Self {
        Self {
            origin,
            clocks: vec![(ClockSource::MonotonicRaw, origin)],
            wall_clock: Utc::now(),
        }
    }

    /// Nanoseconds elapsed since the origin
    pub fn now(&self) -> u64 {
        clock_nanos(ClockSource::MonotonicRaw).saturating_sub(self.origin)
    }

    /// Map an absolute origin-clock reading onto the timeline
    pub fn normalize(&self, timestamp: u64) -> Result<u64, OrderingError> {
        timestamp
            .checked_sub(self.origin)
            .ok_or(OrderingError::BeforeOrigin {
                timestamp,
                origin: self.origin,
            })
    }

    /// Raw origin reading
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Origin as read from every available clock at construction
    pub fn clocks(&self) -> &[(ClockSource, u64)] {
        &self.clocks
    }

    /// Wall-clock time of the origin, for display only
    pub fn wall_clock(&self) -> DateTime<Utc> {
        self.wall_clock
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
