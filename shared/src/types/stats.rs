//! Aggregated statistics
//!
//! Running per-name costs kept by the collectors and handed to the report
//! renderers as sorted snapshots.

use crate::types::events::CommandTimes;
use serde::{Deserialize, Serialize};

/// Aggregated cost of one call site or kernel name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedStat {
    pub name: String,
    pub count: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

impl NamedStat {
    /// Create a stat from its first observation
    pub fn new(name: impl Into<String>, duration_ns: u64) -> Self {
        Self {
            name: name.into(),
            count: 1,
            total_ns: duration_ns,
            min_ns: duration_ns,
            max_ns: duration_ns,
        }
    }

    /// Fold one more observation in
    pub fn observe(&mut self, duration_ns: u64) {
        self.count += 1;
        self.total_ns = self.total_ns.saturating_add(duration_ns);
        self.min_ns = self.min_ns.min(duration_ns);
        self.max_ns = self.max_ns.max(duration_ns);
    }

    pub fn avg_ns(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_ns / self.count
        }
    }
}

/// Per-name statistics kept by a collector
///
/// `exec` carries the billed duration for both event kinds. The queued and
/// submit totals only move for device commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStat {
    pub exec: NamedStat,
    pub queued_total_ns: u64,
    pub submit_total_ns: u64,
}

impl CommandStat {
    pub fn new(name: impl Into<String>, duration_ns: u64) -> Self {
        Self {
            exec: NamedStat::new(name, duration_ns),
            queued_total_ns: 0,
            submit_total_ns: 0,
        }
    }

    /// Create a stat from the first completed device command
    pub fn from_times(name: impl Into<String>, times: &CommandTimes) -> Self {
        Self {
            exec: NamedStat::new(name, times.execute_ns()),
            queued_total_ns: times.queued_ns(),
            submit_total_ns: times.submit_ns(),
        }
    }

    /// Fold one more completed device command in
    pub fn observe_times(&mut self, times: &CommandTimes) {
        self.exec.observe(times.execute_ns());
        self.queued_total_ns = self.queued_total_ns.saturating_add(times.queued_ns());
        self.submit_total_ns = self.submit_total_ns.saturating_add(times.submit_ns());
    }

    pub fn name(&self) -> &str {
        &self.exec.name
    }
}
