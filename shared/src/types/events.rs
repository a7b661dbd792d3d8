//! Event type definitions for tracing data
//!
//! These types represent the completed host calls and device commands
//! handed over by the interception layer. Records are created once the
//! event has finished (durations are only known afterwards) and are consumed
//! immediately by the tracer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in nanoseconds
pub type Timestamp = u64;

/// Identifier linking a completion back to the call that issued it
pub type CorrelationId = u64;

/// Execution target profiled independently of the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cpu,
    Gpu,
}

impl Backend {
    /// All backends in report order
    pub const ALL: [Backend; 2] = [Backend::Cpu, Backend::Gpu];

    /// Slot of this backend in per-backend arrays
    pub fn index(self) -> usize {
        match self {
            Backend::Cpu => 0,
            Backend::Gpu => 1,
        }
    }

    /// Label used in report headers
    pub fn label(self) -> &'static str {
        match self {
            Backend::Cpu => "CPU",
            Backend::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Backend::Cpu),
            "gpu" => Ok(Backend::Gpu),
            _ => Err(format!("Invalid backend: {}", s)),
        }
    }
}

/// Kind of events a collector aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Host API invocations
    HostCall,
    /// Commands executed on the device queue
    DeviceCommand,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::HostCall => f.write_str("host call"),
            EventKind::DeviceCommand => f.write_str("device command"),
        }
    }
}

/// One completed host API call
///
/// `started` and `ended` are already on the tracer's zero-based timeline
/// (taken from the tracer's time base by the interception layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCall {
    pub id: CorrelationId,
    pub name: String,
    pub started: Timestamp,
    pub ended: Timestamp,
}

impl HostCall {
    pub fn duration_ns(&self) -> u64 {
        self.ended.saturating_sub(self.started)
    }
}

/// Kernel launch geometry, reported in verbose mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchShape {
    pub simd_width: u32,
    pub global_size: [u64; 3],
    pub local_size: [u64; 3],
}

impl fmt::Display for LaunchShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SIMD{}, {{{}, {}, {}}}, {{{}, {}, {}}}",
            self.simd_width,
            self.global_size[0],
            self.global_size[1],
            self.global_size[2],
            self.local_size[0],
            self.local_size[1],
            self.local_size[2],
        )
    }
}

/// One completed device command with its four lifecycle timestamps
///
/// Timestamps are absolute readings of the tracer's origin clock; the
/// collector normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub id: CorrelationId,
    pub name: String,
    pub queue: String,
    pub queued: Timestamp,
    pub submitted: Timestamp,
    pub started: Timestamp,
    pub ended: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch: Option<LaunchShape>,
}

/// Device command timestamps after normalization to the shared timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTimes {
    pub queued: Timestamp,
    pub submitted: Timestamp,
    pub started: Timestamp,
    pub ended: Timestamp,
}

impl CommandTimes {
    /// Billed execution time
    pub fn execute_ns(&self) -> u64 {
        self.ended - self.started
    }

    /// Time spent waiting in the queue before submission
    pub fn queued_ns(&self) -> u64 {
        self.submitted - self.queued
    }

    /// Time between submission and execution start
    pub fn submit_ns(&self) -> u64 {
        self.started - self.submitted
    }
}

/// A device command as seen by live per-event sinks
#[derive(Debug, Clone, Copy)]
pub struct CommandSpan<'a> {
    pub queue: &'a str,
    pub id: CorrelationId,
    pub name: &'a str,
    pub times: CommandTimes,
}

/// A host call as seen by live per-event sinks
#[derive(Debug, Clone, Copy)]
pub struct CallSpan<'a> {
    pub id: CorrelationId,
    pub name: &'a str,
    pub started: Timestamp,
    pub ended: Timestamp,
}

/// One line of a recorded event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordedEvent {
    Host {
        backend: Backend,
        #[serde(flatten)]
        call: HostCall,
    },
    Device {
        backend: Backend,
        #[serde(flatten)]
        command: DeviceCommand,
    },
}

impl RecordedEvent {
    pub fn backend(&self) -> Backend {
        match self {
            RecordedEvent::Host { backend, .. } | RecordedEvent::Device { backend, .. } => *backend,
        }
    }
}
