//! Report output
//!
//! Console sink, summary tables rendered at shutdown, per-event timeline
//! lines, and the streaming JSON trace file.

pub mod logger;
pub mod table;
pub mod timeline;
pub mod trace_file;

pub use logger::Logger;
pub use trace_file::TraceWriter;

/// Nanoseconds per microsecond, the trace file's time unit
pub const NSEC_IN_USEC: u64 = 1_000;
