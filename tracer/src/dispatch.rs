//! Callback selection
//!
//! The enabled options decide, once at construction, which live behavior
//! is attached to each collector. Selection is a pure function of the option
//! set; the tracer turns the returned variant into a listener.

use crate::config::OptionSet;

/// How device commands are laid out in the trace file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLayout {
    /// One span per command, one track per queue
    PerQueue,
    /// One span per command, one track per kernel name
    PerKernel,
    /// Three stage spans per command, one track per command instance
    Stages,
    /// Three stage spans per command, one track per kernel name
    KernelStages,
}

/// Live behavior attached to device command collectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCallback {
    /// Console timeline line only
    Timeline,
    /// Trace file spans only
    Trace(TraceLayout),
    /// Console timeline line, then trace file spans
    TimelineAndTrace(TraceLayout),
}

impl DeviceCallback {
    pub fn writes_timeline(self) -> bool {
        matches!(self, DeviceCallback::Timeline | DeviceCallback::TimelineAndTrace(_))
    }

    pub fn trace_layout(self) -> Option<TraceLayout> {
        match self {
            DeviceCallback::Timeline => None,
            DeviceCallback::Trace(layout) | DeviceCallback::TimelineAndTrace(layout) => Some(layout),
        }
    }
}

/// Live behavior attached to host call collectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCallback {
    /// One trace file span per call
    TraceSpan,
}

/// Pick the device behavior for validated options
///
/// Conflicting trace layouts are rejected by [`OptionSet::validate`] before
/// this runs.
pub fn select_device_callback(options: &OptionSet) -> Option<DeviceCallback> {
    debug_assert!(options.validate().is_ok());

    let layout = match (
        options.chrome_device_timeline,
        options.chrome_kernel_timeline,
        options.chrome_device_stages,
    ) {
        (true, _, _) => Some(TraceLayout::PerQueue),
        (false, true, true) => Some(TraceLayout::KernelStages),
        (false, true, false) => Some(TraceLayout::PerKernel),
        (false, false, true) => Some(TraceLayout::Stages),
        (false, false, false) => None,
    };

    match (options.device_timeline, layout) {
        (true, Some(layout)) => Some(DeviceCallback::TimelineAndTrace(layout)),
        (true, None) => Some(DeviceCallback::Timeline),
        (false, Some(layout)) => Some(DeviceCallback::Trace(layout)),
        (false, None) => None,
    }
}

/// Pick the host behavior
pub fn select_host_callback(options: &OptionSet) -> Option<HostCallback> {
    options.chrome_call_logging.then_some(HostCallback::TraceSpan)
}
