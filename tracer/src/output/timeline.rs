//! Console timeline lines

use crate::time_base::TimeBase;
use lumen_shared::types::events::{CallSpan, CommandSpan};

/// Clock origins printed once when the device timeline is enabled
pub fn timeline_header(time_base: &TimeBase) -> String {
    let mut out = String::new();
    for (source, origin) in time_base.clocks() {
        out.push_str(&format!(
            "Device Timeline: start time ({}) [ns] = {}\n",
            source.name(),
            origin
        ));
    }
    out
}

/// One line per completed device command
pub fn device_timeline_line(span: &CommandSpan<'_>, pid: Option<u32>) -> String {
    let times = &span.times;
    format!(
        "{}Device Timeline (queue: {}): {}<{}> [ns] = {} (queued) {} (submit) {} (start) {} (end)\n",
        prefix(pid, None),
        span.queue,
        span.name,
        span.id,
        times.queued,
        times.submitted,
        times.started,
        times.ended
    )
}

/// Enter and exit lines for one completed host call
pub fn call_log_lines(span: &CallSpan<'_>, pid: Option<u32>, tid: Option<u64>) -> String {
    let prefix = prefix(pid, tid);
    format!(
        "{prefix}>>>> [{}] {}<{}>\n{prefix}<<<< [{}] {} [{} ns]\n",
        span.started,
        span.name,
        span.id,
        span.ended,
        span.name,
        span.ended.saturating_sub(span.started),
        prefix = prefix
    )
}

fn prefix(pid: Option<u32>, tid: Option<u64>) -> String {
    let mut prefix = String::new();
    if let Some(pid) = pid {
        prefix.push_str(&format!("<PID:{}> ", pid));
    }
    if let Some(tid) = tid {
        prefix.push_str(&format!("<TID:{}> ", tid));
    }
    prefix
}
