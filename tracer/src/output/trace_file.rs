//! Streaming trace file
//!
//! Spans are appended as they complete, one comma-terminated JSON object
//! per line, so a process that dies mid-run still leaves a readable prefix.
//! Closing the writer appends an `end_time` metadata object and the closing
//! bracket, which turns the file into a strict JSON array that chrome://tracing
//! and Perfetto load directly.

use crate::dispatch::TraceLayout;
use crate::error::TracerError;
use crate::output::NSEC_IN_USEC;
use crate::time_base::TimeBase;
use lumen_shared::types::events::{CallSpan, CommandSpan, Timestamp};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// One complete (`ph: "X"`) span
#[derive(Debug, Serialize)]
struct TraceEvent<'a> {
    ph: &'static str,
    pid: u32,
    tid: String,
    name: &'a str,
    ts: u64,
    dur: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    cname: Option<&'static str>,
    args: SpanArgs,
}

#[derive(Debug, Serialize)]
struct SpanArgs {
    id: String,
}

/// Stage spans emitted per command in the stage layouts
const STAGES: [(&str, &str); 3] = [
    ("Queued", "thread_state_runnable"),
    ("Submitted", "cq_build_running"),
    ("Executed", "thread_state_iowait"),
];

/// Append-only JSON trace writer
pub struct TraceWriter {
    path: PathBuf,
    pid: u32,
    out: Mutex<Option<BufWriter<File>>>,
}

impl TraceWriter {
    /// Create the file and write the leading metadata
    pub fn create(
        path: &Path,
        pid: u32,
        process_name: &str,
        time_base: &TimeBase,
    ) -> Result<Self, TracerError> {
        let sink_error = |source: io::Error| TracerError::Sink {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(sink_error)?;
        let mut out = BufWriter::new(file);

        let clocks: Map<String, Value> = time_base
            .clocks()
            .iter()
            .map(|(source, origin)| (source.name().to_string(), Value::String(origin.to_string())))
            .collect();
        let process = json!({
            "ph": "M",
            "name": "process_name",
            "pid": pid,
            "tid": "",
            "args": { "name": process_name },
        });
        let start = json!({
            "ph": "M",
            "name": "start_time",
            "pid": pid,
            "tid": "",
            "args": clocks,
        });

        out.write_all(b"[\n").map_err(sink_error)?;
        for metadata in [process, start] {
            write_object(&mut out, &metadata).map_err(sink_error)?;
        }

        debug!("Trace file opened at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            pid,
            out: Mutex::new(Some(out)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One span for a host call, on the calling thread's track
    pub fn write_call(&self, tid: u64, span: &CallSpan<'_>) {
        let event = self.span(tid.to_string(), span.name, span.id, span.started, span.ended, None);
        self.append(&[event]);
    }

    /// Spans for one device command in the given layout
    pub fn write_command(&self, layout: TraceLayout, span: &CommandSpan<'_>) {
        let times = &span.times;
        match layout {
            TraceLayout::PerQueue | TraceLayout::PerKernel => {
                let track = match layout {
                    TraceLayout::PerQueue => span.queue,
                    _ => span.name,
                };
                let event = self.span(
                    track.to_string(),
                    span.name,
                    span.id,
                    times.started,
                    times.ended,
                    None,
                );
                self.append(&[event]);
            }
            TraceLayout::Stages | TraceLayout::KernelStages => {
                let track = match layout {
                    TraceLayout::Stages => format!("{}.{}", span.id, span.queue),
                    _ => span.name.to_string(),
                };
                let bounds = [
                    (times.queued, times.submitted),
                    (times.submitted, times.started),
                    (times.started, times.ended),
                ];
                let names: Vec<String> = STAGES
                    .iter()
                    .map(|(stage, _)| format!("{} ({})", span.name, stage))
                    .collect();
                let events: Vec<TraceEvent<'_>> = STAGES
                    .iter()
                    .zip(bounds)
                    .zip(&names)
                    .map(|(((_, cname), (start, end)), name)| {
                        self.span(track.clone(), name, span.id, start, end, Some(*cname))
                    })
                    .collect();
                self.append(&events);
            }
        }
    }

    /// Write the closing metadata and bracket; later calls do nothing
    pub fn close(&self, elapsed_ns: u64) -> Result<(), TracerError> {
        let Some(mut out) = self.lock().take() else {
            return Ok(());
        };
        let end = json!({
            "ph": "M",
            "name": "end_time",
            "pid": self.pid,
            "tid": "",
            "args": { "elapsed_ns": elapsed_ns.to_string() },
        });

        let result = serde_json::to_writer(&mut out, &end)
            .map_err(io::Error::from)
            .and_then(|_| out.write_all(b"\n]\n"))
            .and_then(|_| out.flush());
        result.map_err(|source| TracerError::Sink {
            path: self.path.clone(),
            source,
        })
    }

    fn span<'a>(
        &self,
        tid: String,
        name: &'a str,
        id: u64,
        start: Timestamp,
        end: Timestamp,
        cname: Option<&'static str>,
    ) -> TraceEvent<'a> {
        TraceEvent {
            ph: "X",
            pid: self.pid,
            tid,
            name,
            ts: start / NSEC_IN_USEC,
            dur: end.saturating_sub(start) / NSEC_IN_USEC,
            cname,
            args: SpanArgs { id: id.to_string() },
        }
    }

    fn append(&self, events: &[TraceEvent<'_>]) {
        let mut out = self.lock();
        let Some(out) = out.as_mut() else {
            debug!("Trace file already closed, dropping {} span(s)", events.len());
            return;
        };
        for event in events {
            if let Err(e) = write_object(out, event) {
                warn!("Failed to write trace span to {}: {}", self.path.display(), e);
                return;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        if let Some(out) = self.lock().as_mut() {
            let _ = out.flush();
        }
    }
}

fn write_object<W: Write, T: Serialize>(out: &mut W, object: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *out, object)?;
    out.write_all(b",\n")
}
