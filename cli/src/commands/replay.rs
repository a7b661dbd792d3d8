//! Replay command implementation
//!
//! Reads a recorded event log (one JSON object per line, tagged `host` or
//! `device`) and feeds it through a tracer as if the events had just been
//! intercepted. Device timestamps in the log are relative to the recording's
//! start and are shifted onto the new tracer's origin.

use crate::commands::TraceArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use lumen_shared::types::events::{Backend, RecordedEvent};
use lumen_tracer::{OptionSet, StaticPlatform, Tracer, TracerHandle};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Recorded event log (JSON lines)
    pub input: PathBuf,

    #[command(flatten)]
    pub trace: TraceArgs,

    /// Ignore LUMEN_* variables from the environment
    #[arg(long)]
    pub no_env: bool,
}

pub fn run(args: ReplayArgs) -> Result<()> {
    let mut options = if args.no_env {
        OptionSet::default()
    } else {
        OptionSet::from_env().context("Invalid LUMEN_* environment")?
    };
    args.trace.apply(&mut options);
    options.validate().context("Invalid tracing flags")?;

    let events = read_events(&args.input)?;
    if events.is_empty() {
        output::warning(&format!("{} contains no events", args.input.display()));
    }

    let count = replay(&options, &events)?;
    output::success(&format!(
        "Replayed {} events from {}",
        count,
        args.input.display()
    ));
    Ok(())
}

/// Run events through a fresh tracer and report; returns the events delivered
pub fn replay(options: &OptionSet, events: &[RecordedEvent]) -> Result<usize> {
    let mut platform = StaticPlatform::new();
    for backend in Backend::ALL {
        if events.iter().any(|e| e.backend() == backend) {
            platform = platform.with_device(backend);
        }
    }

    let tracer = Tracer::start(options, &platform).context("Failed to start tracer")?;
    let handle = tracer.handle();
    for event in events {
        deliver(&handle, event);
    }
    tracer.stop();
    Ok(events.len())
}

fn deliver(handle: &TracerHandle, event: &RecordedEvent) {
    match event {
        RecordedEvent::Host { backend, call } => handle.host_call(*backend, call),
        RecordedEvent::Device { backend, command } => {
            let origin = handle.time_base().origin();
            let mut command = command.clone();
            for ts in [
                &mut command.queued,
                &mut command.submitted,
                &mut command.started,
                &mut command.ended,
            ] {
                *ts = ts.saturating_add(origin);
            }
            handle.device_command(*backend, &command);
        }
    }
}

/// Parse an event log, skipping blank lines
pub fn read_events(path: &Path) -> Result<Vec<RecordedEvent>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: RecordedEvent = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid event", path.display(), index + 1))?;
        events.push(event);
    }
    debug!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}
