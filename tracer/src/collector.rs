//! Event collectors
//!
//! One collector exists per (backend, event kind). It folds every completed
//! host call or device command into a per-name statistics map and forwards
//! the individual event to an optional live listener (console timeline,
//! trace file). Writers are serialized by a single mutex around the map.

use crate::error::OrderingError;
use crate::platform::Interception;
use crate::time_base::TimeBase;
use lumen_shared::types::events::{
    Backend, CallSpan, CommandSpan, CommandTimes, DeviceCommand, EventKind, HostCall,
};
use lumen_shared::types::stats::CommandStat;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use symbolic_common::Name;
use symbolic_demangle::{Demangle, DemangleOptions};
use tracing::{debug, error};

/// Live sink for host calls
pub type CallListener = Arc<dyn Fn(&CallSpan<'_>) + Send + Sync>;

/// Live sink for device commands
pub type CommandListener = Arc<dyn Fn(&CommandSpan<'_>) + Send + Sync>;

/// Naming options applied before aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameOptions {
    /// Demangle C++ kernel names
    pub demangle: bool,
    /// Append launch geometry to kernel names
    pub verbose: bool,
}

/// Aggregation unit for one backend and one event kind
pub struct Collector {
    backend: Backend,
    kind: EventKind,
    time_base: Arc<TimeBase>,
    names: NameOptions,
    stats: Mutex<HashMap<String, CommandStat>>,
    enabled: AtomicBool,
    interception: Mutex<Option<Box<dyn Interception>>>,
    on_call: Option<CallListener>,
    on_command: Option<CommandListener>,
}

impl Collector {
    /// Create an enabled collector with no listener attached
    pub fn new(backend: Backend, kind: EventKind, time_base: Arc<TimeBase>) -> Self {
        Self {
            backend,
            kind,
            time_base,
            names: NameOptions::default(),
            stats: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(true),
            interception: Mutex::new(None),
            on_call: None,
            on_command: None,
        }
    }

    pub fn with_names(mut self, names: NameOptions) -> Self {
        self.names = names;
        self
    }

    /// Keep the interception handle so `disable` can detach it
    pub fn with_interception(self, interception: Box<dyn Interception>) -> Self {
        *lock(&self.interception) = Some(interception);
        self
    }

    pub fn with_call_listener(mut self, listener: Option<CallListener>) -> Self {
        self.on_call = listener;
        self
    }

    pub fn with_command_listener(mut self, listener: Option<CommandListener>) -> Self {
        self.on_command = listener;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Fold one host call duration into the statistics for `name`
    pub fn record(&self, name: &str, duration_ns: u64) {
        let Some(mut stats) = self.open_stats(name) else {
            return;
        };
        observe_call(&mut stats, name, duration_ns);
    }

    /// Aggregate a completed host call and forward it to the live listener
    pub fn record_call(&self, call: &HostCall) {
        if !self.is_enabled() {
            return;
        }
        if call.ended < call.started {
            fail_fast(
                self.backend,
                &call.name,
                OrderingError::OutOfOrder {
                    earlier: "start",
                    earlier_ts: call.started,
                    later: "end",
                    later_ts: call.ended,
                },
            );
        }

        let Some(mut stats) = self.open_stats(&call.name) else {
            return;
        };
        observe_call(&mut stats, &call.name, call.duration_ns());

        // Listeners run under the stats lock, which `disable` drains.
        if let Some(listener) = &self.on_call {
            listener(&CallSpan {
                id: call.id,
                name: &call.name,
                started: call.started,
                ended: call.ended,
            });
        }
    }

    /// Validate, aggregate and forward a completed device command
    ///
    /// A command whose timestamps are not strictly ordered
    /// (`queued < submitted < started < ended`) or that predates the tracer
    /// origin is a correlation bug; the collector panics rather than bill a
    /// corrupt duration.
    pub fn record_command(&self, command: &DeviceCommand) {
        if !self.is_enabled() {
            debug!("{} {} collector disabled, dropping {}", self.backend, self.kind, command.name);
            return;
        }

        let times = match normalize_command(&self.time_base, command) {
            Ok(times) => times,
            Err(err) => fail_fast(self.backend, &command.name, err),
        };
        let name = self.display_name(command);

        let Some(mut stats) = self.open_stats(&name) else {
            return;
        };
        match stats.get_mut(name.as_ref()) {
            Some(stat) => stat.observe_times(&times),
            None => {
                stats.insert(name.to_string(), CommandStat::from_times(name.as_ref(), &times));
            }
        }

        if let Some(listener) = &self.on_command {
            listener(&CommandSpan {
                queue: &command.queue,
                id: command.id,
                name: &name,
                times,
            });
        }
    }

    /// Sum of the billed time over every name
    pub fn total(&self) -> u64 {
        lock(&self.stats)
            .values()
            .fold(0u64, |acc, stat| acc.saturating_add(stat.exec.total_ns))
    }

    /// Statistics sorted by name
    pub fn snapshot(&self) -> Vec<CommandStat> {
        let mut stats: Vec<CommandStat> = lock(&self.stats).values().cloned().collect();
        stats.sort_by(|a, b| a.name().cmp(b.name()));
        stats
    }

    /// Stop accepting events and detach interception; safe to call twice
    pub fn disable(&self) {
        if !self.enabled.swap(false, Ordering::AcqRel) {
            return;
        }
        // Wait out writers that passed the enabled check before the swap.
        drop(lock(&self.stats));
        if let Some(mut interception) = lock(&self.interception).take() {
            interception.detach();
        }
        debug!("{} {} collector disabled", self.backend, self.kind);
    }

    /// Stats map for a writer, or `None` once the collector is disabled
    fn open_stats(&self, name: &str) -> Option<MutexGuard<'_, HashMap<String, CommandStat>>> {
        let stats = lock(&self.stats);
        if !self.is_enabled() {
            debug!("{} {} collector disabled, dropping {}", self.backend, self.kind, name);
            return None;
        }
        Some(stats)
    }

    fn display_name<'a>(&self, command: &'a DeviceCommand) -> Cow<'a, str> {
        let mut name = Cow::Borrowed(command.name.as_str());
        if self.names.demangle {
            if let Some(demangled) = demangle(&command.name) {
                name = Cow::Owned(demangled);
            }
        }
        if self.names.verbose {
            if let Some(shape) = &command.launch {
                name = Cow::Owned(format!("{}[{}]", name, shape));
            }
        }
        name
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.disable();
    }
}

fn observe_call(stats: &mut HashMap<String, CommandStat>, name: &str, duration_ns: u64) {
    match stats.get_mut(name) {
        Some(stat) => stat.exec.observe(duration_ns),
        None => {
            stats.insert(name.to_string(), CommandStat::new(name, duration_ns));
        }
    }
}

/// Normalize the four timestamps of a command and check their order
pub fn normalize_command(
    time_base: &TimeBase,
    command: &DeviceCommand,
) -> Result<CommandTimes, OrderingError> {
    let times = CommandTimes {
        queued: time_base.normalize(command.queued)?,
        submitted: time_base.normalize(command.submitted)?,
        started: time_base.normalize(command.started)?,
        ended: time_base.normalize(command.ended)?,
    };

    let stages = [
        ("queued", times.queued),
        ("submitted", times.submitted),
        ("started", times.started),
        ("ended", times.ended),
    ];
    for pair in stages.windows(2) {
        let (earlier, earlier_ts) = pair[0];
        let (later, later_ts) = pair[1];
        if earlier_ts >= later_ts {
            return Err(OrderingError::OutOfOrder {
                earlier,
                earlier_ts,
                later,
                later_ts,
            });
        }
    }
    Ok(times)
}

/// Demangle an Itanium C++ symbol; `None` when the name is not mangled
pub fn demangle(name: &str) -> Option<String> {
    if !name.starts_with("_Z") {
        return None;
    }
    Name::from(name).demangle(DemangleOptions::name_only())
}

fn fail_fast(backend: Backend, name: &str, err: OrderingError) -> ! {
    error!("{} backend: corrupt timeline for {}: {}", backend, name, err);
    panic!("corrupt timeline for {} on {} backend: {}", name, backend, err);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
