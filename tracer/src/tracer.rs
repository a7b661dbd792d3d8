//! Tracer lifecycle
//!
//! [`Tracer::start`] probes the platform, attaches one collector per
//! (backend, event kind) the options ask for and wires the live listeners
//! picked by the dispatcher. Events flow in through cloneable
//! [`TracerHandle`]s. [`Tracer::stop`], or dropping the tracer, disables
//! every collector, renders the reports once and closes the trace file.

use crate::collector::{CallListener, Collector, CommandListener, NameOptions};
use crate::config::OptionSet;
use crate::dispatch::{select_device_callback, select_host_callback, HostCallback};
use crate::error::{BackendError, TracerError};
use crate::gate::{CollectionGate, EnvGate};
use crate::guard::TraceGuard;
use crate::output::table::{submission_report, timing_report, ReportKind, Section};
use crate::output::timeline::{call_log_lines, device_timeline_line, timeline_header};
use crate::output::{Logger, TraceWriter};
use crate::platform::{DeviceHandle, Platform};
use crate::time_base::TimeBase;
use lumen_shared::types::events::{
    Backend, CallSpan, CommandSpan, DeviceCommand, EventKind, HostCall,
};
use lumen_shared::types::stats::CommandStat;
use lumen_shared::utils;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collectors of one event kind, indexed by [`Backend::index`]
type Slots = [Option<Collector>; 2];

struct Shared {
    options: OptionSet,
    time_base: Arc<TimeBase>,
    logger: Arc<Logger>,
    trace: Option<Arc<TraceWriter>>,
    host: Slots,
    device: Slots,
    gate: Box<dyn CollectionGate>,
    stopped: AtomicBool,
}

/// Owner of a tracing session
pub struct Tracer {
    shared: Arc<Shared>,
}

/// Cheap handle used by interception code to deliver events
#[derive(Clone)]
pub struct TracerHandle {
    shared: Arc<Shared>,
}

impl Tracer {
    /// Start tracing with the environment-driven collection gate
    pub fn start(options: &OptionSet, platform: &dyn Platform) -> Result<Self, TracerError> {
        Self::start_with_gate(options, platform, Box::new(EnvGate))
    }

    /// Start tracing with a custom collection gate
    ///
    /// The gate is only consulted when `conditional_collection` is set.
    pub fn start_with_gate(
        options: &OptionSet,
        platform: &dyn Platform,
        gate: Box<dyn CollectionGate>,
    ) -> Result<Self, TracerError> {
        options.validate()?;

        let pid = utils::pid();
        let time_base = Arc::new(TimeBase::new());

        let logger = Arc::new(match (&options.log_to_file, &options.log_file) {
            (true, Some(path)) => Logger::to_file(path)?,
            _ => Logger::stdout(),
        });

        let trace = if options.wants_trace_file() {
            let path = options.trace_path(pid);
            let writer = TraceWriter::create(&path, pid, &utils::executable_name(), &time_base)?;
            Some(Arc::new(writer))
        } else {
            None
        };

        if options.device_timeline {
            logger.log(&timeline_header(&time_base));
        }

        let names = NameOptions {
            demangle: options.demangle,
            verbose: options.verbose,
        };
        let on_call = call_listener(options, pid, &logger, trace.as_ref());
        let on_command = command_listener(options, pid, &logger, trace.as_ref());

        let mut host: Slots = [None, None];
        let mut device: Slots = [None, None];

        for backend in Backend::ALL {
            let Some(handle) = platform.device(backend) else {
                warn!("{}, skipping {} backend", BackendError::NoDevice(backend), backend);
                continue;
            };

            let host_collector = if options.wants_host_calls() {
                attach(platform, &handle, EventKind::HostCall, &time_base)
                    .map(|collector| collector.with_call_listener(on_call.clone()))
                    .map_err(|e| warn!("{}, no host calls from the {} backend", e, backend))
                    .ok()
            } else {
                None
            };

            let device_collector = if options.wants_device_commands() {
                attach(platform, &handle, EventKind::DeviceCommand, &time_base)
                    .map(|collector| {
                        collector
                            .with_names(names)
                            .with_command_listener(on_command.clone())
                    })
                    .map_err(|e| warn!("{}, no device commands from the {} backend", e, backend))
                    .ok()
            } else {
                None
            };

            debug!("{} backend probed", backend);
            host[backend.index()] = host_collector;
            device[backend.index()] = device_collector;
        }

        if options.wants_host_calls() && host.iter().all(Option::is_none) {
            return Err(TracerError::NoBackend(EventKind::HostCall));
        }
        if options.wants_device_commands() && device.iter().all(Option::is_none) {
            return Err(TracerError::NoBackend(EventKind::DeviceCommand));
        }

        info!(
            "Tracer started (pid {}, origin {} ns, {})",
            pid,
            time_base.origin(),
            time_base.wall_clock().to_rfc3339()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                options: options.clone(),
                time_base,
                logger,
                trace,
                host,
                device,
                gate,
                stopped: AtomicBool::new(false),
            }),
        })
    }

    pub fn handle(&self) -> TracerHandle {
        TracerHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn options(&self) -> &OptionSet {
        &self.shared.options
    }

    /// Render the reports and close the sinks
    pub fn stop(self) {
        self.shared.teardown();
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl TracerHandle {
    /// Record a completed host call made through `backend`
    pub fn host_call(&self, backend: Backend, call: &HostCall) {
        if !self.shared.accepting() {
            return;
        }
        if let Some(collector) = &self.shared.host[backend.index()] {
            collector.record_call(call);
        }
    }

    /// Record a completed device command executed on `backend`
    pub fn device_command(&self, backend: Backend, command: &DeviceCommand) {
        if !self.shared.accepting() {
            return;
        }
        if let Some(collector) = &self.shared.device[backend.index()] {
            collector.record_command(command);
        }
    }

    /// Current position on the tracer timeline
    pub fn now(&self) -> u64 {
        self.shared.time_base.now()
    }

    pub fn time_base(&self) -> &TimeBase {
        &self.shared.time_base
    }

    /// Whether a collector for `kind` is attached on `backend`
    pub fn has_collector(&self, backend: Backend, kind: EventKind) -> bool {
        let slots = match kind {
            EventKind::HostCall => &self.shared.host,
            EventKind::DeviceCommand => &self.shared.device,
        };
        slots[backend.index()].is_some()
    }
}

impl Shared {
    fn accepting(&self) -> bool {
        if TraceGuard::inactive() {
            return false;
        }
        !self.options.conditional_collection || self.gate.is_open()
    }

    fn collectors(&self) -> impl Iterator<Item = &Collector> {
        self.host.iter().chain(self.device.iter()).flatten()
    }

    fn teardown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        let elapsed = self.time_base.now();
        for collector in self.collectors() {
            collector.disable();
        }

        if self.options.host_timing {
            let snapshots = snapshots(&self.host);
            self.logger
                .log(&timing_report(ReportKind::Api, elapsed, &sections(&snapshots)));
        }
        if self.options.device_timing {
            let snapshots = snapshots(&self.device);
            self.logger
                .log(&timing_report(ReportKind::Device, elapsed, &sections(&snapshots)));
        }
        if self.options.kernel_submission {
            let snapshots = snapshots(&self.device);
            self.logger.log(&submission_report(elapsed, &sections(&snapshots)));
        }
        self.logger.flush();

        if let Some(trace) = &self.trace {
            match trace.close(elapsed) {
                Ok(()) => info!("Timeline was stored to {}", trace.path().display()),
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(path) = self.logger.path() {
            info!("Log was stored to {}", path.display());
        }
    }
}

/// Probe one event kind on a device and wrap it in a collector
fn attach(
    platform: &dyn Platform,
    device: &DeviceHandle,
    kind: EventKind,
    time_base: &Arc<TimeBase>,
) -> Result<Collector, BackendError> {
    let interception = platform.attach(device, kind)?;
    Ok(Collector::new(device.backend, kind, time_base.clone()).with_interception(interception))
}

fn call_listener(
    options: &OptionSet,
    pid: u32,
    logger: &Arc<Logger>,
    trace: Option<&Arc<TraceWriter>>,
) -> Option<CallListener> {
    let trace = match select_host_callback(options) {
        Some(HostCallback::TraceSpan) => trace.cloned(),
        None => None,
    };
    if !options.call_logging && trace.is_none() {
        return None;
    }

    let logger = options.call_logging.then(|| logger.clone());
    let pid = options.need_pid.then_some(pid);
    let need_tid = options.need_tid;

    let listener: CallListener = Arc::new(move |span: &CallSpan<'_>| {
        let tid = utils::tid();
        if let Some(logger) = &logger {
            logger.log(&call_log_lines(span, pid, need_tid.then_some(tid)));
        }
        if let Some(trace) = &trace {
            trace.write_call(tid, span);
        }
    });
    Some(listener)
}

fn command_listener(
    options: &OptionSet,
    pid: u32,
    logger: &Arc<Logger>,
    trace: Option<&Arc<TraceWriter>>,
) -> Option<CommandListener> {
    let callback = select_device_callback(options)?;

    let logger = callback.writes_timeline().then(|| logger.clone());
    let trace = callback
        .trace_layout()
        .and_then(|layout| trace.map(|trace| (layout, trace.clone())));
    let pid = options.need_pid.then_some(pid);

    let listener: CommandListener = Arc::new(move |span: &CommandSpan<'_>| {
        if let Some(logger) = &logger {
            logger.log(&device_timeline_line(span, pid));
        }
        if let Some((layout, trace)) = &trace {
            trace.write_command(*layout, span);
        }
    });
    Some(listener)
}

/// Present backends with their totals and sorted statistics
fn snapshots(slots: &Slots) -> Vec<(Backend, u64, Vec<CommandStat>)> {
    slots
        .iter()
        .flatten()
        .map(|collector| (collector.backend(), collector.total(), collector.snapshot()))
        .collect()
}

fn sections(snapshots: &[(Backend, u64, Vec<CommandStat>)]) -> Vec<Section<'_>> {
    snapshots
        .iter()
        .map(|(backend, total_ns, stats)| Section {
            backend: *backend,
            total_ns: *total_ns,
            stats,
        })
        .collect()
}
