//! Integration test: tracer sessions from start to report
//!
//! Drives the tracer through a static platform, recording host calls and
//! device commands the way interception code would, then checks the console
//! report and the trace file written at shutdown.

use lumen_shared::types::events::{Backend, DeviceCommand, EventKind, HostCall};
use lumen_tracer::{
    ConfigError, OptionSet, StaticPlatform, SwitchGate, TraceGuard, Tracer, TracerError,
};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

struct Session {
    _dir: TempDir,
    log: PathBuf,
    trace: PathBuf,
}

impl Session {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            log: dir.path().join("report.txt"),
            trace: dir.path().join("trace.json"),
            _dir: dir,
        }
    }

    fn options(&self, configure: impl FnOnce(&mut OptionSet)) -> OptionSet {
        let mut options = OptionSet {
            log_to_file: true,
            log_file: Some(self.log.clone()),
            trace_file: Some(self.trace.clone()),
            ..Default::default()
        };
        configure(&mut options);
        options
    }

    fn report(&self) -> String {
        std::fs::read_to_string(&self.log).unwrap()
    }

    fn spans(&self) -> Vec<Value> {
        let text = std::fs::read_to_string(&self.trace).unwrap();
        let events: Vec<Value> = serde_json::from_str(&text).unwrap();
        events.into_iter().filter(|e| e["ph"] == "X").collect()
    }
}

fn call(id: u64, name: &str, started: u64, duration: u64) -> HostCall {
    HostCall {
        id,
        name: name.to_string(),
        started,
        ended: started + duration,
    }
}

fn command(origin: u64, id: u64, name: &str, start_us: u64) -> DeviceCommand {
    let base = origin + start_us * 1_000;
    DeviceCommand {
        id,
        name: name.to_string(),
        queue: "Q".to_string(),
        queued: base,
        submitted: base + 1_000,
        started: base + 2_000,
        ended: base + 5_000,
        launch: None,
    }
}

fn row_tokens(report: &str, name: &str) -> Vec<String> {
    report
        .lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .find(|tokens| tokens.first().map(String::as_str) == Some(name))
        .unwrap_or_default()
}

#[test]
fn test_host_timing_with_trace_spans() {
    let session = Session::new();
    let options = session.options(|o| {
        o.host_timing = true;
        o.chrome_call_logging = true;
    });
    let tracer = Tracer::start(&options, &StaticPlatform::all()).unwrap();
    let handle = tracer.handle();

    handle.host_call(Backend::Gpu, &call(1, "clEnqueueX", 1_000, 100));
    handle.host_call(Backend::Gpu, &call(2, "clEnqueueX", 2_000, 200));
    handle.host_call(Backend::Gpu, &call(3, "clEnqueueX", 3_000, 300));
    tracer.stop();

    let report = session.report();
    assert!(report.contains("=== API Timing Results: ==="));
    assert!(report.contains("== GPU Backend: =="));
    assert!(!report.contains("== CPU Backend: =="));
    assert_eq!(
        row_tokens(&report, "clEnqueueX"),
        vec!["clEnqueueX", "3", "600", "200", "100", "300"]
    );

    let spans = session.spans();
    assert_eq!(spans.len(), 3);
    assert!(spans.iter().all(|s| s["name"] == "clEnqueueX"));
}

#[test]
fn test_device_reports_skip_idle_backend() {
    let session = Session::new();
    let options = session.options(|o| {
        o.device_timing = true;
        o.kernel_submission = true;
    });
    let tracer = Tracer::start(&options, &StaticPlatform::all()).unwrap();
    let handle = tracer.handle();
    let origin = handle.time_base().origin();

    handle.device_command(Backend::Gpu, &command(origin, 1, "vector_add", 10));
    handle.device_command(Backend::Gpu, &command(origin, 2, "vector_add", 20));
    drop(tracer);

    let report = session.report();
    let device = report.find("=== Device Timing Results: ===").unwrap();
    let submission = report.find("=== Kernel Submission Results: ===").unwrap();
    assert!(device < submission);
    assert!(report.contains("Total Device Time for CPU backend (ns): "));
    assert!(!report.contains("== CPU Backend: =="));

    let device_section = &report[device..submission];
    assert_eq!(
        row_tokens(device_section, "vector_add"),
        vec!["vector_add", "2", "6000", "3000", "3000", "3000"]
    );
    assert_eq!(
        row_tokens(&report[submission..], "vector_add"),
        vec!["vector_add", "2", "2000", "2000", "6000"]
    );
    assert!(!session.trace.exists());
}

#[test]
fn test_timeline_and_stage_spans() {
    let session = Session::new();
    let options = session.options(|o| {
        o.device_timeline = true;
        o.chrome_device_stages = true;
        o.need_pid = true;
    });
    let tracer = Tracer::start(&options, &StaticPlatform::all()).unwrap();
    let handle = tracer.handle();
    let origin = handle.time_base().origin();

    handle.device_command(Backend::Cpu, &command(origin, 4, "K", 1));
    tracer.stop();

    let report = session.report();
    assert!(report.contains("Device Timeline: start time (CLOCK_MONOTONIC_RAW) [ns] = "));
    let line = report
        .lines()
        .find(|l| l.contains("Device Timeline (queue: Q)"))
        .unwrap();
    assert!(line.starts_with(&format!("<PID:{}> ", std::process::id())));
    assert!(line.ends_with("= 1000 (queued) 2000 (submit) 3000 (start) 6000 (end)"));

    let spans = session.spans();
    let names: Vec<&str> = spans.iter().map(|s| s["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["K (Queued)", "K (Submitted)", "K (Executed)"]);
    assert!(spans.iter().all(|s| s["tid"] == "4.Q"));
}

#[test]
fn test_call_logging_lines() {
    let session = Session::new();
    let options = session.options(|o| {
        o.call_logging = true;
        o.need_tid = true;
    });
    let tracer = Tracer::start(&options, &StaticPlatform::all()).unwrap();
    tracer.handle().host_call(Backend::Cpu, &call(8, "clFinish", 500, 250));
    tracer.stop();

    let report = session.report();
    assert!(report.contains(">>>> [500] clFinish<8>"));
    assert!(report.contains("<<<< [750] clFinish [250 ns]"));
    assert!(report.lines().all(|l| l.starts_with("<TID:")));
}

#[test]
fn test_failed_attach_drops_backend() {
    let session = Session::new();
    let options = session.options(|o| o.host_timing = true);
    let platform = StaticPlatform::all().refuse(Backend::Cpu, EventKind::HostCall);
    let tracer = Tracer::start(&options, &platform).unwrap();

    let handle = tracer.handle();
    assert!(!handle.has_collector(Backend::Cpu, EventKind::HostCall));
    assert!(handle.has_collector(Backend::Gpu, EventKind::HostCall));

    handle.host_call(Backend::Cpu, &call(1, "ignored", 0, 10));
    tracer.stop();

    let report = session.report();
    assert!(!report.contains("CPU backend"));
    assert!(row_tokens(&report, "ignored").is_empty());
}

#[test]
fn test_failed_attach_keeps_other_kind() {
    let session = Session::new();
    let options = session.options(|o| {
        o.host_timing = true;
        o.device_timing = true;
    });
    let platform = StaticPlatform::all().refuse(Backend::Cpu, EventKind::HostCall);
    let tracer = Tracer::start(&options, &platform).unwrap();

    let handle = tracer.handle();
    assert!(!handle.has_collector(Backend::Cpu, EventKind::HostCall));
    assert!(handle.has_collector(Backend::Cpu, EventKind::DeviceCommand));

    let origin = handle.time_base().origin();
    handle.device_command(Backend::Cpu, &command(origin, 1, "cpu_kernel", 1));
    tracer.stop();

    let report = session.report();
    assert!(!report.contains("Total API Time for CPU backend"));
    assert!(report.contains("== CPU Backend: =="));
    assert_eq!(row_tokens(&report, "cpu_kernel")[1], "1");
}

#[test]
fn test_no_backend_for_requested_kind() {
    let session = Session::new();
    let options = session.options(|o| o.device_timing = true);
    let platform = StaticPlatform::new()
        .with_device(Backend::Gpu)
        .refuse(Backend::Gpu, EventKind::DeviceCommand);

    let err = Tracer::start(&options, &platform).err().unwrap();
    assert!(matches!(err, TracerError::NoBackend(EventKind::DeviceCommand)));
}

#[test]
fn test_conflicting_options_rejected() {
    let session = Session::new();
    let options = session.options(|o| {
        o.chrome_device_timeline = true;
        o.chrome_device_stages = true;
    });
    let err = Tracer::start(&options, &StaticPlatform::all()).err().unwrap();
    assert!(matches!(
        err,
        TracerError::Config(ConfigError::Conflict("chrome-device-timeline", "chrome-device-stages"))
    ));
    assert!(!session.trace.exists());
}

#[test]
fn test_conditional_collection_gate() {
    let session = Session::new();
    let options = session.options(|o| {
        o.host_timing = true;
        o.conditional_collection = true;
    });
    let gate = SwitchGate::new(false);
    let tracer =
        Tracer::start_with_gate(&options, &StaticPlatform::all(), Box::new(gate.clone())).unwrap();
    let handle = tracer.handle();

    handle.host_call(Backend::Cpu, &call(1, "before", 0, 10));
    gate.set(true);
    handle.host_call(Backend::Cpu, &call(2, "during", 20, 10));
    gate.set(false);
    handle.host_call(Backend::Cpu, &call(3, "after", 40, 10));
    tracer.stop();

    let report = session.report();
    assert!(row_tokens(&report, "before").is_empty());
    assert_eq!(row_tokens(&report, "during")[1], "1");
    assert!(row_tokens(&report, "after").is_empty());
}

#[test]
fn test_trace_guard_suppresses_own_calls() {
    let session = Session::new();
    let options = session.options(|o| o.host_timing = true);
    let tracer = Tracer::start(&options, &StaticPlatform::all()).unwrap();
    let handle = tracer.handle();

    {
        let _guard = TraceGuard::new();
        handle.host_call(Backend::Cpu, &call(1, "clGetDeviceInfo", 0, 10));
    }
    handle.host_call(Backend::Cpu, &call(2, "clBuildProgram", 10, 10));
    tracer.stop();

    let report = session.report();
    assert!(row_tokens(&report, "clGetDeviceInfo").is_empty());
    assert_eq!(row_tokens(&report, "clBuildProgram")[1], "1");
}

#[test]
fn test_handles_inert_after_stop() {
    let session = Session::new();
    let options = session.options(|o| o.host_timing = true);
    let platform = StaticPlatform::all();
    let tracer = Tracer::start(&options, &platform).unwrap();
    let handle = tracer.handle();
    tracer.stop();

    let before = session.report();
    handle.host_call(Backend::Cpu, &call(1, "late", 0, 10));
    drop(handle);

    assert_eq!(session.report(), before);
    assert_eq!(platform.detached().len(), 2);
}

#[test]
fn test_concurrent_host_calls() {
    let session = Session::new();
    let options = session.options(|o| o.host_timing = true);
    let tracer = Tracer::start(&options, &StaticPlatform::all()).unwrap();

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let handle = tracer.handle();
            std::thread::spawn(move || {
                for i in 0..250 {
                    handle.host_call(Backend::Gpu, &call(t * 1_000 + i, "clEnqueueY", i, 4));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    tracer.stop();

    let report = session.report();
    assert_eq!(
        row_tokens(&report, "clEnqueueY"),
        vec!["clEnqueueY", "1000", "4000", "4", "4", "4"]
    );
}
