//! Tracer options
//!
//! The option set is an immutable snapshot of the enabled reporting modes.
//! It is built from `LUMEN_*` environment variables (what an injected
//! profiler sees) or by the command-line tool, validated once, and handed to
//! [`Tracer::start`](crate::Tracer::start).

use crate::error::ConfigError;
use lumen_shared::utils::{flag_enabled, with_pid_suffix};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix shared by every environment variable the tracer reads
pub const ENV_PREFIX: &str = "LUMEN_";

/// Default trace file name; the process ID is inserted before the extension
pub const DEFAULT_TRACE_FILE: &str = "lumen_trace.json";

type FlagField = fn(&mut OptionSet) -> &mut bool;

/// Environment suffix and field of every boolean option
const FLAGS: &[(&str, FlagField)] = &[
    ("CallLogging", |o| &mut o.call_logging),
    ("HostTiming", |o| &mut o.host_timing),
    ("DeviceTiming", |o| &mut o.device_timing),
    ("KernelSubmission", |o| &mut o.kernel_submission),
    ("DeviceTimeline", |o| &mut o.device_timeline),
    ("ChromeCallLogging", |o| &mut o.chrome_call_logging),
    ("ChromeDeviceTimeline", |o| &mut o.chrome_device_timeline),
    ("ChromeKernelTimeline", |o| &mut o.chrome_kernel_timeline),
    ("ChromeDeviceStages", |o| &mut o.chrome_device_stages),
    ("Verbose", |o| &mut o.verbose),
    ("Demangle", |o| &mut o.demangle),
    ("Tid", |o| &mut o.need_tid),
    ("Pid", |o| &mut o.need_pid),
    ("LogToFile", |o| &mut o.log_to_file),
    ("ConditionalCollection", |o| &mut o.conditional_collection),
];

/// Enabled reporting modes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionSet {
    /// Log every host call to the console
    pub call_logging: bool,
    /// Report host API time per function
    pub host_timing: bool,
    /// Report device execution time per kernel
    pub device_timing: bool,
    /// Report queued/submit/execute intervals per kernel
    pub kernel_submission: bool,
    /// Log every device command to the console
    pub device_timeline: bool,
    /// Trace host calls to the JSON trace file
    pub chrome_call_logging: bool,
    /// Trace device commands to the JSON trace file, one track per queue
    pub chrome_device_timeline: bool,
    /// Trace device commands to the JSON trace file, one track per kernel
    pub chrome_kernel_timeline: bool,
    /// Trace the three lifecycle stages of every device command
    pub chrome_device_stages: bool,
    /// Include launch geometry in kernel names
    pub verbose: bool,
    /// Demangle kernel names
    pub demangle: bool,
    /// Prefix host call lines with the thread ID
    pub need_tid: bool,
    /// Prefix console lines with the process ID
    pub need_pid: bool,
    /// Write the console report to `log_file` instead of stdout
    pub log_to_file: bool,
    pub log_file: Option<PathBuf>,
    /// Consult the collection gate before recording each event
    pub conditional_collection: bool,
    /// Trace file path; defaults to `lumen_trace.<pid>.json`
    pub trace_file: Option<PathBuf>,
}

impl OptionSet {
    /// Read options from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = OptionSet::default();
        for (suffix, field) in FLAGS {
            let value = lookup(&format!("{}{}", ENV_PREFIX, suffix));
            *field(&mut options) = flag_enabled(value.as_deref());
        }

        if options.log_to_file {
            options.log_file = lookup(&format!("{}LogFilename", ENV_PREFIX))
                .filter(|name| !name.trim().is_empty())
                .map(PathBuf::from);
        }
        options.trace_file = lookup(&format!("{}TraceFilename", ENV_PREFIX))
            .filter(|name| !name.trim().is_empty())
            .map(PathBuf::from);

        options.validate()?;
        Ok(options)
    }

    /// Environment assignments that reproduce these options
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut options = self.clone();
        let mut vars = Vec::new();
        for (suffix, field) in FLAGS {
            if *field(&mut options) {
                vars.push((format!("{}{}", ENV_PREFIX, suffix), "1".to_string()));
            }
        }
        if let (true, Some(path)) = (self.log_to_file, &self.log_file) {
            vars.push((format!("{}LogFilename", ENV_PREFIX), path.display().to_string()));
        }
        if let Some(path) = &self.trace_file {
            vars.push((format!("{}TraceFilename", ENV_PREFIX), path.display().to_string()));
        }
        vars
    }

    /// Reject option combinations the reporters cannot honor together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chrome_device_timeline && self.chrome_device_stages {
            return Err(ConfigError::Conflict(
                "chrome-device-timeline",
                "chrome-device-stages",
            ));
        }
        if self.chrome_device_timeline && self.chrome_kernel_timeline {
            return Err(ConfigError::Conflict(
                "chrome-device-timeline",
                "chrome-kernel-timeline",
            ));
        }
        if self.log_to_file && self.log_file.is_none() {
            return Err(ConfigError::MissingLogFile);
        }
        Ok(())
    }

    /// Whether any option needs device command collectors
    pub fn wants_device_commands(&self) -> bool {
        self.device_timing
            || self.kernel_submission
            || self.device_timeline
            || self.chrome_device_timeline
            || self.chrome_kernel_timeline
            || self.chrome_device_stages
    }

    /// Whether any option needs host call collectors
    pub fn wants_host_calls(&self) -> bool {
        self.call_logging || self.chrome_call_logging || self.host_timing
    }

    /// Whether a JSON trace file is written
    pub fn wants_trace_file(&self) -> bool {
        self.chrome_call_logging
            || self.chrome_device_timeline
            || self.chrome_kernel_timeline
            || self.chrome_device_stages
    }

    /// Where the JSON trace goes
    pub fn trace_path(&self, pid: u32) -> PathBuf {
        self.trace_file
            .clone()
            .unwrap_or_else(|| with_pid_suffix(DEFAULT_TRACE_FILE, pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_flags() {
        let options = OptionSet::from_lookup(lookup(&[
            ("LUMEN_HostTiming", "1"),
            ("LUMEN_ChromeDeviceStages", "1"),
            ("LUMEN_Pid", "1"),
            ("LUMEN_DeviceTiming", "0"),
        ]))
        .unwrap();

        assert!(options.host_timing);
        assert!(options.chrome_device_stages);
        assert!(options.need_pid);
        assert!(!options.device_timing);
        assert!(!options.call_logging);
    }

    #[test]
    fn test_from_lookup_log_file() {
        let options = OptionSet::from_lookup(lookup(&[
            ("LUMEN_LogToFile", "1"),
            ("LUMEN_LogFilename", "out.txt"),
        ]))
        .unwrap();
        assert_eq!(options.log_file, Some(PathBuf::from("out.txt")));

        let err = OptionSet::from_lookup(lookup(&[("LUMEN_LogToFile", "1")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingLogFile);
    }

    #[test]
    fn test_conflicting_chrome_modes_rejected() {
        let options = OptionSet {
            chrome_device_timeline: true,
            chrome_device_stages: true,
            ..Default::default()
        };
        assert_eq!(
            options.validate(),
            Err(ConfigError::Conflict("chrome-device-timeline", "chrome-device-stages"))
        );

        let options = OptionSet {
            chrome_device_timeline: true,
            chrome_kernel_timeline: true,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = OptionSet {
            chrome_kernel_timeline: true,
            chrome_device_stages: true,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_env_round_trip() {
        let options = OptionSet {
            device_timeline: true,
            chrome_kernel_timeline: true,
            log_to_file: true,
            log_file: Some(PathBuf::from("report.txt")),
            ..Default::default()
        };
        let vars = options.to_env();
        let map: HashMap<String, String> = vars.into_iter().collect();
        assert_eq!(map.get("LUMEN_DeviceTimeline").map(String::as_str), Some("1"));

        let parsed = OptionSet::from_lookup(|key| map.get(key).cloned()).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_requirements() {
        let options = OptionSet {
            kernel_submission: true,
            ..Default::default()
        };
        assert!(options.wants_device_commands());
        assert!(!options.wants_host_calls());
        assert!(!options.wants_trace_file());
        assert_eq!(options.trace_path(12), PathBuf::from("lumen_trace.12.json"));
    }
}
