//! Command implementations

pub mod env;
pub mod replay;

use clap::Args;
use lumen_tracer::OptionSet;
use std::path::PathBuf;

/// Tracing flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct TraceArgs {
    /// Print every host call as it completes
    #[arg(long)]
    pub call_logging: bool,

    /// Report host API timing at exit
    #[arg(long)]
    pub host_timing: bool,

    /// Report device execution timing at exit
    #[arg(long)]
    pub device_timing: bool,

    /// Report queued/submit/execute totals per kernel at exit
    #[arg(long)]
    pub kernel_submission: bool,

    /// Print every device command as it completes
    #[arg(long)]
    pub device_timeline: bool,

    /// Write host calls to the JSON trace
    #[arg(long)]
    pub chrome_call_logging: bool,

    /// Write device commands to the JSON trace, one track per queue
    #[arg(long)]
    pub chrome_device_timeline: bool,

    /// Write device commands to the JSON trace, one track per kernel
    #[arg(long)]
    pub chrome_kernel_timeline: bool,

    /// Write queued/submitted/executed stages to the JSON trace
    #[arg(long)]
    pub chrome_device_stages: bool,

    /// Append SIMD width and launch sizes to kernel names
    #[arg(long)]
    pub kernel_verbose: bool,

    /// Demangle kernel names
    #[arg(long)]
    pub demangle: bool,

    /// Prefix console lines with the thread ID
    #[arg(long)]
    pub tid: bool,

    /// Prefix console lines with the process ID
    #[arg(long)]
    pub pid: bool,

    /// Write console output to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Only record while LUMEN_ENABLE_COLLECTION is set
    #[arg(long)]
    pub conditional_collection: bool,

    /// JSON trace path (default: lumen_trace.<pid>.json)
    #[arg(long)]
    pub trace_file: Option<PathBuf>,
}

impl TraceArgs {
    /// Turn on every option given on the command line
    pub fn apply(&self, options: &mut OptionSet) {
        let flags = [
            (self.call_logging, &mut options.call_logging),
            (self.host_timing, &mut options.host_timing),
            (self.device_timing, &mut options.device_timing),
            (self.kernel_submission, &mut options.kernel_submission),
            (self.device_timeline, &mut options.device_timeline),
            (self.chrome_call_logging, &mut options.chrome_call_logging),
            (self.chrome_device_timeline, &mut options.chrome_device_timeline),
            (self.chrome_kernel_timeline, &mut options.chrome_kernel_timeline),
            (self.chrome_device_stages, &mut options.chrome_device_stages),
            (self.kernel_verbose, &mut options.verbose),
            (self.demangle, &mut options.demangle),
            (self.tid, &mut options.need_tid),
            (self.pid, &mut options.need_pid),
            (self.conditional_collection, &mut options.conditional_collection),
        ];
        for (given, option) in flags {
            if given {
                *option = true;
            }
        }

        if let Some(path) = &self.log_file {
            options.log_to_file = true;
            options.log_file = Some(path.clone());
        }
        if let Some(path) = &self.trace_file {
            options.trace_file = Some(path.clone());
        }
    }

    /// Options from the command line alone
    pub fn to_options(&self) -> OptionSet {
        let mut options = OptionSet::default();
        self.apply(&mut options);
        options
    }
}
