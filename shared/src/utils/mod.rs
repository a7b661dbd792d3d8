//! Utility functions and helpers

pub mod time;

use std::path::PathBuf;

/// Current process ID
pub fn pid() -> u32 {
    std::process::id()
}

/// Current OS thread ID
#[cfg(target_os = "linux")]
pub fn tid() -> u64 {
    // SAFETY: gettid takes no arguments and cannot fail.
    unsafe { libc::syscall(libc::SYS_gettid) as u64 }
}

/// Current OS thread ID
#[cfg(not(target_os = "linux"))]
pub fn tid() -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

/// File name of the running executable
pub fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Interpret an environment flag: only "1" enables it
pub fn flag_enabled(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1"))
}

/// Insert the process ID before the extension of a file name
/// (`trace.json` -> `trace.<pid>.json`)
pub fn with_pid_suffix(path: &str, pid: u32) -> PathBuf {
    let path = PathBuf::from(path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, pid, ext.to_string_lossy()),
        None => format!("{}.{}", stem, pid),
    };
    path.with_file_name(file_name)
}
