//! Console sink
//!
//! Report text goes to stdout, or to the log file when one is configured.
//! Whole chunks are written under one lock so lines from different threads
//! do not interleave.

use crate::error::TracerError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Destination of console report text
pub struct Logger {
    out: Mutex<Box<dyn Write + Send>>,
    path: Option<PathBuf>,
}

impl Logger {
    /// Log to standard output
    pub fn stdout() -> Self {
        Self {
            out: Mutex::new(Box::new(io::stdout())),
            path: None,
        }
    }

    /// Log to a file, truncating it
    pub fn to_file(path: &Path) -> Result<Self, TracerError> {
        let file = File::create(path).map_err(|source| TracerError::Sink {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            out: Mutex::new(Box::new(BufWriter::new(file))),
            path: Some(path.to_path_buf()),
        })
    }

    /// Write a chunk of text as is
    pub fn log(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(text.as_bytes()) {
            warn!("Failed to write report output: {}", e);
        }
    }

    pub fn flush(&self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.flush() {
            warn!("Failed to flush report output: {}", e);
        }
    }

    /// Log file path, if logging to a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
    }
}
