//! Error types for the tracer

use lumen_shared::types::events::{Backend, EventKind};
use std::path::PathBuf;
use thiserror::Error;

/// Conflicting or incomplete options
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("options --{0} and --{1} can't be used together, choose one of them")]
    Conflict(&'static str, &'static str),

    #[error("log file name is not specified")]
    MissingLogFile,
}

/// A timestamp that breaks the ordering the timeline relies on
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderingError {
    #[error("timestamp {timestamp} predates the tracer origin {origin}")]
    BeforeOrigin { timestamp: u64, origin: u64 },

    #[error("{earlier} ({earlier_ts}) is not before {later} ({later_ts})")]
    OutOfOrder {
        earlier: &'static str,
        earlier_ts: u64,
        later: &'static str,
        later_ts: u64,
    },
}

/// Failure to attach to one backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no {0} device found")]
    NoDevice(Backend),

    #[error("unable to attach {kind} interception to the {backend} backend: {reason}")]
    Attach {
        backend: Backend,
        kind: EventKind,
        reason: String,
    },
}

/// Tracer construction failures
#[derive(Debug, Error)]
pub enum TracerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no backend available for {0} collection")]
    NoBackend(EventKind),

    #[error("failed to open {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
