//! Shared types and utilities for Lumen
//!
//! This crate contains the event records delivered by the interception layer,
//! the aggregated statistics built from them, and the clock and process
//! helpers used by the tracer and the command-line tool.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{events::*, stats::*};
