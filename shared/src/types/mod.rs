//! Event and statistics data structures

pub mod events;
pub mod stats;
