//! Collection gates
//!
//! With conditional collection enabled, the tracer asks a gate before
//! recording each event. A closed gate drops the event without touching the
//! collectors, so a session can be attached early and sampled on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Variable the default gate reads
pub const ENABLE_COLLECTION_VAR: &str = "LUMEN_ENABLE_COLLECTION";

/// Decides whether events are recorded right now
pub trait CollectionGate: Send + Sync {
    fn is_open(&self) -> bool;
}

/// Gate driven by `LUMEN_ENABLE_COLLECTION`: open unless unset, empty or `0`
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvGate;

impl CollectionGate for EnvGate {
    fn is_open(&self) -> bool {
        match std::env::var(ENABLE_COLLECTION_VAR) {
            Ok(value) => !value.is_empty() && value != "0",
            Err(_) => false,
        }
    }
}

/// Gate flipped programmatically
#[derive(Debug, Clone, Default)]
pub struct SwitchGate {
    open: Arc<AtomicBool>,
}

impl SwitchGate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Arc::new(AtomicBool::new(open)),
        }
    }

    pub fn set(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }
}

impl CollectionGate for SwitchGate {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
