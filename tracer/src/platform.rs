//! Interception platform interface
//!
//! Device discovery and the vendor tracing extension live outside the
//! tracer. A [`Platform`] hands out device handles and attaches interception
//! for one (backend, event kind) pair; the returned [`Interception`] is
//! detached when the owning collector is disabled.

use crate::error::BackendError;
use lumen_shared::types::events::{Backend, EventKind};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Opaque device reference owned by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub backend: Backend,
    pub raw: u64,
}

/// Live interception installed for one collector
pub trait Interception: Send {
    /// Stop delivering events
    fn detach(&mut self);
}

/// Source of devices and interception handles
pub trait Platform {
    /// Device for the backend, if one is present
    fn device(&self, backend: Backend) -> Option<DeviceHandle>;

    /// Install interception for one event kind on a device
    fn attach(
        &self,
        device: &DeviceHandle,
        kind: EventKind,
    ) -> Result<Box<dyn Interception>, BackendError>;
}

/// Platform with a fixed device list, for replaying recorded events and
/// for tests
#[derive(Debug, Clone, Default)]
pub struct StaticPlatform {
    devices: Vec<Backend>,
    refused: HashSet<(Backend, EventKind)>,
    detached: Arc<Mutex<Vec<(Backend, EventKind)>>>,
}

impl StaticPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform exposing both backends
    pub fn all() -> Self {
        Self::new().with_device(Backend::Cpu).with_device(Backend::Gpu)
    }

    pub fn with_device(mut self, backend: Backend) -> Self {
        if !self.devices.contains(&backend) {
            self.devices.push(backend);
        }
        self
    }

    /// Make attaching `kind` on `backend` fail
    pub fn refuse(mut self, backend: Backend, kind: EventKind) -> Self {
        self.refused.insert((backend, kind));
        self
    }

    /// Interceptions detached so far, in order
    pub fn detached(&self) -> Vec<(Backend, EventKind)> {
        self.detached
            .lock()
            .map(|detached| detached.clone())
            .unwrap_or_default()
    }
}

impl Platform for StaticPlatform {
    fn device(&self, backend: Backend) -> Option<DeviceHandle> {
        self.devices.contains(&backend).then(|| DeviceHandle {
            backend,
            raw: backend.index() as u64 + 1,
        })
    }

    fn attach(
        &self,
        device: &DeviceHandle,
        kind: EventKind,
    ) -> Result<Box<dyn Interception>, BackendError> {
        if self.refused.contains(&(device.backend, kind)) {
            return Err(BackendError::Attach {
                backend: device.backend,
                kind,
                reason: "tracing extension unavailable".to_string(),
            });
        }
        Ok(Box::new(RecordingInterception {
            key: (device.backend, kind),
            detached: self.detached.clone(),
        }))
    }
}

struct RecordingInterception {
    key: (Backend, EventKind),
    detached: Arc<Mutex<Vec<(Backend, EventKind)>>>,
}

impl Interception for RecordingInterception {
    fn detach(&mut self) {
        if let Ok(mut detached) = self.detached.lock() {
            detached.push(self.key);
        }
    }
}
