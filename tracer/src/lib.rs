//! Lumen tracer
//!
//! Correlates completed host API calls and device commands from the CPU and
//! GPU backends onto one timeline, aggregates them per name and multiplexes
//! them to the console timeline, the JSON trace file and the summary tables
//! printed at shutdown.

pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod guard;
pub mod output;
pub mod platform;
pub mod time_base;
pub mod tracer;

pub use collector::{Collector, NameOptions};
pub use config::OptionSet;
pub use dispatch::{DeviceCallback, HostCallback, TraceLayout};
pub use error::{BackendError, ConfigError, OrderingError, TracerError};
pub use gate::{CollectionGate, EnvGate, SwitchGate};
pub use guard::TraceGuard;
pub use platform::{DeviceHandle, Interception, Platform, StaticPlatform};
pub use time_base::TimeBase;
pub use tracer::{Tracer, TracerHandle};
