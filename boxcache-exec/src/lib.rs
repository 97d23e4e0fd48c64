//! Sandbox lifecycle, the `Spawn` execution abstraction, and the driver (`isolated_call`) that
//! ties staging, caching, and harvesting into one sandboxed invocation (components E, F, I, J).
//!
//! Nothing here installs a process-wide logging handler or mutates the process environment
//! outside the span of a single `isolated_call`: the sandbox's `in/` directory is the only place
//! the process's current directory is ever pointed at, and it's restored on every exit path by
//! the sandbox root guard's `Drop` impl, panics included.

mod config;
mod driver;
mod errors;
mod logging;
mod sandbox;
mod scrub;
mod spawn;

pub use config::{default_cache_dir, default_log_dir};
pub use driver::isolated_call;
pub use errors::BoxError;
pub use logging::DriverLog;
pub use spawn::{ProcessSpawn, RecordedCall, RecordingSpawn, Spawn};
