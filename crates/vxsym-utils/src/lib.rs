//! # vxsym Utilities
//!
//! Shared utilities for the vxsym workspace.
//!
//! For now that is the logging setup built on `tracing`, used by the `vxsym`
//! binary. Library code only emits events through the `tracing` macros.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogGuard, LogLevel, LoggingError, init_logging, init_logging_to_dir, init_logging_with_level};
pub use tracing::{debug, error, info, trace, warn};
