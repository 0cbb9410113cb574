//! Telemetry module for the Strata runtime.
//!
//! Provides structured logging. All output goes to stderr or a configured
//! file - no network dependencies.

mod logging;

pub use logging::{init_logging, LogConfig, LogError, LogOutput};
