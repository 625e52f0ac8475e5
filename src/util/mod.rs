//! Helpers for hosts embedding the analyzer.

pub mod logging;

pub use logging::{init_default, init_logging, LoggingConfig};
