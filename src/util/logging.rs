//! Structured logging setup for hosts embedding archscan
//!
//! The analysis core only emits `tracing` events; it never installs a
//! subscriber. Command-line tools, services and tests call one of the
//! helpers here once at startup.
//!
//! # Example
//!
//! ```no_run
//! use archscan::util::logging;
//!
//! logging::init_default();
//!
//! use tracing::{debug, info};
//! info!("Host started");
//! debug!(root = "/repos/shop", "Analyzing repository");
//! ```

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for archscan's own events
    pub level: Level,

    /// Use JSON output format (for structured logging in production)
    pub use_json: bool,

    /// Include the module target (e.g., archscan::languages::scan) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,

    /// Additional `EnvFilter` directives such as `"ignore=warn"`
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    /// INFO level, pretty console output with targets.
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Creates a logging configuration with the specified level
    ///
    /// ```
    /// use archscan::util::LoggingConfig;
    /// use tracing::Level;
    ///
    /// let config = LoggingConfig::with_level(Level::DEBUG);
    /// assert_eq!(config.level, Level::DEBUG);
    /// ```
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with location and thread metadata.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
            directives: Vec::new(),
        }
    }

    /// Pretty console output at debug level, which shows every discovered
    /// manifest and project.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }

    /// The filter this configuration installs. Invalid extra directives are
    /// skipped.
    pub fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(format!("warn,archscan={}", self.level));
        for directive in &self.directives {
            match directive.parse::<Directive>() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring invalid log directive '{}': {}", directive, e),
            }
        }
        filter
    }
}

/// Parses a log level name, case-insensitively.
///
/// ```
/// use archscan::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Some(Level::DEBUG));
/// assert_eq!(parse_level("INFO"), Some(Level::INFO));
/// assert_eq!(parse_level("loud"), None);
/// ```
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber described by `config`.
///
/// Only the first call in a process has an effect. Returns `false` when
/// logging was already initialized, here or by another subscriber.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        let filter = config.env_filter();
        let result = if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        };
        installed = result.is_ok();
    });
    installed
}

/// Initializes logging with [`LoggingConfig::default`].
pub fn init_default() -> bool {
    init_logging(LoggingConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        trace = { "trace", Some(Level::TRACE) },
        debug_mixed_case = { "Debug", Some(Level::DEBUG) },
        info_upper = { "INFO", Some(Level::INFO) },
        warning_alias = { "warning", Some(Level::WARN) },
        error_padded = { " error ", Some(Level::ERROR) },
        invalid = { "loud", None },
        empty = { "", None },
    )]
    fn test_parse_level(input: &str, expected: Option<Level>) {
        assert_eq!(parse_level(input), expected);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
        assert!(!config.include_location);
        assert!(!config.include_thread_ids);
        assert!(config.directives.is_empty());
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert!(config.use_json);
        assert!(config.include_location);
        assert!(config.include_thread_ids);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(!config.use_json);
    }

    #[test]
    fn test_env_filter_includes_crate_level() {
        let config = LoggingConfig {
            directives: vec!["ignore=warn".to_string(), "not a directive=".to_string()],
            ..LoggingConfig::with_level(Level::TRACE)
        };
        let rendered = config.env_filter().to_string().to_lowercase();
        assert!(rendered.contains("archscan=trace"));
        assert!(rendered.contains("ignore=warn"));
    }

    #[test]
    fn test_init_logging_only_once() {
        init_logging(LoggingConfig::with_level(Level::DEBUG));
        assert!(!init_default());
    }
}
