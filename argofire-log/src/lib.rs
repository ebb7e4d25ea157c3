//! Logging for the ArgoFire gateway adapter.
//!
//! Log lines go to stderr as JSON by default. Gateway payload dumps are a
//! separate channel ([`dump`]) that only writes when the caller asks for it
//! (a processor configured with `debug`) or when the whole process runs with
//! `ARGOFIRE_DEBUG=1`.
//!
//! # Usage
//!
//! ```rust
//! use argofire_log::{debug, info, warn};
//!
//! info!("processing purchase {}", 42);
//! debug!(target: "argofire::transport", "posting to {}", "https://dev.ftipgw.com");
//! warn!("AVS mismatch");
//! ```
//!
//! # Environment Variables
//!
//! - `ARGOFIRE_DEBUG=1` - enable debug logging and payload dumps
//! - `ARGOFIRE_LOG_LEVEL=trace|debug|info|warn|error|off`
//! - `ARGOFIRE_LOG_FORMAT=json|pretty|compact`

use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One JSON object per line
    Json,
    /// Timestamp, level and target, human readable
    Pretty,
    /// Single-letter level, short timestamp
    Compact,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            _ => None,
        }
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
        }
    }
}

impl LogConfig {
    /// Build the configuration from `ARGOFIRE_*` variables.
    pub fn from_env() -> Self {
        let debug = env::var("ARGOFIRE_DEBUG")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        let level = env::var("ARGOFIRE_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("ARGOFIRE_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        Self {
            debug,
            level,
            format,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Load the environment configuration and apply its level and debug flag
/// to the global switches. Safe to call more than once.
pub fn init() {
    let config = config();
    DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
    LOG_LEVEL.store(config.level as u8, Ordering::SeqCst);
}

/// Global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime. Turning it on also lowers the level to
/// `Debug` when it is currently stricter.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Write one log line. Called by the macros.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }

    match config().format {
        Format::Json => log_json(level, target, message),
        Format::Pretty => log_pretty(level, target, message),
        Format::Compact => log_compact(level, target, message),
    }
}

/// Write a labelled diagnostic block when `enabled` is set or process-wide
/// debug mode is on. Never touches the global debug flag.
///
/// Callers are responsible for redacting card data before handing the
/// payload over.
pub fn dump(enabled: bool, label: &str, payload: &str) {
    if !(enabled || is_debug_enabled()) {
        return;
    }

    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "----------{}----------", label);
    let _ = writeln!(stderr, "{}", payload);
}

fn log_pretty(level: Level, target: &str, message: &str) {
    let mut stderr = std::io::stderr().lock();
    let now = chrono::Local::now();
    let _ = writeln!(
        stderr,
        "{} {:5} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level.as_str(),
        target,
        message
    );
}

fn log_compact(level: Level, target: &str, message: &str) {
    let mut stderr = std::io::stderr().lock();
    let now = chrono::Local::now();
    let short = level.as_str().chars().next().unwrap_or('?');
    let _ = writeln!(stderr, "{} {} {}: {}", now.format("%H:%M:%S"), short, target, message);
}

#[cfg(feature = "json")]
fn log_json(level: Level, target: &str, message: &str) {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Line<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let line = Line {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    if let Ok(json) = serde_json::to_string(&line) {
        eprintln!("{}", json);
    }
}

#[cfg(not(feature = "json"))]
fn log_json(level: Level, target: &str, message: &str) {
    log_compact(level, target, message);
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::__log!($level, target: module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, $($arg)+) };
}

/// Log a debug message. `ARGOFIRE_DEBUG=1` lowers the level so these show.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, $($arg)+) };
}
