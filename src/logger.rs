use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use strum_macros::Display;

/// Severity levels understood by the logging macros, ordered from least to most severe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

/// Error returned when a log level name is not one of the five known levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogLevel(pub String);

impl std::fmt::Display for UnknownLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "log level must be one of DEBUG, INFO, WARNING, ERROR, CRITICAL, got '{}'",
            self.0
        )
    }
}

impl std::error::Error for UnknownLogLevel {}

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Sets the minimum level a message needs to be printed. Called once at startup.
pub fn set_level(level: LogLevel) { MIN_LEVEL.store(level as u8, Ordering::Relaxed); }

/// Returns `true` if messages at `level` currently pass the filter.
pub fn enabled(level: LogLevel) -> bool { level as u8 >= MIN_LEVEL.load(Ordering::Relaxed) }

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::LogLevel::Debug) {
            println!("\x1b[90m[DEBUG][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::LogLevel::Info) {
            println!("\x1b[32m[INFO] [{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::LogLevel::Warning) {
            println!("\x1b[35m[WARN] [{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::LogLevel::Error) {
            println!("\x1b[31m[ERROR][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        println!("\x1b[1;31m[CRIT] [{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        panic!("\x1b[1;31m[FATAL][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! event {
    ($($arg:tt)*) => {
        if std::env::var("LOG_DRONE_EVENTS").is_ok() {
            println!("\x1b[36m[EVENT][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
        }
    };
}
