//! Logging configuration.
//!
//! The level comes from `-v`/`-q`, then `PWCLEAN_LOG`, then the default.
//! `RUST_LOG` is handed to the filter as-is by `init_logging`.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const ENV_LOG_LEVEL: &str = "PWCLEAN_LOG";
pub const ENV_LOG_FORMAT: &str = "PWCLEAN_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format (default).
    #[default]
    Human,
    /// Machine-parseable JSON lines.
    #[value(alias = "json")]
    Jsonl,
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Warnings and errors (default; stderr stays quiet for pipelines).
    #[default]
    #[value(alias = "warning")]
    Warn,
    Error,
    #[value(alias = "none")]
    Off,
}

impl LogLevel {
    /// Level for a `-v` count, or `Error` when quiet.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Name understood by `EnvFilter` directives.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

fn env_value<T: ValueEnum>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    T::from_str(raw.trim(), true).ok()
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Timestamps on human lines.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Warn,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Combine CLI flags with `PWCLEAN_LOG` and `PWCLEAN_LOG_FORMAT`.
    ///
    /// Unparseable environment values are ignored.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        let defaults = LogConfig::default();
        LogConfig {
            level: cli_level
                .or_else(|| env_value(ENV_LOG_LEVEL))
                .unwrap_or(defaults.level),
            format: cli_format
                .or_else(|| env_value(ENV_LOG_FORMAT))
                .unwrap_or(defaults.format),
            ..defaults
        }
    }
}
