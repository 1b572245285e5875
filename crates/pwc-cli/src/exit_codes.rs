//! Exit codes for the pwclean CLI.
//!
//! Exit code ranges:
//! - 0: Success
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal and I/O errors

use pwc_clean::CleanError;
use pwc_config::ConfigError;

/// Exit codes for pwclean operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: stream cleaned / command completed
    Clean = 0,

    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, malformed or invalid
    ConfigError = 11,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// Reading input or writing output failed
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl From<&CleanError> for ExitCode {
    fn from(err: &CleanError) -> Self {
        match err {
            CleanError::InvalidParameter(_) => ExitCode::ArgsError,
            CleanError::IoFailure { .. } => ExitCode::IoError,
            CleanError::InvalidState { .. }
            | CleanError::OutOfMemory { .. }
            | CleanError::Overflow { .. } => ExitCode::InternalError,
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::SecretError(inner) => ExitCode::from(inner),
            _ => ExitCode::ConfigError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
