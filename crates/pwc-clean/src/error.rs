//! Error types for the scrubbing engine.
//!
//! Errors never carry secret bytes: patterns are referred to by length only.

use crate::cleaner::CleanerState;
use thiserror::Error;

/// Result type for cleaner operations.
pub type Result<T> = std::result::Result<T, CleanError>;

/// Which side of a stream session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    Read,
    Write,
}

impl std::fmt::Display for IoDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoDirection::Read => write!(f, "read"),
            IoDirection::Write => write!(f, "write"),
        }
    }
}

/// Errors that can occur while configuring or running a cleaner.
#[derive(Error, Debug)]
pub enum CleanError {
    /// A caller-supplied argument was rejected (empty or unknown pattern).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation is not allowed in the cleaner's current state.
    #[error("{operation} not allowed while cleaner is {state}")]
    InvalidState {
        operation: &'static str,
        state: CleanerState,
    },

    /// The allocator refused to grow the scan buffer.
    #[error("out of memory reserving {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The scan buffer invariant was violated. Indicates a defect.
    #[error("scan buffer overflow: need {needed} bytes, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },

    /// The bound read or write operation failed.
    #[error("{direction} operation failed: {source}")]
    IoFailure {
        direction: IoDirection,
        #[source]
        source: std::io::Error,
    },
}

impl CleanError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            CleanError::InvalidParameter(_) => 64,
            CleanError::InvalidState { .. } => 65,
            CleanError::OutOfMemory { .. } => 66,
            CleanError::Overflow { .. } => 67,
            CleanError::IoFailure {
                direction: IoDirection::Read,
                ..
            } => 70,
            CleanError::IoFailure {
                direction: IoDirection::Write,
                ..
            } => 71,
        }
    }

    pub(crate) fn read(source: std::io::Error) -> Self {
        CleanError::IoFailure {
            direction: IoDirection::Read,
            source,
        }
    }

    pub(crate) fn write(source: std::io::Error) -> Self {
        CleanError::IoFailure {
            direction: IoDirection::Write,
            source,
        }
    }

    /// True for failures signalled by the caller's read or write operation.
    pub fn is_io(&self) -> bool {
        matches!(self, CleanError::IoFailure { .. })
    }
}
