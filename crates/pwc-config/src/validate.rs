//! Configuration validation errors and semantic validation.

use std::collections::HashMap;
use thiserror::Error;

use crate::config::CleanConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest accepted chunk size (1 GiB).
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024 * 1024;

/// Configuration validation errors.
///
/// None of the messages carry pattern bytes; entries are referred to by index.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Duplicate pattern: secrets[{index}] repeats secrets[{first}]")]
    DuplicatePattern { index: usize, first: usize },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::MissingField(_) => 63,
            ValidationError::InvalidValue { .. } => 64,
            ValidationError::VersionMismatch { .. } => 65,
            ValidationError::DuplicatePattern { .. } => 66,
        }
    }
}

/// Validate a config semantically.
pub fn validate_config(config: &CleanConfig) -> ValidationResult<()> {
    if config.schema_version.is_empty() {
        return Err(ValidationError::MissingField("schema_version".to_string()));
    }
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_chunk_size("chunk_size", config.chunk_size)?;
    validate_secrets(config)?;

    Ok(())
}

/// Validate a chunk size coming from any source.
pub fn validate_chunk_size(field: &str, chunk_size: usize) -> ValidationResult<()> {
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be at most {}, got {}", MAX_CHUNK_SIZE, chunk_size),
        });
    }
    Ok(())
}

/// Every pattern must decode to a non-empty byte string, and no two
/// entries may decode to the same bytes.
fn validate_secrets(config: &CleanConfig) -> ValidationResult<()> {
    let mut seen: HashMap<Vec<u8>, usize> = HashMap::with_capacity(config.secrets.len());

    for (index, spec) in config.secrets.iter().enumerate() {
        let bytes = spec.pattern_bytes(index)?;
        if let Some(&first) = seen.get(&bytes) {
            return Err(ValidationError::DuplicatePattern { index, first });
        }
        seen.insert(bytes, index);
    }

    Ok(())
}
