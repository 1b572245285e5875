//! Typed representation of `pwclean.json`.

use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};

/// Substitute used when neither the entry nor the file names one.
pub const DEFAULT_SUBSTITUTE: &str = "^^^PASSWORD^^^";

/// How a pattern string is turned into bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternEncoding {
    /// The pattern is used as its UTF-8 bytes.
    #[default]
    Utf8,
    /// The pattern is hex-encoded binary.
    Hex,
}

/// One configured secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    pub pattern: String,

    /// Falls back to the file's `default_substitute`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute: Option<String>,

    #[serde(default)]
    pub encoding: PatternEncoding,
}

impl SecretSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            substitute: None,
            encoding: PatternEncoding::Utf8,
        }
    }

    pub fn with_substitute(mut self, substitute: impl Into<String>) -> Self {
        self.substitute = Some(substitute.into());
        self
    }

    pub fn hex(mut self) -> Self {
        self.encoding = PatternEncoding::Hex;
        self
    }

    /// Decode the pattern into the bytes to match.
    ///
    /// `index` only labels the error. Messages never include pattern text.
    pub fn pattern_bytes(&self, index: usize) -> ValidationResult<Vec<u8>> {
        let bytes = match self.encoding {
            PatternEncoding::Utf8 => self.pattern.as_bytes().to_vec(),
            PatternEncoding::Hex => hex::decode(self.pattern.trim()).map_err(|e| {
                let message = match e {
                    hex::FromHexError::InvalidHexCharacter { index, .. } => {
                        format!("invalid hex digit at offset {}", index)
                    }
                    hex::FromHexError::OddLength => "odd number of hex digits".to_string(),
                    _ => "invalid hex length".to_string(),
                };
                ValidationError::InvalidValue {
                    field: format!("secrets[{}].pattern", index),
                    message,
                }
            })?,
        };
        if bytes.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("secrets[{}].pattern", index),
                message: "Must not be empty".to_string(),
            });
        }
        Ok(bytes)
    }
}

/// Contents of a `pwclean.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Bytes per read; 0 selects the engine default.
    #[serde(default)]
    pub chunk_size: usize,

    #[serde(default = "default_substitute")]
    pub default_substitute: String,

    #[serde(default)]
    pub secrets: Vec<SecretSpec>,

    /// Pass log output through the configured secrets as well.
    #[serde(default = "default_true")]
    pub scrub_logs: bool,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_substitute() -> String {
    DEFAULT_SUBSTITUTE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            chunk_size: 0,
            default_substitute: default_substitute(),
            secrets: Vec::new(),
            scrub_logs: true,
        }
    }
}

impl CleanConfig {
    /// Substitute for one entry.
    pub fn substitute_for<'a>(&'a self, spec: &'a SecretSpec) -> &'a str {
        spec.substitute.as_deref().unwrap_or(&self.default_substitute)
    }

    /// Decoded `(pattern, substitute)` pairs in file order.
    pub fn decoded_secrets(&self) -> ValidationResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.secrets
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let pattern = spec.pattern_bytes(i)?;
                Ok((pattern, self.substitute_for(spec).as_bytes().to_vec()))
            })
            .collect()
    }
}
