//! Loading a resolved configuration and turning it into a cleaner.

use std::path::{Path, PathBuf};

use pwc_clean::{CleanError, Cleaner};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CleanConfig;
use crate::resolve::{resolve_config_path, ConfigSource, ENV_CHUNK_SIZE};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_chunk_size, validate_config, ValidationError};

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Secret rejected by cleaner: {0}")]
    SecretError(#[from] CleanError),
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 50,
            ConfigError::ParseError { .. } => 51,
            ConfigError::IoError { .. } => 52,
            ConfigError::ValidationError(e) => e.code(),
            ConfigError::SecretError(e) => e.code(),
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit config file path (highest priority).
    pub config_path: Option<PathBuf>,

    /// Ignore PWCLEAN_CHUNK_SIZE.
    pub ignore_env_overrides: bool,
}

/// Loaded configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The loaded configuration.
    pub config: CleanConfig,

    /// Path of the file (None if using defaults).
    pub path: Option<PathBuf>,

    /// Where the path came from.
    pub source: ConfigSource,

    /// SHA-256 of the file content (None if using defaults).
    pub hash: Option<String>,
}

impl ResolvedConfig {
    /// Built-in defaults: no secrets.
    pub fn builtin() -> Self {
        Self {
            config: CleanConfig::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
            hash: None,
        }
    }

    /// Re-run validation after the caller changed `config`.
    pub fn revalidate(&self) -> Result<(), ConfigError> {
        validate_config(&self.config)?;
        Ok(())
    }

    /// Create a cleaner holding every configured secret.
    pub fn build_cleaner(&self) -> Result<Cleaner, ConfigError> {
        let mut cleaner = Cleaner::new(self.config.chunk_size);
        for (pattern, substitute) in self.config.decoded_secrets()? {
            cleaner.add(pattern, substitute)?;
        }
        tracing::debug!(
            secrets = cleaner.len(),
            chunk_size = cleaner.chunk_size(),
            "cleaner built from config"
        );
        Ok(cleaner)
    }

    /// Snapshot for diagnostics and run reports.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self)
    }
}

/// Load configuration with the standard resolution order.
///
/// A missing file anywhere but on the command line falls back to defaults.
/// PWCLEAN_CHUNK_SIZE overrides the file's chunk size.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let located = resolve_config_path(options.config_path.as_deref());

    let mut resolved = match located.path {
        Some(path) => {
            let (config, hash) = load_config_from_file(&path)?;
            ResolvedConfig {
                config,
                path: Some(path),
                source: located.source,
                hash: Some(hash),
            }
        }
        None => ResolvedConfig::builtin(),
    };

    if !options.ignore_env_overrides {
        if let Some(chunk_size) = chunk_size_from_env()? {
            resolved.config.chunk_size = chunk_size;
        }
    }

    validate_config(&resolved.config)?;

    tracing::info!(
        source = %resolved.source,
        secrets = resolved.config.secrets.len(),
        chunk_size = resolved.config.chunk_size,
        "configuration loaded"
    );
    Ok(resolved)
}

/// Load and parse one config file, returning it with its content hash.
pub fn load_config_from_file(path: &Path) -> Result<(CleanConfig, String), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hash = compute_hash(content.as_bytes());

    let config: CleanConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok((config, hash))
}

fn chunk_size_from_env() -> Result<Option<usize>, ConfigError> {
    let Ok(raw) = std::env::var(ENV_CHUNK_SIZE) else {
        return Ok(None);
    };
    let chunk_size = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| ValidationError::InvalidValue {
            field: ENV_CHUNK_SIZE.to_string(),
            message: e.to_string(),
        })?;
    validate_chunk_size(ENV_CHUNK_SIZE, chunk_size)?;
    Ok(Some(chunk_size))
}

/// SHA-256 of `content`, lowercase hex.
pub fn compute_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
