//! pwclean configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for pwclean.json
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation (versions, chunk limits, duplicate patterns)
//! - Config snapshots for run reports
//! - Construction of a populated [`pwc_clean::Cleaner`]

pub mod config;
pub mod load;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use config::{CleanConfig, PatternEncoding, SecretSpec, DEFAULT_SUBSTITUTE};
pub use load::{load_config, ConfigError, ConfigOptions, ResolvedConfig};
pub use resolve::{resolve_config_path, ConfigPath, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
