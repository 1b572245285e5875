//! Configuration snapshots for diagnostics and run reports.
//!
//! A snapshot records which configuration a run used without revealing any
//! pattern: only counts, sizes and the content hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::load::ResolvedConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// SHA-256 hash of the file content.
    #[serde(default)]
    pub sha256: Option<String>,

    pub secret_count: usize,

    /// Configured chunk size (0 = engine default).
    pub chunk_size: usize,

    pub scrub_logs: bool,
}

impl ConfigSnapshot {
    pub fn new(resolved: &ResolvedConfig) -> Self {
        Self {
            timestamp: Utc::now(),
            schema_version: resolved.config.schema_version.clone(),
            path: resolved.path.as_ref().map(|p| p.display().to_string()),
            source: resolved.source.to_string(),
            sha256: resolved.hash.clone(),
            secret_count: resolved.config.secrets.len(),
            chunk_size: resolved.config.chunk_size,
            scrub_logs: resolved.config.scrub_logs,
        }
    }
}
