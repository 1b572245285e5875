//! Machine-readable payloads printed by the CLI.

use chrono::{DateTime, Utc};
use pwc_clean::RunStats;
use pwc_config::ConfigSnapshot;
use serde::{Deserialize, Serialize};

/// Summary of one `pwclean clean` invocation, printed with `--stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,

    /// Input path, or "-" for stdin.
    pub input: String,

    /// Output path, or "-" for stdout.
    pub output: String,

    pub secret_count: usize,

    /// Chunk size actually used per read.
    pub chunk_size: usize,

    pub config: ConfigSnapshot,
    pub stats: RunStats,
}

impl CleanReport {
    pub fn duration_between(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> i64 {
        (finished_at - started_at).num_milliseconds().max(0)
    }
}

/// One line of `pwclean list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretListing {
    pub index: usize,
    pub pattern_len: usize,
    pub substitute: String,

    /// Pattern text; only with `--reveal` and only if it is UTF-8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Hex pattern; only with `--reveal` for binary patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_hex: Option<String>,
}

impl SecretListing {
    pub fn new(index: usize, pattern: &[u8], substitute: &[u8], reveal: bool) -> Self {
        let (text, hex) = match (reveal, std::str::from_utf8(pattern)) {
            (false, _) => (None, None),
            (true, Ok(text)) => (Some(text.to_string()), None),
            (true, Err(_)) => (None, Some(hex::encode(pattern))),
        };
        Self {
            index,
            pattern_len: pattern.len(),
            substitute: String::from_utf8_lossy(substitute).into_owned(),
            pattern: text,
            pattern_hex: hex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_hides_pattern_by_default() {
        let listing = SecretListing::new(0, b"hunter2", b"***", false);
        let json = serde_json::to_string(&listing).unwrap();
        assert_eq!(json, r#"{"index":0,"pattern_len":7,"substitute":"***"}"#);
    }

    #[test]
    fn test_listing_reveal() {
        let text = SecretListing::new(1, b"hunter2", b"***", true);
        assert_eq!(text.pattern.as_deref(), Some("hunter2"));
        assert!(text.pattern_hex.is_none());

        let binary = SecretListing::new(2, &[0xde, 0xad, 0xff], b"?", true);
        assert!(binary.pattern.is_none());
        assert_eq!(binary.pattern_hex.as_deref(), Some("deadff"));
    }

    #[test]
    fn test_duration_never_negative() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::milliseconds(250);
        assert_eq!(CleanReport::duration_between(earlier, now), 250);
        assert_eq!(CleanReport::duration_between(now, earlier), 0);
    }
}
