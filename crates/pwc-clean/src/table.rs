//! The set of secrets to scrub and their substitutes.

use crate::{CleanError, Result};

/// One secret and the bytes that replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pattern: Vec<u8>,
    substitute: Vec<u8>,
}

impl SecretEntry {
    /// The secret bytes. Never empty.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// The replacement bytes. May be empty.
    pub fn substitute(&self) -> &[u8] {
        &self.substitute
    }
}

/// Owned table of unique secret patterns.
///
/// Besides the entries themselves the table keeps two derived values that
/// are rebuilt on every mutation: the longest pattern length, which sizes the
/// boundary carry of a streaming run, and a first-byte index listing, for
/// every possible leading byte, the entries starting with it ordered longest
/// first.
#[derive(Debug, Clone)]
pub struct SecretTable {
    entries: Vec<SecretEntry>,
    max_pattern_len: usize,
    by_first_byte: Vec<Vec<usize>>,
}

impl Default for SecretTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_pattern_len: 0,
            by_first_byte: vec![Vec::new(); 256],
        }
    }

    /// Insert a secret, or replace the substitute of an existing one.
    ///
    /// Both byte strings are copied. Returns `true` when the pattern was new.
    pub fn add(&mut self, pattern: &[u8], substitute: &[u8]) -> Result<bool> {
        if pattern.is_empty() {
            return Err(CleanError::InvalidParameter(
                "secret pattern must not be empty".to_string(),
            ));
        }

        let inserted = match self.position(pattern) {
            Some(idx) => {
                self.entries[idx].substitute = substitute.to_vec();
                false
            }
            None => {
                self.entries.push(SecretEntry {
                    pattern: pattern.to_vec(),
                    substitute: substitute.to_vec(),
                });
                true
            }
        };

        self.reindex();
        tracing::debug!(
            target: "pwc_clean::table",
            pattern_len = pattern.len(),
            substitute_len = substitute.len(),
            inserted,
            entries = self.entries.len(),
            max_pattern_len = self.max_pattern_len,
            "secret added"
        );
        Ok(inserted)
    }

    /// Remove a secret. Fails if the pattern is empty or unknown.
    pub fn remove(&mut self, pattern: &[u8]) -> Result<SecretEntry> {
        if pattern.is_empty() {
            return Err(CleanError::InvalidParameter(
                "secret pattern must not be empty".to_string(),
            ));
        }
        let idx = self.position(pattern).ok_or_else(|| {
            CleanError::InvalidParameter(format!(
                "no secret of length {} is registered",
                pattern.len()
            ))
        })?;

        let removed = self.entries.remove(idx);
        self.reindex();
        tracing::debug!(
            target: "pwc_clean::table",
            pattern_len = pattern.len(),
            entries = self.entries.len(),
            max_pattern_len = self.max_pattern_len,
            "secret removed"
        );
        Ok(removed)
    }

    /// Call `visit(pattern, substitute)` once per entry, in insertion order.
    ///
    /// Meant for diagnostics; the match path never enumerates.
    pub fn enumerate<F>(&self, mut visit: F)
    where
        F: FnMut(&[u8], &[u8]),
    {
        for entry in &self.entries {
            visit(&entry.pattern, &entry.substitute);
        }
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SecretEntry> {
        self.entries.iter()
    }

    /// Length of the longest registered pattern, 0 when empty.
    pub fn max_pattern_len(&self) -> usize {
        self.max_pattern_len
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pattern: &[u8]) -> bool {
        self.position(pattern).is_some()
    }

    /// Entries whose pattern starts with `byte`, longest first.
    pub(crate) fn candidates(&self, byte: u8) -> impl Iterator<Item = &SecretEntry> {
        self.by_first_byte[byte as usize]
            .iter()
            .map(move |&idx| &self.entries[idx])
    }

    fn position(&self, pattern: &[u8]) -> Option<usize> {
        self.entries.iter().position(|e| e.pattern == pattern)
    }

    fn reindex(&mut self) {
        self.max_pattern_len = self
            .entries
            .iter()
            .map(|e| e.pattern.len())
            .max()
            .unwrap_or(0);

        for bucket in &mut self.by_first_byte {
            bucket.clear();
        }
        for (idx, entry) in self.entries.iter().enumerate() {
            self.by_first_byte[entry.pattern[0] as usize].push(idx);
        }
        let entries = &self.entries;
        for bucket in &mut self.by_first_byte {
            bucket.sort_by(|&a, &b| entries[b].pattern.len().cmp(&entries[a].pattern.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tracks_max_len() {
        let mut table = SecretTable::new();
        assert_eq!(table.max_pattern_len(), 0);

        assert!(table.add(b"pass", b"*").unwrap());
        assert!(table.add(b"password", b"*").unwrap());
        assert_eq!(table.max_pattern_len(), 8);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_add_empty_pattern_rejected() {
        let mut table = SecretTable::new();
        let err = table.add(b"", b"x").unwrap_err();
        assert!(matches!(err, CleanError::InvalidParameter(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_empty_substitute_allowed() {
        let mut table = SecretTable::new();
        table.add(b"token", b"").unwrap();
        assert_eq!(table.iter().next().unwrap().substitute(), b"");
    }

    #[test]
    fn test_add_overwrites_substitute() {
        let mut table = SecretTable::new();
        assert!(table.add(b"secret", b"A").unwrap());
        assert!(!table.add(b"secret", b"B").unwrap());
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().unwrap().substitute(), b"B");
    }

    #[test]
    fn test_remove_recomputes_max_len() {
        let mut table = SecretTable::new();
        table.add(b"ab", b"1").unwrap();
        table.add(b"abcdef", b"2").unwrap();

        let removed = table.remove(b"abcdef").unwrap();
        assert_eq!(removed.pattern(), b"abcdef");
        assert_eq!(table.max_pattern_len(), 2);

        table.remove(b"ab").unwrap();
        assert_eq!(table.max_pattern_len(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_unknown_or_empty_rejected() {
        let mut table = SecretTable::new();
        table.add(b"known", b"x").unwrap();

        assert!(matches!(
            table.remove(b"unknown"),
            Err(CleanError::InvalidParameter(_))
        ));
        assert!(matches!(
            table.remove(b""),
            Err(CleanError::InvalidParameter(_))
        ));
        assert!(table.contains(b"known"));
    }

    #[test]
    fn test_unknown_pattern_error_hides_bytes() {
        let mut table = SecretTable::new();
        let err = table.remove(b"hunter2").unwrap_err();
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_enumerate_insertion_order() {
        let mut table = SecretTable::new();
        table.add(b"zeta", b"1").unwrap();
        table.add(b"alpha", b"2").unwrap();
        table.add(b"mid", b"3").unwrap();
        table.add(b"zeta", b"4").unwrap();

        let mut seen = Vec::new();
        table.enumerate(|p, s| seen.push((p.to_vec(), s.to_vec())));
        assert_eq!(
            seen,
            vec![
                (b"zeta".to_vec(), b"4".to_vec()),
                (b"alpha".to_vec(), b"2".to_vec()),
                (b"mid".to_vec(), b"3".to_vec()),
            ]
        );
    }

    #[test]
    fn test_candidates_longest_first() {
        let mut table = SecretTable::new();
        table.add(b"ab", b"1").unwrap();
        table.add(b"abcd", b"2").unwrap();
        table.add(b"abc", b"3").unwrap();
        table.add(b"xyz", b"4").unwrap();

        let lens: Vec<usize> = table.candidates(b'a').map(|e| e.pattern().len()).collect();
        assert_eq!(lens, vec![4, 3, 2]);
        assert_eq!(table.candidates(b'x').count(), 1);
        assert_eq!(table.candidates(b'q').count(), 0);
    }
}
