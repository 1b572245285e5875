//! Longest-match-at-earliest-position search over a [`SecretTable`].
//!
//! The search is a plain scan: at each position every entry that starts
//! with the byte found there is compared, longest first. Secret sets are
//! small and operator managed, so this stays cheap; a shared automaton would
//! only pay off for large sets.

use crate::table::SecretTable;

/// A confirmed occurrence of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    /// Offset of the first secret byte.
    pub start: usize,
    /// Offset one past the last secret byte.
    pub end: usize,
    /// Bytes to emit instead of `[start, end)`.
    pub substitute: &'a [u8],
}

impl Match<'_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Finds secrets in a window of bytes.
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine<'a> {
    table: &'a SecretTable,
}

impl<'a> MatchEngine<'a> {
    pub fn new(table: &'a SecretTable) -> Self {
        Self { table }
    }

    /// Exclusive bound of the positions [`find_next`](Self::find_next) examines.
    ///
    /// Before end of stream a position needs at least `max_pattern_len`
    /// bytes after it to be decided: a shorter match there could still be
    /// beaten by a longer one completed by the next read. Positions from the
    /// bound onwards form the boundary carry.
    pub fn scan_limit(&self, len: usize, at_eof: bool) -> usize {
        let max = self.table.max_pattern_len();
        if at_eof || max == 0 {
            len
        } else {
            len.saturating_sub(max - 1)
        }
    }

    /// Find the first secret starting at or after `from`.
    ///
    /// When several secrets start at the same position the longest wins.
    pub fn find_next(&self, data: &[u8], from: usize, at_eof: bool) -> Option<Match<'a>> {
        if self.table.is_empty() {
            return None;
        }
        let limit = self.scan_limit(data.len(), at_eof);
        (from..limit).find_map(|pos| self.match_at(data, pos))
    }

    /// The longest secret starting exactly at `pos`, if any.
    pub fn match_at(&self, data: &[u8], pos: usize) -> Option<Match<'a>> {
        let rest = data.get(pos..)?;
        let first = *rest.first()?;
        self.table
            .candidates(first)
            .find(|entry| rest.starts_with(entry.pattern()))
            .map(|entry| Match {
                start: pos,
                end: pos + entry.pattern().len(),
                substitute: entry.substitute(),
            })
    }
}
