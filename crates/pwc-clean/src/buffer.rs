//! The active window of a streaming run.

use crate::io::ChunkSource;
use crate::{CleanError, Result};

/// Owned byte buffer with a logical capacity and an emit cursor.
///
/// Bytes in `[0, emit)` have been handed to the output (or discarded as a
/// matched secret); bytes in `[emit, len)` are still pending. The logical
/// capacity only ever grows.
#[derive(Debug, Default)]
pub struct ScanBuffer {
    data: Vec<u8>,
    emit: usize,
    capacity: usize,
}

impl ScanBuffer {
    /// Create a buffer with no storage; call [`grow_to`](Self::grow_to) first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer able to hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buffer = Self::new();
        buffer.grow_to(capacity)?;
        Ok(buffer)
    }

    /// Ensure the buffer can hold at least `min_capacity` bytes.
    ///
    /// Existing content is preserved. Never shrinks.
    pub fn grow_to(&mut self, min_capacity: usize) -> Result<()> {
        if min_capacity <= self.capacity {
            return Ok(());
        }
        let additional = min_capacity - self.data.len();
        self.data
            .try_reserve_exact(additional)
            .map_err(|_| CleanError::OutOfMemory {
                requested: min_capacity,
            })?;
        tracing::trace!(
            target: "pwc_clean::buffer",
            from = self.capacity,
            to = min_capacity,
            "scan buffer grown"
        );
        self.capacity = min_capacity;
        Ok(())
    }

    /// Append `bytes` at the end of the window.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let needed = self.data.len() + bytes.len();
        if needed > self.capacity {
            return Err(CleanError::Overflow {
                needed,
                capacity: self.capacity,
            });
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Read at most `max_len` bytes from `source` into the free tail.
    ///
    /// Returns the number of bytes read; 0 means end of stream. On failure
    /// the window is left exactly as it was.
    pub fn fill_from(&mut self, source: &mut dyn ChunkSource, max_len: usize) -> Result<usize> {
        let start = self.data.len();
        let want = max_len.min(self.capacity - start);
        if want == 0 {
            return Err(CleanError::Overflow {
                needed: start + max_len.max(1),
                capacity: self.capacity,
            });
        }

        self.data.resize(start + want, 0);
        match source.read_chunk(&mut self.data[start..]) {
            Ok(n) if n <= want => {
                self.data.truncate(start + n);
                Ok(n)
            }
            Ok(n) => {
                self.data.truncate(start);
                Err(CleanError::Overflow {
                    needed: start + n,
                    capacity: start + want,
                })
            }
            Err(err) => {
                self.data.truncate(start);
                Err(CleanError::read(err))
            }
        }
    }

    /// Return and discard `[emit, offset)`, advancing the emit cursor.
    ///
    /// Offsets at or before the cursor yield an empty slice; offsets past
    /// the end are clamped.
    pub fn consume_up_to(&mut self, offset: usize) -> &[u8] {
        let offset = offset.min(self.data.len());
        if offset <= self.emit {
            return &[];
        }
        let start = self.emit;
        self.emit = offset;
        &self.data[start..offset]
    }

    /// Move the last `keep_len` pending bytes to the front of the buffer.
    ///
    /// Everything before them is dropped and the emit cursor is reset to 0.
    pub fn carry_tail(&mut self, keep_len: usize) -> Result<()> {
        let pending = self.pending_len();
        if keep_len > pending {
            return Err(CleanError::Overflow {
                needed: keep_len,
                capacity: pending,
            });
        }
        let len = self.data.len();
        self.data.copy_within(len - keep_len..len, 0);
        self.data.truncate(keep_len);
        self.emit = 0;
        Ok(())
    }

    /// Drop all content, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.emit = 0;
    }

    /// The whole window, including already emitted bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes not yet emitted.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.emit..]
    }

    pub fn pending_len(&self) -> usize {
        self.data.len() - self.emit
    }

    pub fn emit_cursor(&self) -> usize {
        self.emit
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::source_fn;

    #[test]
    fn test_append_respects_capacity() {
        let mut buf = ScanBuffer::with_capacity(4).unwrap();
        buf.append(b"abc").unwrap();
        let err = buf.append(b"de").unwrap_err();
        assert!(matches!(
            err,
            CleanError::Overflow {
                needed: 5,
                capacity: 4
            }
        ));
        assert_eq!(buf.data(), b"abc");
    }

    #[test]
    fn test_consume_advances_cursor() {
        let mut buf = ScanBuffer::with_capacity(16).unwrap();
        buf.append(b"hello world").unwrap();

        assert_eq!(buf.consume_up_to(5), b"hello");
        assert_eq!(buf.emit_cursor(), 5);
        assert_eq!(buf.consume_up_to(3), b"");
        assert_eq!(buf.consume_up_to(100), b" world");
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_carry_tail_moves_pending_suffix() {
        let mut buf = ScanBuffer::with_capacity(16).unwrap();
        buf.append(b"0123456789").unwrap();
        buf.consume_up_to(7);

        buf.carry_tail(3).unwrap();
        assert_eq!(buf.data(), b"789");
        assert_eq!(buf.emit_cursor(), 0);

        buf.append(b"abc").unwrap();
        assert_eq!(buf.pending(), b"789abc");
    }

    #[test]
    fn test_carry_tail_rejects_emitted_bytes() {
        let mut buf = ScanBuffer::with_capacity(8).unwrap();
        buf.append(b"abcd").unwrap();
        buf.consume_up_to(3);
        assert!(matches!(
            buf.carry_tail(2),
            Err(CleanError::Overflow { .. })
        ));
    }

    #[test]
    fn test_grow_preserves_content_and_never_shrinks() {
        let mut buf = ScanBuffer::with_capacity(4).unwrap();
        buf.append(b"abcd").unwrap();
        buf.grow_to(10).unwrap();
        assert_eq!(buf.capacity(), 10);
        assert_eq!(buf.data(), b"abcd");

        buf.grow_to(2).unwrap();
        assert_eq!(buf.capacity(), 10);
        buf.append(b"efghij").unwrap();
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_fill_from_reads_into_tail() {
        let mut buf = ScanBuffer::with_capacity(8).unwrap();
        buf.append(b"ab").unwrap();
        let mut input: &[u8] = b"cdefghijk";

        assert_eq!(buf.fill_from(&mut input, 4).unwrap(), 4);
        assert_eq!(buf.data(), b"abcdef");
        // only two bytes of room left
        assert_eq!(buf.fill_from(&mut input, 4).unwrap(), 2);
        assert_eq!(buf.data(), b"abcdefgh");
        assert!(matches!(
            buf.fill_from(&mut input, 4),
            Err(CleanError::Overflow { .. })
        ));
    }

    #[test]
    fn test_fill_from_failure_keeps_window() {
        let mut buf = ScanBuffer::with_capacity(8).unwrap();
        buf.append(b"keep").unwrap();
        let mut failing = source_fn(|_buf: &mut [u8]| Err(std::io::Error::other("boom")));

        let err = buf.fill_from(&mut failing, 4).unwrap_err();
        assert!(err.is_io());
        assert_eq!(buf.data(), b"keep");
    }

    #[test]
    fn test_fill_from_rejects_overlong_read() {
        let mut buf = ScanBuffer::with_capacity(8).unwrap();
        let mut lying = source_fn(|buf: &mut [u8]| Ok(buf.len() + 1));

        assert!(matches!(
            buf.fill_from(&mut lying, 4),
            Err(CleanError::Overflow { .. })
        ));
        assert!(buf.is_empty());
    }
}
