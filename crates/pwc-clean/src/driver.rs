//! End-to-end cleaning of one stream.
//!
//! The driver alternates strictly between reading a chunk, scanning the
//! window and writing what was decided. Staged output is always flushed
//! before the next read, so a failing read never loses bytes that were
//! already cleaned, and nothing is written after a failure.

use crate::buffer::ScanBuffer;
use crate::io::{ChunkSink, ChunkSource};
use crate::matcher::MatchEngine;
use crate::table::SecretTable;
use crate::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::io;

/// Counters for one cleaning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Bytes pulled from the source.
    pub bytes_read: u64,
    /// Bytes handed to the sink.
    pub bytes_written: u64,
    /// Secrets replaced.
    pub replacements: u64,
    /// Non-empty reads performed.
    pub chunks: u64,
}

/// Output staging area of at most one chunk.
struct Emitter {
    staged: Vec<u8>,
    limit: usize,
    written: u64,
}

impl Emitter {
    fn new(limit: usize) -> Self {
        Self {
            staged: Vec::with_capacity(limit.min(64 * 1024)),
            limit: limit.max(1),
            written: 0,
        }
    }

    fn emit(&mut self, sink: &mut dyn ChunkSink, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if self.staged.len() + bytes.len() > self.limit {
            self.flush(sink)?;
        }
        if bytes.len() >= self.limit {
            return self.write(sink, bytes);
        }
        self.staged.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self, sink: &mut dyn ChunkSink) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let staged = std::mem::take(&mut self.staged);
        let result = self.write(sink, &staged);
        self.staged = staged;
        self.staged.clear();
        result
    }

    fn write(&mut self, sink: &mut dyn ChunkSink, bytes: &[u8]) -> Result<()> {
        let n = sink.write_chunk(bytes).map_err(CleanError::write)?;
        if n != bytes.len() {
            return Err(CleanError::write(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes accepted", n, bytes.len()),
            )));
        }
        self.written += n as u64;
        Ok(())
    }
}

/// Runs one clean over a table, a scan buffer and a chunk size.
pub struct StreamDriver<'a> {
    engine: MatchEngine<'a>,
    chunk_size: usize,
    stats: RunStats,
}

impl<'a> StreamDriver<'a> {
    /// `chunk_size` is raised to the table's longest pattern if smaller.
    pub fn new(table: &'a SecretTable, chunk_size: usize) -> Self {
        Self {
            engine: MatchEngine::new(table),
            chunk_size: chunk_size.max(table.max_pattern_len()).max(1),
            stats: RunStats::default(),
        }
    }

    /// Capacity the scan buffer needs for this driver.
    pub fn required_capacity(&self) -> usize {
        self.chunk_size.saturating_mul(2)
    }

    /// Clean everything `source` yields into `sink`.
    pub fn run(
        mut self,
        buffer: &mut ScanBuffer,
        source: &mut dyn ChunkSource,
        sink: &mut dyn ChunkSink,
    ) -> Result<RunStats> {
        buffer.grow_to(self.required_capacity())?;
        buffer.clear();
        let mut out = Emitter::new(self.chunk_size);

        loop {
            let n = buffer.fill_from(source, self.chunk_size)?;
            let at_eof = n == 0;
            if !at_eof {
                self.stats.bytes_read += n as u64;
                self.stats.chunks += 1;
            }

            self.drain_window(buffer, &mut out, sink, at_eof)?;
            out.flush(sink)?;

            if at_eof {
                break;
            }
            let keep = buffer.pending_len();
            buffer.carry_tail(keep)?;
            tracing::trace!(
                target: "pwc_clean::driver",
                read = n,
                carried = keep,
                "window processed"
            );
        }

        sink.flush().map_err(CleanError::write)?;
        buffer.clear();
        self.stats.bytes_written = out.written;
        Ok(self.stats)
    }

    /// Clean a complete in-memory input into `sink`.
    pub fn run_slice(mut self, input: &[u8], sink: &mut dyn ChunkSink) -> Result<RunStats> {
        let mut out = Emitter::new(self.chunk_size);
        let mut pos = 0;
        while let Some(m) = self.engine.find_next(input, pos, true) {
            out.emit(sink, &input[pos..m.start])?;
            out.emit(sink, m.substitute)?;
            self.stats.replacements += 1;
            pos = m.end;
        }
        out.emit(sink, &input[pos..])?;
        out.flush(sink)?;

        self.stats.bytes_read = input.len() as u64;
        self.stats.chunks = u64::from(!input.is_empty());
        self.stats.bytes_written = out.written;
        Ok(self.stats)
    }

    /// Emit every decided byte of the window.
    ///
    /// Before end of stream the undecided suffix stays pending in `buffer`.
    fn drain_window(
        &mut self,
        buffer: &mut ScanBuffer,
        out: &mut Emitter,
        sink: &mut dyn ChunkSink,
        at_eof: bool,
    ) -> Result<()> {
        let engine = self.engine;
        let mut pos = buffer.emit_cursor();

        while let Some(m) = engine.find_next(buffer.data(), pos, at_eof) {
            out.emit(sink, buffer.consume_up_to(m.start))?;
            buffer.consume_up_to(m.end);
            out.emit(sink, m.substitute)?;
            self.stats.replacements += 1;
            pos = m.end;
        }

        let stop = engine.scan_limit(buffer.len(), at_eof).max(pos);
        out.emit(sink, buffer.consume_up_to(stop))?;
        Ok(())
    }
}
