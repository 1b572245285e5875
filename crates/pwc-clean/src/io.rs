//! Read and write operations bound to a cleaning run.
//!
//! A [`ChunkSource`] returns `Ok(0)` at end of stream, `Ok(n)` with
//! `n <= buf.len()` for data, and `Err` when the read failed. A
//! [`ChunkSink`] must accept the whole buffer: any count other than
//! `buf.len()` aborts the run.
//!
//! Every `std::io::Read` is a source and every `std::io::Write` is a sink.
//! Closures can be bound with [`source_fn`] and [`sink_fn`].

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Supplies input bytes to a cleaning run.
pub trait ChunkSource {
    /// Read at most `buf.len()` bytes into `buf`.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Receives cleaned bytes from a cleaning run.
pub trait ChunkSink {
    /// Write `buf`, returning the number of bytes accepted.
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Called once after the final write of a successful run.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read + ?Sized> ChunkSource for R {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

impl<W: Write + ?Sized> ChunkSink for W {
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }
}

/// Source backed by a closure.
pub struct FnSource<F>(F);

/// Wrap a closure as a [`ChunkSource`].
pub fn source_fn<F>(f: F) -> FnSource<F>
where
    F: FnMut(&mut [u8]) -> io::Result<usize>,
{
    FnSource(f)
}

impl<F> ChunkSource for FnSource<F>
where
    F: FnMut(&mut [u8]) -> io::Result<usize>,
{
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (self.0)(buf)
    }
}

/// Sink backed by a closure.
pub struct FnSink<F>(F);

/// Wrap a closure as a [`ChunkSink`].
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(&[u8]) -> io::Result<usize>,
{
    FnSink(f)
}

impl<F> ChunkSink for FnSink<F>
where
    F: FnMut(&[u8]) -> io::Result<usize>,
{
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<usize> {
        (self.0)(buf)
    }
}

/// In-memory sink whose contents stay reachable after it has been bound.
///
/// Clones share the same storage, so one clone can be handed to
/// [`Cleaner::bind_io`](crate::Cleaner::bind_io) while another is kept to
/// inspect the output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take everything written so far, leaving the buffer empty.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkSink for SharedBuffer {
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }
}
