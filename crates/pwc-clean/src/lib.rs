//! Streaming credential scrubbing engine for pwclean.
//!
//! This crate removes a configured set of literal secrets from arbitrarily
//! large byte streams, replacing every occurrence with its substitute while
//! keeping memory bounded by the chunk size.
//!
//! # Key Features
//!
//! - **Boundary safe**: secrets split across reads are still found, because
//!   the undecided tail of every window is carried into the next one.
//! - **Longest match**: when secrets overlap at one position the longest wins,
//!   so no secret suffix is ever left in plain text.
//! - **Single pass**: substitutes are never rescanned.
//! - **Fail-closed**: the first read or write failure aborts the run.
//!
//! # Example
//!
//! ```
//! use pwc_clean::{Cleaner, SharedBuffer};
//!
//! let mut cleaner = Cleaner::new(4);
//! cleaner.add("password", "X").unwrap();
//!
//! // Stream a reader into a sink.
//! let output = SharedBuffer::new();
//! cleaner
//!     .bind_io(std::io::Cursor::new(b"the password is set".to_vec()), output.clone())
//!     .unwrap();
//! let stats = cleaner.run().unwrap();
//! assert_eq!(output.contents(), b"the X is set");
//! assert_eq!(stats.replacements, 1);
//!
//! // Or clean a value already in memory.
//! assert_eq!(cleaner.clean_str("password").unwrap(), "X");
//! ```

pub mod buffer;
pub mod cleaner;
pub mod driver;
pub mod error;
pub mod io;
pub mod matcher;
pub mod table;

pub use buffer::ScanBuffer;
pub use cleaner::{Cleaner, CleanerState, SharedCleaner, StreamSession, DEFAULT_CHUNK_SIZE};
pub use driver::{RunStats, StreamDriver};
pub use error::{CleanError, IoDirection, Result};
pub use io::{sink_fn, source_fn, ChunkSink, ChunkSource, FnSink, FnSource, SharedBuffer};
pub use matcher::{Match, MatchEngine};
pub use table::{SecretEntry, SecretTable};
