//! Structured logging for pwclean.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for pipelines
//!
//! # Design Notes
//!
//! - stdout carries cleaned data or command payloads only
//! - stderr receives all log output (human or JSONL)
//! - Every formatted log line passes through the process-wide log cleaner
//!   when one is registered, so configured secrets never reach stderr

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use pwc_clean::{Cleaner, SharedCleaner};
use std::io::{self, IsTerminal, Write};
use std::sync::{PoisonError, RwLock};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Event names used as the `event` field of lifecycle log lines.
pub mod event_names {
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const RUN_STARTED: &str = "clean.started";
    pub const RUN_FINISHED: &str = "clean.finished";
    pub const RUN_FAILED: &str = "clean.failed";
}

static LOG_CLEANER: RwLock<Option<SharedCleaner>> = RwLock::new(None);

/// Shown instead of a message the log cleaner could not process.
pub const SUPPRESSED_MESSAGE: &str = "pwclean: error message suppressed";

/// Register `cleaner`'s secrets for every log line. Returns the previous
/// log cleaner.
///
/// The formatters escape field values before the line reaches the writer,
/// so each UTF-8 secret is also registered in the forms it takes there:
/// `Debug` escaped (human string fields), JSON escaped, and JSON escaped
/// `Debug` (`?field` in JSON lines). Substitutes are escaped the same way
/// to keep JSON lines valid.
pub fn set_log_cleaner(cleaner: &Cleaner) -> pwc_clean::Result<Option<SharedCleaner>> {
    let mut secrets = Vec::with_capacity(cleaner.len());
    cleaner.dump(|pattern, substitute| secrets.push((pattern.to_vec(), substitute.to_vec())));

    let mut log_cleaner = Cleaner::new(cleaner.chunk_size());
    for (pattern, substitute) in &secrets {
        let Ok(pattern) = std::str::from_utf8(pattern) else {
            continue;
        };
        let substitute = String::from_utf8_lossy(substitute);
        let escapes: [fn(&str) -> Option<String>; 3] =
            [debug_escaped, json_escaped, json_escaped_debug];
        for escape in escapes {
            if let (Some(form), Some(replacement)) = (escape(pattern), escape(&*substitute)) {
                log_cleaner.add(form, replacement)?;
            }
        }
    }
    // raw forms take precedence over a colliding escaped form
    for (pattern, substitute) in &secrets {
        log_cleaner.add(pattern, substitute)?;
    }

    let mut slot = LOG_CLEANER.write().unwrap_or_else(PoisonError::into_inner);
    Ok(slot.replace(SharedCleaner::new(log_cleaner)))
}

/// Stop cleaning log lines. Returns the cleaner that was registered.
pub fn clear_log_cleaner() -> Option<SharedCleaner> {
    let mut slot = LOG_CLEANER.write().unwrap_or_else(PoisonError::into_inner);
    slot.take()
}

/// The currently registered log cleaner, if any.
pub fn log_cleaner() -> Option<SharedCleaner> {
    LOG_CLEANER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// `message` passed through the log cleaner, ready for stderr.
pub fn clean_message(message: &str) -> Vec<u8> {
    match log_cleaner() {
        Some(cleaner) => cleaned_or_suppressed(cleaner.clean_to_vec(message)),
        None => message.as_bytes().to_vec(),
    }
}

fn cleaned_or_suppressed(cleaned: pwc_clean::Result<Vec<u8>>) -> Vec<u8> {
    cleaned.unwrap_or_else(|_| SUPPRESSED_MESSAGE.as_bytes().to_vec())
}

fn unquote(quoted: &str) -> Option<String> {
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::to_string)
}

fn debug_escaped(s: &str) -> Option<String> {
    unquote(&format!("{:?}", s))
}

fn json_escaped(s: &str) -> Option<String> {
    serde_json::to_string(s).ok().and_then(|quoted| unquote(&quoted))
}

fn json_escaped_debug(s: &str) -> Option<String> {
    debug_escaped(s).and_then(|escaped| json_escaped(&escaped))
}

/// [`MakeWriter`] that scrubs each formatted event before it is written.
#[derive(Debug, Clone)]
pub struct CleaningMakeWriter<M = fn() -> io::Stderr> {
    inner: M,
}

impl CleaningMakeWriter {
    pub fn stderr() -> Self {
        Self { inner: io::stderr }
    }
}

impl<M> CleaningMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for CleaningMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = CleaningWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        CleaningWriter::new(self.inner.make_writer())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        CleaningWriter::new(self.inner.make_writer_for(meta))
    }
}

/// Buffers one event and writes it cleaned on flush or drop.
///
/// The formatter hands over a complete event per writer, so a secret is
/// never split across two cleaning passes.
pub struct CleaningWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> CleaningWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    fn drain(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.pending);
        match log_cleaner() {
            Some(cleaner) => {
                cleaner
                    .clean_to_writer(&line, &mut self.inner)
                    .map_err(io::Error::other)?;
            }
            None => self.inner.write_all(&line)?,
        }
        self.inner.flush()
    }
}

impl<W: Write> Write for CleaningWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain()
    }
}

impl<W: Write> Drop for CleaningWriter<W> {
    fn drop(&mut self) {
        let _ = self.drain();
    }
}

fn default_directives(level: LogLevel) -> String {
    ["pwclean", "pwc_cli", "pwc_config", "pwc_clean"]
        .iter()
        .map(|target| format!("{}={}", target, level.directive()))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_subscriber<M>(
    config: &LogConfig,
    filter: EnvFilter,
    make_writer: M,
    ansi: bool,
) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    M: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let writer = CleaningMakeWriter::new(make_writer);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_ansi(ansi);
            if config.timestamps {
                Box::new(registry.with(layer))
            } else {
                Box::new(registry.with(layer.without_time()))
            }
        }
        LogFormat::Jsonl => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(false)
                .with_span_list(false);
            Box::new(registry.with(layer))
        }
    }
}

/// Subscriber writing cleaned log lines to `make_writer`.
///
/// Ignores RUST_LOG; the level comes from `config` alone.
pub fn make_subscriber<M>(
    config: &LogConfig,
    make_writer: M,
) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    M: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::new(default_directives(config.level));
    build_subscriber(config, filter, make_writer, false)
}

/// Initialize the logging subsystem on stderr.
///
/// Must be called once at startup before any logging occurs.
/// RUST_LOG, when set, replaces the level-derived filter.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level)));
    let ansi = io::stderr().is_terminal();
    let subscriber = build_subscriber(config, filter, io::stderr, ansi);
    tracing::subscriber::set_global_default(subscriber)
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid.simple().to_string()[..12])
}
