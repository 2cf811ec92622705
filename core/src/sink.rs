//! Bounded buffered sink with durable batch flushes
//!
//! Each sink is written by one producer (the sampler) but may be flushed
//! from several contexts: the producer's own capacity trigger, the
//! cancellation path, and the orchestrator's teardown. The buffer and the
//! destination write are therefore guarded by a single mutex, and `flush`
//! is an idempotent no-op on an empty buffer.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::record::Record;

/// Bounded, flush-on-demand durable writer for one record schema
pub struct BufferedSink<R: Record> {
    path: PathBuf,
    capacity: usize,
    inner: Mutex<Inner<R>>,
}

struct Inner<R> {
    buffer: Vec<R>,
    header_written: bool,
}

impl<R: Record> BufferedSink<R> {
    /// Create a sink writing to `path`, flushing automatically once
    /// `capacity` records have been buffered. The destination file is not
    /// created until the first non-empty flush.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                buffer: Vec::new(),
                header_written: false,
            }),
        }
    }

    /// Destination path of this sink
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, flushing if the buffer has reached capacity.
    /// Reaching capacity is the flush trigger, not a fault.
    pub fn append(&self, record: R) -> Result<()> {
        let mut inner = self.lock()?;
        inner.buffer.push(record);
        if inner.buffer.len() >= self.capacity {
            self.flush_locked(&mut inner)?;
        }
        Ok(())
    }

    /// Write all buffered records to the destination and clear the buffer.
    ///
    /// Idempotent: an empty buffer produces no write, no empty batch and
    /// no duplicate header, so it is safe to call from a cancellation path
    /// and again at teardown.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.lock()?;
        self.flush_locked(&mut inner)
    }

    /// Number of records currently buffered (not yet durably written)
    pub fn buffered(&self) -> usize {
        self.inner.lock().map(|inner| inner.buffer.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner<R>>> {
        self.inner
            .lock()
            .map_err(|_| Error::sink("sink lock poisoned"))
    }

    fn flush_locked(&self, inner: &mut Inner<R>) -> Result<()> {
        if inner.buffer.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !inner.header_written {
            writer.write_record(R::fields())?;
        }
        for record in &inner.buffer {
            writer.write_record(record.row())?;
        }
        writer.flush()?;

        // Cleared only after the batch is durably written; a failed flush
        // keeps the records buffered for the next attempt.
        inner.header_written = true;
        inner.buffer.clear();
        Ok(())
    }
}

impl<R: Record> std::fmt::Debug for BufferedSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSink")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("buffered", &self.buffered())
            .finish()
    }
}
