use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::result::IterationResult;

/// Append-only destination for iteration results.
///
/// `emit` is called concurrently from every VU; each record must land whole.
pub trait ReportSink: Send + Sync {
    fn emit(&self, result: &IterationResult) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// One JSON object per line.
#[derive(Debug)]
pub struct NdjsonSink<W: Write + Send> {
    out: Mutex<BufWriter<W>>,
}

impl<W: Write + Send> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(BufWriter::new(out)),
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_inner()
            .map_err(io::IntoInnerError::into_error)
    }
}

impl NdjsonSink<File> {
    /// Creates (or truncates) `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Send> ReportSink for NdjsonSink<W> {
    fn emit(&self, result: &IterationResult) -> io::Result<()> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');

        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(&line)
    }

    fn flush(&self) -> io::Result<()> {
        self.out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .flush()
    }
}

/// Keeps every result in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<IterationResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<IterationResult> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, result: &IterationResult) -> io::Result<()> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(result.clone());
        Ok(())
    }
}
