//! Run event log. Both pipelines report progress and failures through a `LogSink`.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::macros::format_description;
use time::OffsetDateTime;

/// Destination for human-readable run events.
pub trait LogSink {
    fn emit(&self, message: &str);
}

impl<L: LogSink + ?Sized> LogSink for Arc<L> {
    fn emit(&self, message: &str) {
        (**self).emit(message)
    }
}

impl<L: LogSink + ?Sized> LogSink for &L {
    fn emit(&self, message: &str) {
        (**self).emit(message)
    }
}

fn stamp() -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&fmt).unwrap_or_default()
}

/// Append-only log file, one `[YYYY-MM-DD HH:MM:SS] message` line per event.
/// Each event is mirrored to `tracing` at info level.
pub struct FileLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLog {
    fn emit(&self, message: &str) {
        tracing::info!("{}", message);
        let mut f = self.file.lock();
        for line in message.lines() {
            if let Err(e) = writeln!(f, "[{}] {}", stamp(), line) {
                tracing::warn!(path=%self.path.display(), error=%e, "failed appending to log file");
                return;
            }
        }
    }
}

/// Log sink that only forwards to `tracing`.
#[derive(Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn emit(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Collects events in memory.
#[derive(Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn emit(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}
