//! Write-once CSV output: header on open, rows appended, handle released on every exit path.

use crate::util::create_output;
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct RecordSink<W: Write> {
    writer: Writer<W>,
    rows: u64,
}

impl RecordSink<BufWriter<File>> {
    /// Create (truncate) `path` and write `header` straight away.
    pub fn create<H: AsRef<[u8]>>(path: &Path, header: &[H]) -> Result<Self> {
        let f = create_output(path).with_context(|| format!("create output {}", path.display()))?;
        Self::from_writer(BufWriter::new(f), header)
    }
}

impl<W: Write> RecordSink<W> {
    pub fn from_writer<H: AsRef<[u8]>>(inner: W, header: &[H]) -> Result<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(header)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write<R: Serialize>(&mut self, row: &R) -> Result<()> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_fields<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(fields)?;
        self.rows += 1;
        Ok(())
    }

    /// Push buffered rows down to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the underlying writer (closing it when it is a file).
    pub fn finish(self) -> Result<W> {
        let mut inner = self.writer.into_inner().map_err(|e| anyhow::anyhow!("flush output: {}", e.error()))?;
        inner.flush().context("flush output")?;
        Ok(inner)
    }
}
