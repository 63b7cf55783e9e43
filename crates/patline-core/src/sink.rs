//! Output sinks — concatenated single-file writer and zip archive writer
//!
//! Both write to a `.tmp` sibling and atomically rename on close, so an
//! interrupted run never leaves a half-written corpus behind under the
//! final name.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::{SimpleFileOptions, ZipWriter};

/// Append-only byte destination with an explicit open/close lifecycle.
///
/// `open` on an already-open sink and `close` on an already-closed sink are
/// both no-ops; `write` on a sink that is not open is an error.
pub trait CorpusSink {
    fn open(&mut self) -> io::Result<()>;
    fn is_open(&self) -> bool;
    fn write(&mut self, record: &[u8]) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "sink is not open")
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

/// Writes matched records back to back into one file, newline separated.
pub struct SingleFileSink {
    final_path: PathBuf,
    tmp_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl SingleFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let final_path = path.into();
        let tmp_path = tmp_path(&final_path);
        Self {
            final_path,
            tmp_path,
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }
}

impl CorpusSink for SingleFileSink {
    fn open(&mut self) -> io::Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        // Clean up a stale tmp file from a previous interrupted run
        if self.tmp_path.exists() {
            fs::remove_file(&self.tmp_path)?;
        }
        let file = File::create(&self.tmp_path)?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn write(&mut self, record: &[u8]) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(not_open)?;
        writer.write_all(record)?;
        if !record.ends_with(b"\n") {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush()?;
        drop(writer);
        fs::rename(&self.tmp_path, &self.final_path)
    }
}

/// Writes each matched record as its own zip entry (`doc-0000001.xml`, ...).
pub struct ZipSink {
    final_path: PathBuf,
    tmp_path: PathBuf,
    writer: Option<ZipWriter<File>>,
    entries: u64,
}

impl ZipSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let final_path = path.into();
        let tmp_path = tmp_path(&final_path);
        Self {
            final_path,
            tmp_path,
            writer: None,
            entries: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }
}

impl CorpusSink for ZipSink {
    fn open(&mut self) -> io::Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        if self.tmp_path.exists() {
            fs::remove_file(&self.tmp_path)?;
        }
        let file = File::create(&self.tmp_path)?;
        self.writer = Some(ZipWriter::new(file));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn write(&mut self, record: &[u8]) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(not_open)?;
        self.entries += 1;
        let name = format!("doc-{:07}.xml", self.entries);
        writer
            .start_file(name, SimpleFileOptions::default())
            .map_err(io::Error::other)?;
        writer.write_all(record)
    }

    fn close(&mut self) -> io::Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        writer.finish().map_err(io::Error::other)?;
        fs::rename(&self.tmp_path, &self.final_path)
    }
}
