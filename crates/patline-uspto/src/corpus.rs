//! Corpus pipeline
//!
//! Drains a FIFO queue of bulk file references one archive at a time:
//! download, stream the records through the match strategy, append hits to
//! the output sink. A failed download skips that archive; a malformed
//! record skips that record; neither stops the run.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;

use indicatif::ProgressBar;
use patline_core::{CorpusSink, DumpReader, SharedProgress, StreamError, fmt_num};

use crate::catalog::BulkFileRef;
use crate::download::ArchiveFetcher;
use crate::matcher::RecordMatcher;

/// Transient state for the one archive currently being processed.
///
/// At most one session exists at a time. It lives inside a single drain
/// iteration and releases the cursor when dropped, whichever path exits
/// the iteration.
struct ArchiveSession {
    reader: DumpReader,
    path: PathBuf,
}

/// The pipeline: queue, drain loop, and run statistics.
pub struct Corpus<F> {
    fetcher: F,
    matcher: Box<dyn RecordMatcher>,
    sink: Box<dyn CorpusSink>,
    record_tag: String,
    queue: VecDeque<BulkFileRef>,
    archives_processed: u64,
    records_written: u64,
}

impl<F: ArchiveFetcher> Corpus<F> {
    pub fn new(
        fetcher: F,
        matcher: Box<dyn RecordMatcher>,
        sink: Box<dyn CorpusSink>,
        record_tag: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            matcher,
            sink,
            record_tag: record_tag.into(),
            queue: VecDeque::new(),
            archives_processed: 0,
            records_written: 0,
        }
    }

    /// Prepare the matcher and open the sink (only if not already open).
    pub fn setup(&mut self) -> anyhow::Result<()> {
        self.matcher.setup()?;
        if !self.sink.is_open() {
            self.sink.open()?;
        }
        Ok(())
    }

    /// Append references to the tail of the queue, preserving their order.
    /// No deduplication: a reference enqueued twice processes twice.
    pub fn enqueue(&mut self, refs: impl IntoIterator<Item = BulkFileRef>) {
        self.queue.extend(refs);
    }

    /// Keep only queued references whose file name is in `names`.
    ///
    /// Meant to run right after a full catalog enqueue. Survivor order is
    /// preserved; the order of `names` does not matter.
    pub fn shrink_to_names(&mut self, names: &[String]) {
        self.queue.retain(|b| names.iter().any(|n| n == b.file_name()));
    }

    /// Drop up to `n` references from the front of the queue. They are
    /// discarded, not deferred. Clamps when `n` exceeds the queue length.
    pub fn skip(&mut self, n: usize) {
        let n = n.min(self.queue.len());
        self.queue.drain(..n);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue, one archive at a time, until it is empty.
    ///
    /// Queue shaping (`enqueue`, `shrink_to_names`, `skip`) must be done
    /// before this is called.
    pub fn run(&mut self, delete_done: bool, progress: &SharedProgress) {
        while let Some(bulk) = self.queue.pop_front() {
            log::info!("Bulk file queue: [{}]", self.queue.len());

            let pb = progress.archive_bar(bulk.file_name());
            let session = match self.open_session(&bulk, &pb) {
                Ok(session) => session,
                Err(e) => {
                    pb.finish_and_clear();
                    // At-most-once per run: the failed archive is not re-enqueued
                    log::error!("Skipping bulk file '{}': {e}", bulk.url);
                    continue;
                }
            };
            pb.finish_and_clear();

            self.drain_session(session, delete_done);
            log::info!(
                "Bulk file [{}] done: '{}'",
                fmt_num(self.archives_processed),
                bulk.file_name()
            );
        }
    }

    /// Fetch the archive and open a cursor over it.
    fn open_session(
        &self,
        bulk: &BulkFileRef,
        pb: &ProgressBar,
    ) -> Result<ArchiveSession, StreamError> {
        let path = self.fetcher.fetch(bulk, pb)?;
        let reader = DumpReader::open(&path, &self.record_tag).map_err(StreamError::Io)?;
        Ok(ArchiveSession { reader, path })
    }

    /// Read the session to exhaustion, then release it and count the archive.
    fn drain_session(&mut self, mut session: ArchiveSession, delete_done: bool) {
        if let Err(e) = self.scan_records(&mut session) {
            log::error!(
                "Abandoning '{}' at record {}: {e}",
                session.reader.source_name(),
                session.reader.records_read()
            );
        }

        let ArchiveSession { reader, path } = session;
        // Cursor must be released before the file can go away
        drop(reader);
        if delete_done {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Failed to delete '{}': {e}", path.display());
            }
        }
        self.archives_processed += 1;
    }

    /// Pull records until the cursor is exhausted, writing the ones the
    /// matcher accepts.
    ///
    /// A malformed record is logged and skipped. A cursor or sink I/O
    /// fault propagates and abandons this archive only.
    fn scan_records(&mut self, session: &mut ArchiveSession) -> io::Result<()> {
        while let Some(record) = session.reader.next_record()? {
            match self.matcher.matches(&record) {
                Ok(true) => {
                    self.sink.write(record.as_bytes())?;
                    self.records_written += 1;
                    log::info!(
                        "Match [{}] at {}:{} ; matched: {}",
                        fmt_num(self.records_written),
                        session.reader.source_name(),
                        session.reader.records_read(),
                        self.matcher
                            .last_match()
                            .map(ToString::to_string)
                            .unwrap_or_default()
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!(
                        "Bad record {}:{}: {e}",
                        session.reader.source_name(),
                        session.reader.records_read()
                    );
                }
            }
        }
        Ok(())
    }

    /// Close the output sink. Safe to call more than once.
    pub fn close(&mut self) -> io::Result<()> {
        self.sink.close()
    }

    /// Archives fully processed this run (failed downloads do not count).
    pub fn archives_processed(&self) -> u64 {
        self.archives_processed
    }

    /// Records written to the sink this run.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}
