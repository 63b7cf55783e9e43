//! Bulk archive download client
//!
//! Streams one weekly archive at a time to the download directory. A
//! finished file keeps its catalog name; the in-flight download writes to a
//! `.part` sibling and renames on completion, so a crash never leaves a
//! half-written archive that looks complete.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use patline_core::retry::retry_with_backoff;
use patline_core::{StreamError, download_to_file};

use crate::catalog::BulkFileRef;

/// Capability to turn a catalog reference into a local archive file.
pub trait ArchiveFetcher {
    fn fetch(&self, bulk: &BulkFileRef, pb: &ProgressBar) -> Result<PathBuf, StreamError>;
}

/// Downloader for the USPTO bulk data site.
pub struct BulkDataClient {
    download_dir: PathBuf,
    max_retries: u32,
}

impl BulkDataClient {
    pub fn new(download_dir: impl Into<PathBuf>, max_retries: u32) -> Self {
        Self {
            download_dir: download_dir.into(),
            max_retries,
        }
    }

    /// Whether an earlier run already left a complete copy behind.
    fn have_complete_copy(&self, bulk: &BulkFileRef, dest: &Path) -> bool {
        let Ok(meta) = fs::metadata(dest) else {
            return false;
        };
        match bulk.size_bytes {
            // Listing sizes are rounded (105M), so only demand the right
            // magnitude rather than byte equality
            Some(expected) => meta.len() >= expected / 2,
            None => meta.len() > 0,
        }
    }
}

impl ArchiveFetcher for BulkDataClient {
    fn fetch(&self, bulk: &BulkFileRef, pb: &ProgressBar) -> Result<PathBuf, StreamError> {
        let dest = self.download_dir.join(&bulk.filename);
        if self.have_complete_copy(bulk, &dest) {
            log::info!("Reusing existing download '{}'", dest.display());
            return Ok(dest);
        }

        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let bytes = retry_with_backoff(&bulk.filename, pb, self.max_retries, || {
            download_to_file(&bulk.url, &part, pb)
        })?;
        fs::rename(&part, &dest).map_err(StreamError::Io)?;

        log::info!(
            "Downloaded '{}' ({} bytes)",
            bulk.filename,
            patline_core::fmt_num(bytes)
        );
        Ok(dest)
    }
}
