//! Main runner for the corpus pipeline

use std::time::Instant;

use anyhow::{Context, Result};
use patline_core::{CorpusSink, SharedProgress};

use crate::catalog;
use crate::config::RunConfig;
use crate::corpus::Corpus;
use crate::download::BulkDataClient;
use crate::matcher::RecordMatcher;

/// Corpus build summary
#[derive(Debug)]
pub struct Summary {
    pub archives_processed: u64,
    pub records_written: u64,
    pub elapsed: std::time::Duration,
}

/// Discover the catalog, shape the queue, and drain it.
pub fn run(
    config: &RunConfig,
    matcher: Box<dyn RecordMatcher>,
    sink: Box<dyn CorpusSink>,
    progress: SharedProgress,
) -> Result<Summary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.download_dir)
        .context("Failed to create download directory")?;

    let refs = catalog::discover(&config.base_url, config.doc_type, &config.years)
        .context("Failed to fetch bulk data catalog")?;
    log::info!("Catalog holds {} bulk files", refs.len());

    let client = BulkDataClient::new(&config.download_dir, config.max_retries);
    let mut corpus = Corpus::new(client, matcher, sink, config.record_tag.as_str());
    corpus.setup().context("Pipeline setup failed")?;

    corpus.enqueue(refs);
    if let Some(names) = &config.whitelist {
        corpus.shrink_to_names(names);
        log::info!("Whitelist kept {} bulk files", corpus.queue_len());
    }
    if config.skip > 0 {
        corpus.skip(config.skip);
        log::info!("Skipped ahead, {} bulk files remain", corpus.queue_len());
    }

    log::info!("Processing {} bulk files", corpus.queue_len());
    corpus.run(config.delete_done, &progress);

    // Mid-loop sink faults are survived; a close failure here is not
    corpus.close().context("Failed to close corpus output")?;

    Ok(Summary {
        archives_processed: corpus.archives_processed(),
        records_written: corpus.records_written(),
        elapsed: start.elapsed(),
    })
}
