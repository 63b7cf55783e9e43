//! Corpus run configuration

use std::path::PathBuf;

use crate::catalog::DocType;

/// Runtime configuration for one corpus build
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Which bulk collection to walk
    pub doc_type: DocType,
    /// Years to pull listings for, in processing order
    pub years: Vec<u16>,
    /// Directory for downloaded archives
    pub download_dir: PathBuf,
    /// Base URL of the bulk data site
    pub base_url: String,
    /// Record boundary tag prefix inside the dumps
    pub record_tag: String,
    /// Only process these bulk file names, when given
    pub whitelist: Option<Vec<String>>,
    /// Bulk files to drop from the front of the queue before running
    pub skip: usize,
    /// Delete each archive once processed
    pub delete_done: bool,
    /// Retry budget per archive download
    pub max_retries: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            doc_type: DocType::Grant,
            years: Vec::new(),
            download_dir: PathBuf::from("download"),
            base_url: "https://bulkdata.uspto.gov/data".to_string(),
            record_tag: "us-patent".to_string(),
            whitelist: None,
            skip: 0,
            delete_done: true,
            max_retries: 3,
        }
    }
}
