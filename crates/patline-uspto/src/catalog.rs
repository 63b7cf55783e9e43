//! USPTO bulk data catalog
//!
//! The bulk data site serves one HTML directory listing per document type
//! and year; each listing links the weekly archive files. Discovery fetches
//! the listings and turns them into an ordered download plan.

use patline_core::{StreamError, fetch_text};

/// Patent document type selecting which bulk collection to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Grant,
    Application,
}

impl DocType {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Application => "application",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// One downloadable weekly archive in the catalog
#[derive(Debug, Clone)]
pub struct BulkFileRef {
    pub filename: String,
    pub url: String,
    pub size_bytes: Option<u64>,
}

impl BulkFileRef {
    /// Trailing path segment, the key used for whitelist filtering.
    pub fn file_name(&self) -> &str {
        &self.filename
    }
}

/// Listing URL for one document type and year
pub fn listing_url(base_url: &str, doc_type: DocType, year: u16) -> String {
    format!(
        "{}/patent/{}/redbook/fulltext/{year}/",
        base_url.trim_end_matches('/'),
        doc_type.path_segment()
    )
}

/// Fetch the catalog for every requested year, in the order given.
///
/// Entries within a year are sorted by filename, so the resulting plan is
/// deterministic; the queue preserves this order.
pub fn discover(
    base_url: &str,
    doc_type: DocType,
    years: &[u16],
) -> Result<Vec<BulkFileRef>, StreamError> {
    let mut refs = Vec::new();
    for &year in years {
        let url = listing_url(base_url, doc_type, year);
        log::info!("Fetching catalog listing {url}");
        let html = fetch_text(&url)?;
        let mut entries = parse_html_listing(&html, &url);
        log::info!("Found {} bulk files for {doc_type} {year}", entries.len());
        refs.append(&mut entries);
    }
    Ok(refs)
}

/// Parse an HTML directory listing for `.zip` archive links
pub fn parse_html_listing(html: &str, listing_url: &str) -> Vec<BulkFileRef> {
    let mut entries = Vec::new();

    // Lines look like: <a href="ipg240102.zip">ipg240102.zip</a>  2024-01-02  105M
    for line in html.lines() {
        let Some(start) = line.find("href=\"") else {
            continue;
        };
        let rest = &line[start + 6..];
        let Some(end) = rest.find('"') else {
            continue;
        };
        let filename = &rest[..end];

        // Archive files only; the listings also link checksums and subdirs
        if !filename.ends_with(".zip") || filename.contains('/') {
            continue;
        }

        let url = format!("{}/{}", listing_url.trim_end_matches('/'), filename);
        entries.push(BulkFileRef {
            filename: filename.to_string(),
            url,
            size_bytes: parse_size_from_line(line),
        });
    }

    // Sort by filename for consistent weekly order
    entries.sort_by(|a, b| a.filename.cmp(&b.filename));
    entries
}

/// Parse a size column from an HTML listing line (`105M`, `4.5K`, `12345`)
fn parse_size_from_line(line: &str) -> Option<u64> {
    line.split_whitespace()
        .rev()
        .find_map(parse_size_string)
}

fn parse_size_string(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('K') {
        (n, 1024u64)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if s.bytes().all(|c| c.is_ascii_digit()) {
        (s, 1)
    } else {
        return None;
    };

    num_str
        .parse::<f64>()
        .ok()
        .map(|n| (n * multiplier as f64) as u64)
}
