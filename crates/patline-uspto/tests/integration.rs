//! Integration tests for patline-uspto
//!
//! The offline tests drive the full pipeline (zip container → record
//! cursor → classification matcher → sink) against synthetic weekly
//! archives. Network tests are marked #[ignore] and hit the real bulk
//! data site:
//!   cargo test -p patline-uspto --test integration -- --ignored

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::ProgressBar;
use patline_core::{CorpusSink, ProgressContext, SingleFileSink, StreamError, ZipSink};
use patline_uspto::{
    ArchiveFetcher, BulkFileRef, ClassScanMatcher, Classification, Corpus, CpcCode, DocType,
    PatentDocMatcher, UspcCode,
};
use tempfile::TempDir;

/// Fetcher that "downloads" pre-built fixture archives from a local map.
struct FixtureFetcher {
    dir: PathBuf,
    archives: HashMap<String, Vec<u8>>,
}

impl ArchiveFetcher for FixtureFetcher {
    fn fetch(&self, bulk: &BulkFileRef, _pb: &ProgressBar) -> Result<PathBuf, StreamError> {
        let Some(bytes) = self.archives.get(&bulk.filename) else {
            return Err(StreamError::Http {
                status: Some(404),
                message: "no such fixture".to_string(),
            });
        };
        let path = self.dir.join(&bulk.filename);
        std::fs::write(&path, bytes).map_err(StreamError::Io)?;
        Ok(path)
    }
}

fn patent_record(doc_number: &str, cpc: (&str, &str, &str, &str, &str)) -> String {
    let (section, class, subclass, main_group, subgroup) = cpc;
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<us-patent-grant lang="EN">
<us-bibliographic-data-grant>
<publication-reference><document-id><doc-number>{doc_number}</doc-number><kind>B2</kind></document-id></publication-reference>
<invention-title>Fixture patent {doc_number}</invention-title>
<classifications-cpc><main-cpc><classification-cpc>
<section>{section}</section><class>{class}</class><subclass>{subclass}</subclass><main-group>{main_group}</main-group><subgroup>{subgroup}</subgroup>
</classification-cpc></main-cpc></classifications-cpc>
</us-bibliographic-data-grant>
<abstract><p>Fixture abstract.</p></abstract>
</us-patent-grant>
"#
    )
}

/// Weekly archive: five records, two of them in H04N21 (the wanted group).
fn weekly_dump(week: u32) -> String {
    let mut dump = String::new();
    for i in 1..=5u32 {
        let cpc = if i == 2 || i == 4 {
            ("H", "04", "N", "21", "2343")
        } else {
            ("A", "61", "K", "31", "00")
        };
        dump.push_str(&patent_record(&format!("{week:02}{i:06}"), cpc));
    }
    dump
}

fn zip_archive(entry_name: &str, dump: &str) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::write::ZipWriter::new(&mut buf);
        writer
            .start_file(entry_name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(dump.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf.into_inner()
}

fn bulk(name: &str) -> BulkFileRef {
    BulkFileRef {
        filename: name.to_string(),
        url: format!("https://example.com/2024/{name}"),
        size_bytes: None,
    }
}

fn wanted() -> Vec<Classification> {
    vec![Classification::Cpc(CpcCode::parse("H04N21/00").unwrap())]
}

#[test]
fn pipeline_extracts_matching_records_from_zip_archives() {
    let download_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();

    let mut archives = HashMap::new();
    archives.insert(
        "ipg240102.zip".to_string(),
        zip_archive("ipg240102.xml", &weekly_dump(1)),
    );
    archives.insert(
        "ipg240109.zip".to_string(),
        zip_archive("ipg240109.xml", &weekly_dump(2)),
    );

    let fetcher = FixtureFetcher {
        dir: download_dir.path().to_path_buf(),
        archives,
    };

    let corpus_path = out_dir.path().join("corpus.xml");
    let sink: Box<dyn CorpusSink> = Box::new(SingleFileSink::new(&corpus_path));
    let matcher = Box::new(ClassScanMatcher::new(wanted()));

    let mut corpus = Corpus::new(fetcher, matcher, sink, "us-patent");
    corpus.setup().unwrap();
    corpus.enqueue([bulk("ipg240102.zip"), bulk("ipg240109.zip")]);
    corpus.run(true, &Arc::new(ProgressContext::new()));
    corpus.close().unwrap();

    assert_eq!(corpus.archives_processed(), 2);
    assert_eq!(corpus.records_written(), 4);

    // Archives deleted once processed
    assert!(!download_dir.path().join("ipg240102.zip").exists());

    // Output holds the four matching documents in archive-then-record order
    let output = std::fs::read_to_string(&corpus_path).unwrap();
    let order: Vec<&str> = ["01000002", "01000004", "02000002", "02000004"]
        .into_iter()
        .filter(|doc| output.contains(*doc))
        .collect();
    assert_eq!(order.len(), 4);
    assert!(!output.contains("01000001"));
    let pos = |doc: &str| output.find(doc).unwrap();
    assert!(pos("01000002") < pos("01000004"));
    assert!(pos("01000004") < pos("02000002"));
    assert!(pos("02000002") < pos("02000004"));
}

#[test]
fn download_failure_skips_archive_and_run_continues() {
    let download_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();

    let mut archives = HashMap::new();
    archives.insert(
        "ipg240109.zip".to_string(),
        zip_archive("ipg240109.xml", &weekly_dump(2)),
    );
    // ipg240102.zip intentionally missing → fetch fails

    let fetcher = FixtureFetcher {
        dir: download_dir.path().to_path_buf(),
        archives,
    };

    let sink: Box<dyn CorpusSink> = Box::new(SingleFileSink::new(out_dir.path().join("c.xml")));
    let mut corpus = Corpus::new(
        fetcher,
        Box::new(PatentDocMatcher::new(wanted())),
        sink,
        "us-patent",
    );
    corpus.setup().unwrap();
    corpus.enqueue([bulk("ipg240102.zip"), bulk("ipg240109.zip")]);
    corpus.run(false, &Arc::new(ProgressContext::new()));
    corpus.close().unwrap();

    assert_eq!(corpus.archives_processed(), 1);
    assert_eq!(corpus.records_written(), 2);
}

#[test]
fn zip_sink_gets_one_entry_per_match() {
    let download_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();

    let mut archives = HashMap::new();
    archives.insert(
        "ipg240102.zip".to_string(),
        zip_archive("ipg240102.xml", &weekly_dump(1)),
    );

    let fetcher = FixtureFetcher {
        dir: download_dir.path().to_path_buf(),
        archives,
    };

    let corpus_path = out_dir.path().join("corpus.zip");
    let sink: Box<dyn CorpusSink> = Box::new(ZipSink::new(&corpus_path));
    let mut corpus = Corpus::new(
        fetcher,
        Box::new(ClassScanMatcher::new(vec![Classification::Uspc(
            UspcCode::parse("725").unwrap(),
        )])),
        sink,
        "us-patent",
    );
    corpus.setup().unwrap();
    corpus.enqueue([bulk("ipg240102.zip")]);
    corpus.run(false, &Arc::new(ProgressContext::new()));
    corpus.close().unwrap();

    // No USPC codes in the fixtures → empty but valid zip
    assert_eq!(corpus.records_written(), 0);
    let archive = zip::ZipArchive::new(std::fs::File::open(&corpus_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 0);
}

/// Walk the real 2024 grant listing.
/// Run with: cargo test -p patline-uspto --test integration -- --ignored catalog_listing
#[test]
#[ignore]
fn catalog_listing() {
    let refs = patline_uspto::catalog::discover(
        "https://bulkdata.uspto.gov/data",
        DocType::Grant,
        &[2024],
    )
    .expect("catalog fetch should succeed");

    // One archive per week
    assert!(refs.len() >= 50, "expected ~52 weekly files, got {}", refs.len());
    assert!(refs.iter().all(|r| r.filename.ends_with(".zip")));
}
