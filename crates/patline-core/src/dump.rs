//! Record cursor over bulk dump files.
//!
//! A weekly bulk file concatenates thousands of complete XML documents into
//! one stream. [`DumpReader`] splits that stream back into raw per-document
//! text blocks by scanning for the document root tag, without parsing the
//! XML itself. Plain, gzip and zip containers are handled transparently.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

/// Buffer size for the dump scan (256KB)
const DUMP_BUF_SIZE: usize = 256 * 1024;

/// Lazy one-pass cursor yielding raw record payloads from a dump file.
///
/// The boundary `marker` is matched as a tag-name prefix, so `us-patent`
/// covers both `us-patent-grant` and `us-patent-application` roots. A record
/// starts at an XML declaration line or an opening marker tag and ends at
/// the line carrying the closing marker tag.
pub struct DumpReader {
    reader: BufReader<Box<dyn Read + Send>>,
    open_tag: String,
    close_tag: String,
    source_name: String,
    records_read: u64,
    scratch: Option<PathBuf>,
    eof: bool,
}

impl DumpReader {
    /// Open a dump file, sniffing the container by extension.
    ///
    /// `.gz` is decompressed on the fly; `.zip` has its dump entry extracted
    /// to a scratch file next to the archive (removed when the reader is
    /// dropped); anything else is read as-is.
    pub fn open(path: &Path, marker: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let (inner, scratch): (Box<dyn Read + Send>, Option<PathBuf>) = match ext {
            "gz" => (Box::new(GzDecoder::new(file)), None),
            "zip" => {
                let scratch = extract_dump_entry(file, path)?;
                (Box::new(File::open(&scratch)?), Some(scratch))
            }
            _ => (Box::new(file), None),
        };

        Ok(Self {
            reader: BufReader::with_capacity(DUMP_BUF_SIZE, inner),
            open_tag: format!("<{marker}"),
            close_tag: format!("</{marker}"),
            source_name,
            records_read: 0,
            scratch,
            eof: false,
        })
    }

    /// Next raw record, or `None` once the dump is exhausted.
    ///
    /// A partial record cut off at end of stream is dropped, not an error.
    pub fn next_record(&mut self) -> io::Result<Option<String>> {
        if self.eof {
            return Ok(None);
        }

        let mut doc = String::new();
        let mut in_doc = false;
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.eof = true;
                if in_doc {
                    log::debug!("{}: dropped truncated record at end of dump", self.source_name);
                }
                return Ok(None);
            }

            if !in_doc {
                let trimmed = line.trim_start();
                if !(trimmed.starts_with("<?xml") || trimmed.starts_with(&self.open_tag)) {
                    continue;
                }
                in_doc = true;
            }

            doc.push_str(&line);

            if line.contains(&self.close_tag) {
                self.records_read += 1;
                return Ok(Some(doc));
            }
        }
    }

    /// 1-based index of the most recently yielded record.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// File name of the dump being read, for diagnostics.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

impl Drop for DumpReader {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            if let Err(e) = std::fs::remove_file(&scratch) {
                log::warn!("failed to remove scratch file {}: {e}", scratch.display());
            }
        }
    }
}

/// Extract the dump entry from a zip archive to a scratch file.
///
/// Weekly bulk zips hold one large XML plus occasional small metadata
/// entries; the largest entry is the dump.
fn extract_dump_entry(file: File, path: &Path) -> io::Result<PathBuf> {
    let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;
    if archive.len() == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "empty zip archive",
        ));
    }

    let mut idx = 0;
    let mut best = 0u64;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(io::Error::other)?;
        if entry.size() > best {
            best = entry.size();
            idx = i;
        }
    }

    let mut entry = archive.by_index(idx).map_err(io::Error::other)?;
    let scratch = path.with_extension("extracted.xml");
    let mut out = File::create(&scratch)?;
    io::copy(&mut entry, &mut out)?;
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const DUMP: &str = "\
<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<us-patent-grant id=\"A\">
<abstract>first</abstract>
</us-patent-grant>
<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<us-patent-grant id=\"B\">
<abstract>second</abstract>
</us-patent-grant>
";

    fn write_dump(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn collect(reader: &mut DumpReader) -> Vec<String> {
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn splits_on_marker() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(&dir, "dump.xml", DUMP);

        let mut reader = DumpReader::open(&path, "us-patent").unwrap();
        let records = collect(&mut reader);

        assert_eq!(records.len(), 2);
        assert!(records[0].contains("id=\"A\""));
        assert!(records[0].starts_with("<?xml"));
        assert!(records[0].trim_end().ends_with("</us-patent-grant>"));
        assert!(records[1].contains("id=\"B\""));
    }

    #[test]
    fn marker_is_prefix_matched() {
        let dir = TempDir::new().unwrap();
        let content = "\
<us-patent-application id=\"X\">
<body/>
</us-patent-application>
";
        let path = write_dump(&dir, "dump.xml", content);

        let mut reader = DumpReader::open(&path, "us-patent").unwrap();
        assert_eq!(collect(&mut reader).len(), 1);
    }

    #[test]
    fn single_line_record() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(&dir, "dump.xml", "<doc a=\"1\">x</doc>\n<doc a=\"2\">y</doc>\n");

        let mut reader = DumpReader::open(&path, "doc").unwrap();
        let records = collect(&mut reader);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].trim_end(), "<doc a=\"1\">x</doc>");
    }

    #[test]
    fn junk_between_records_skipped() {
        let dir = TempDir::new().unwrap();
        let content = "\
garbage header
<doc>one</doc>
inter-record noise
<doc>two</doc>
trailing noise
";
        let path = write_dump(&dir, "dump.xml", content);

        let mut reader = DumpReader::open(&path, "doc").unwrap();
        let records = collect(&mut reader);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].trim_end(), "<doc>one</doc>");
        assert_eq!(records[1].trim_end(), "<doc>two</doc>");
    }

    #[test]
    fn truncated_tail_is_clean_exhaustion() {
        let dir = TempDir::new().unwrap();
        let content = "\
<doc>complete</doc>
<doc>cut off mid-
";
        let path = write_dump(&dir, "dump.xml", content);

        let mut reader = DumpReader::open(&path, "doc").unwrap();
        let records = collect(&mut reader);
        assert_eq!(records.len(), 1);
        assert_eq!(reader.records_read(), 1);
        // exhausted stays exhausted
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(&dir, "dump.xml", "");

        let mut reader = DumpReader::open(&path, "doc").unwrap();
        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 0);
    }

    #[test]
    fn records_read_tracks_position() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(&dir, "dump.xml", DUMP);

        let mut reader = DumpReader::open(&path, "us-patent").unwrap();
        assert_eq!(reader.records_read(), 0);
        reader.next_record().unwrap();
        assert_eq!(reader.records_read(), 1);
        reader.next_record().unwrap();
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn source_name_is_file_name() {
        let dir = TempDir::new().unwrap();
        let path = write_dump(&dir, "ipg240102.xml", DUMP);

        let reader = DumpReader::open(&path, "us-patent").unwrap();
        assert_eq!(reader.source_name(), "ipg240102.xml");
    }

    #[test]
    fn reads_gzip_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.xml.gz");
        let file = File::create(&path).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        enc.write_all(DUMP.as_bytes()).unwrap();
        enc.finish().unwrap();

        let mut reader = DumpReader::open(&path, "us-patent").unwrap();
        assert_eq!(collect(&mut reader).len(), 2);
    }

    #[test]
    fn reads_zip_container_and_cleans_scratch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ipg240102.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::write::ZipWriter::new(file);
        writer
            .start_file("ipg240102.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(DUMP.as_bytes()).unwrap();
        writer.finish().unwrap();

        let scratch = path.with_extension("extracted.xml");
        {
            let mut reader = DumpReader::open(&path, "us-patent").unwrap();
            assert!(scratch.exists());
            assert_eq!(collect(&mut reader).len(), 2);
        }
        // scratch removed on drop
        assert!(!scratch.exists());
    }

    #[test]
    fn zip_picks_largest_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bulk.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::write::ZipWriter::new(file);
        writer
            .start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"metadata").unwrap();
        writer
            .start_file("bulk.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(DUMP.as_bytes()).unwrap();
        writer.finish().unwrap();

        let mut reader = DumpReader::open(&path, "us-patent").unwrap();
        assert_eq!(collect(&mut reader).len(), 2);
    }

    #[test]
    fn empty_zip_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.zip");
        let file = File::create(&path).unwrap();
        let writer = zip::write::ZipWriter::new(file);
        writer.finish().unwrap();

        assert!(DumpReader::open(&path, "doc").is_err());
    }
}
