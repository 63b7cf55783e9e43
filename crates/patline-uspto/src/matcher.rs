//! Record match strategies.
//!
//! A matcher decides whether one raw record belongs in the corpus and
//! remembers which wanted classification caused its most recent hit, for
//! logging. Two interchangeable strategies exist: a streaming scan that
//! inspects only classification elements, and a full object-model parse.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::classification::{ClassFilter, Classification};
use crate::patent::{self, PatentDoc};

/// Per-record evaluation fault: the record text could not be understood.
///
/// Never aborts an archive or the run; the pipeline logs it and moves to
/// the next record.
#[derive(Debug)]
pub enum MatchError {
    Parse(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "malformed record: {msg}"),
        }
    }
}

impl std::error::Error for MatchError {}

/// Capability to evaluate one raw record against the wanted set.
pub trait RecordMatcher {
    /// One-time preparation, invoked before any record is evaluated.
    fn setup(&mut self) -> Result<(), MatchError>;

    /// Whether the record belongs in the corpus.
    fn matches(&mut self, record: &str) -> Result<bool, MatchError>;

    /// The wanted classification behind the most recent positive match.
    fn last_match(&self) -> Option<&Classification>;
}

/// Streaming scan over classification elements only.
///
/// Stops at the first covered code without reading the rest of the record,
/// so a match costs a fraction of a full parse.
pub struct ClassScanMatcher {
    filter: ClassFilter,
    last: Option<Classification>,
}

impl ClassScanMatcher {
    pub fn new(wanted: Vec<Classification>) -> Self {
        Self {
            filter: ClassFilter::new(wanted),
            last: None,
        }
    }
}

impl RecordMatcher for ClassScanMatcher {
    fn setup(&mut self) -> Result<(), MatchError> {
        log::debug!("scan matcher ready, {} wanted classifications", self.filter.len());
        Ok(())
    }

    fn matches(&mut self, record: &str) -> Result<bool, MatchError> {
        match scan_for_covered(record, &self.filter)? {
            Some(wanted) => {
                self.last = Some(wanted);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn last_match(&self) -> Option<&Classification> {
        self.last.as_ref()
    }
}

/// Scan the record for classification blocks, returning the first wanted
/// code that covers one of them.
fn scan_for_covered(
    xml: &str,
    filter: &ClassFilter,
) -> Result<Option<Classification>, MatchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"classification-cpc" => {
                let code = patent::parse_cpc_block(&mut reader)
                    .map_err(|e| MatchError::Parse(format!("{e:#}")))?;
                if let Some(code) = code {
                    let candidate = Classification::Cpc(code);
                    if let Some(wanted) = filter.first_covering(&candidate) {
                        return Ok(Some(wanted.clone()));
                    }
                }
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"classification-national" => {
                let code = patent::parse_national_block(&mut reader)
                    .map_err(|e| MatchError::Parse(format!("{e:#}")))?;
                if let Some(code) = code {
                    let candidate = Classification::Uspc(code);
                    if let Some(wanted) = filter.first_covering(&candidate) {
                        return Ok(Some(wanted.clone()));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(MatchError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(None)
}

/// Full object-model parse, then classification intersection.
///
/// Slower than the scan but validates the whole record on the way.
pub struct PatentDocMatcher {
    filter: ClassFilter,
    last: Option<Classification>,
}

impl PatentDocMatcher {
    pub fn new(wanted: Vec<Classification>) -> Self {
        Self {
            filter: ClassFilter::new(wanted),
            last: None,
        }
    }
}

impl RecordMatcher for PatentDocMatcher {
    fn setup(&mut self) -> Result<(), MatchError> {
        log::debug!("document matcher ready, {} wanted classifications", self.filter.len());
        Ok(())
    }

    fn matches(&mut self, record: &str) -> Result<bool, MatchError> {
        let doc = PatentDoc::parse(record).map_err(|e| MatchError::Parse(format!("{e:#}")))?;
        for candidate in &doc.classifications {
            if let Some(wanted) = self.filter.first_covering(candidate) {
                self.last = Some(wanted.clone());
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn last_match(&self) -> Option<&Classification> {
        self.last.as_ref()
    }
}
