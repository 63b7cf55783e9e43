//! Patent document parser using quick-xml
//!
//! Parses one raw record from a bulk dump into a small object model:
//! identifiers, title, and every classification the document carries.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::classification::{Classification, CpcCode, UspcCode};

/// Parsed patent document
#[derive(Debug, Default)]
pub struct PatentDoc {
    pub doc_number: Option<String>,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub classifications: Vec<Classification>,
}

impl PatentDoc {
    /// Parse a single patent document from raw record XML.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut doc = PatentDoc::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"publication-reference" => parse_publication_reference(&mut reader, &mut doc)?,
                    b"invention-title" => {
                        doc.title = Some(read_text_content(&mut reader, b"invention-title")?);
                    }
                    b"classification-cpc" => {
                        if let Some(code) = parse_cpc_block(&mut reader)? {
                            doc.classifications.push(Classification::Cpc(code));
                        }
                    }
                    b"classification-national" => {
                        if let Some(code) = parse_national_block(&mut reader)? {
                            doc.classifications.push(Classification::Uspc(code));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(e).context("XML parse error"),
                _ => {}
            }
            buf.clear();
        }

        Ok(doc)
    }
}

fn parse_publication_reference(reader: &mut Reader<&[u8]>, doc: &mut PatentDoc) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"doc-number" => {
                    if doc.doc_number.is_none() {
                        doc.doc_number = Some(read_text(reader)?);
                    }
                }
                b"kind" => {
                    if doc.kind.is_none() {
                        doc.kind = Some(read_text(reader)?);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"publication-reference" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Parse a `<classification-cpc>` block into a code.
///
/// Returns `None` when the block lacks the section/class facets (some
/// dumps carry combination sets with partial facets).
pub(crate) fn parse_cpc_block(reader: &mut Reader<&[u8]>) -> Result<Option<CpcCode>> {
    let mut buf = Vec::new();
    let mut section = None;
    let mut class_code = None;
    let mut subclass = None;
    let mut main_group = None;
    let mut subgroup = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"section" => section = read_text(reader)?.chars().next(),
                b"class" => class_code = Some(read_text(reader)?),
                b"subclass" => subclass = read_text(reader)?.chars().next(),
                b"main-group" => main_group = Some(read_text(reader)?),
                b"subgroup" => subgroup = Some(read_text(reader)?),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"classification-cpc" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let (Some(section), Some(class_code)) = (section, class_code) else {
        return Ok(None);
    };
    Ok(Some(CpcCode {
        section: section.to_ascii_uppercase(),
        class_code,
        subclass: subclass.map(|c| c.to_ascii_uppercase()),
        main_group,
        subgroup,
    }))
}

/// Parse a `<classification-national>` block into a USPC code, if its
/// `main-classification` text is present and well-formed.
pub(crate) fn parse_national_block(reader: &mut Reader<&[u8]>) -> Result<Option<UspcCode>> {
    let mut buf = Vec::new();
    let mut main = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"main-classification" => {
                main = Some(read_text(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"classification-national" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(main.and_then(|text| UspcCode::from_main_classification(&text).ok()))
}

/// Read text content until the next end tag
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::End(_) => break,
            Event::Start(_) => {
                // Nested markup inside the element (like <i>, <b>)
                text.push_str(&read_text(reader)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Read text content of a specific element, handling nested tags
fn read_text_content(reader: &mut Reader<&[u8]>, end_tag: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                depth -= 1;
                if depth == 0 && e.name().as_ref() == end_tag {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}
