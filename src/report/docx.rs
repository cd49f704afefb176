//! Word document output
//!
//! Keeps every part of an existing `.docx` and appends paragraphs to the end
//! of its body. Bullets and link styling are inline run properties so the
//! document needs no numbering or style parts.

use super::{ReportSink, SinkState};
use crate::error::ReportError;
use crate::schema::ReportRecord;
use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Document written when no output path is given
pub const DEFAULT_DOCX_PATH: &str = "output.docx";

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const HYPERLINK_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const RELS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const EMPTY_DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

const EMPTY_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

/// Accumulates paragraphs in memory and saves the package once on close
pub struct DocxSink {
    path: PathBuf,
    /// Untouched parts of an existing package, in archive order
    other_parts: Vec<(String, Vec<u8>)>,
    /// document.xml split at the insertion point
    document_head: String,
    document_tail: String,
    rels_xml: String,
    paragraphs: String,
    relationships: String,
    next_rel_id: u32,
    state: SinkState,
}

impl DocxSink {
    /// Start a document at `path`, continuing an existing one if present
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let (other_parts, document_xml, rels_xml) = if path.exists() {
            debug!(path = %path.display(), "Appending to existing document");
            read_package(path)?
        } else {
            (
                vec![
                    ("[Content_Types].xml".to_string(), CONTENT_TYPES_XML.as_bytes().to_vec()),
                    ("_rels/.rels".to_string(), PACKAGE_RELS_XML.as_bytes().to_vec()),
                ],
                EMPTY_DOCUMENT_XML.to_string(),
                EMPTY_RELS_XML.to_string(),
            )
        };

        let document_xml = ensure_rels_namespace(&document_xml);
        let split = body_insertion_point(&document_xml).ok_or_else(|| ReportError::Document {
            path: path.to_path_buf(),
            message: "no <w:body> element".to_string(),
        })?;
        if !rels_xml.contains("</Relationships>") {
            return Err(ReportError::Document {
                path: path.to_path_buf(),
                message: "unterminated relationships part".to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            other_parts,
            document_head: document_xml[..split].to_string(),
            document_tail: document_xml[split..].to_string(),
            next_rel_id: max_rel_id(&rels_xml) + 1,
            rels_xml,
            paragraphs: String::new(),
            relationships: String::new(),
            state: SinkState::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn add_heading(&mut self, text: &str) {
        self.paragraphs.push_str(&format!(
            r#"<w:p><w:pPr><w:spacing w:before="240" w:after="120"/></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="32"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_xml(text)
        ));
    }

    fn add_title(&mut self, text: &str) {
        self.paragraphs.push_str(&format!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_xml(text)
        ));
    }

    fn add_link(&mut self, url: &str, text: &str) {
        let rel_id = format!("rId{}", self.next_rel_id);
        self.next_rel_id += 1;

        self.relationships.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}" TargetMode="External"/>"#,
            rel_id,
            HYPERLINK_TYPE,
            escape_xml(url)
        ));
        self.paragraphs.push_str(&format!(
            concat!(
                r#"<w:p><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>"#,
                r#"<w:r><w:t xml:space="preserve">• </w:t></w:r>"#,
                r#"<w:hyperlink r:id="{}" w:history="1"><w:r><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr>"#,
                r#"<w:t xml:space="preserve">{}</w:t></w:r></w:hyperlink></w:p>"#
            ),
            rel_id,
            escape_xml(text)
        ));
    }

    fn save(&self) -> Result<(), ReportError> {
        let document = format!(
            "{}{}{}",
            self.document_head, self.paragraphs, self.document_tail
        );
        let rels = match self.rels_xml.rfind("</Relationships>") {
            Some(idx) => format!(
                "{}{}{}",
                &self.rels_xml[..idx],
                self.relationships,
                &self.rels_xml[idx..]
            ),
            None => self.rels_xml.clone(),
        };

        let file = File::create(&self.path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        for (name, bytes) in &self.other_parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        zip.start_file(DOCUMENT_PART, options)?;
        zip.write_all(document.as_bytes())?;
        zip.start_file(DOCUMENT_RELS_PART, options)?;
        zip.write_all(rels.as_bytes())?;
        zip.finish()?;

        debug!(path = %self.path.display(), "Document saved");
        Ok(())
    }
}

impl ReportSink for DocxSink {
    fn print_header(&mut self) -> Result<(), ReportError> {
        self.state.enter_print()?;
        self.add_heading(&heading_text(&Local::now()));
        Ok(())
    }

    fn print(&mut self, record: &ReportRecord) -> Result<(), ReportError> {
        self.state.enter_print()?;
        if record.links.is_empty() {
            return Ok(());
        }

        let title = record
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&record.site)
            .to_string();
        self.add_title(&title);

        for (url, text) in record.links.iter() {
            let text = if text.is_empty() { url } else { text };
            self.add_link(url, text);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReportError> {
        if !self.state.enter_close() {
            return Ok(());
        }
        self.save()
    }
}

impl Drop for DocxSink {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), "Failed to save document: {}", e);
            }
        }
    }
}

/// All parts of an existing package: (other parts, document.xml, rels)
fn read_package(path: &Path) -> Result<(Vec<(String, Vec<u8>)>, String, String), ReportError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut other_parts = Vec::new();
    let mut document_xml = None;
    let mut rels_xml = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        match name.as_str() {
            DOCUMENT_PART => document_xml = Some(into_utf8(path, bytes)?),
            DOCUMENT_RELS_PART => rels_xml = Some(into_utf8(path, bytes)?),
            _ => other_parts.push((name, bytes)),
        }
    }

    let document_xml = document_xml.ok_or_else(|| ReportError::Document {
        path: path.to_path_buf(),
        message: format!("missing {}", DOCUMENT_PART),
    })?;
    Ok((
        other_parts,
        document_xml,
        rels_xml.unwrap_or_else(|| EMPTY_RELS_XML.to_string()),
    ))
}

fn into_utf8(path: &Path, bytes: Vec<u8>) -> Result<String, ReportError> {
    String::from_utf8(bytes).map_err(|e| ReportError::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Byte offset where new body paragraphs go: before the body-level
/// `<w:sectPr>` if there is one, otherwise before `</w:body>`
fn body_insertion_point(document_xml: &str) -> Option<usize> {
    let body_end = document_xml.rfind("</w:body>")?;
    let body = &document_xml[..body_end];
    let last_block_end = [body.rfind("</w:p>"), body.rfind("</w:tbl>")]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);

    match body.rfind("<w:sectPr") {
        Some(idx) if idx >= last_block_end => Some(idx),
        _ => Some(body_end),
    }
}

fn ensure_rels_namespace(document_xml: &str) -> String {
    if document_xml.contains("xmlns:r=") {
        return document_xml.to_string();
    }
    document_xml.replacen(
        "<w:document ",
        &format!("<w:document xmlns:r=\"{}\" ", RELS_NS),
        1,
    )
}

fn max_rel_id(rels_xml: &str) -> u32 {
    let re = Regex::new(r#"Id="rId(\d+)""#).unwrap();
    re.captures_iter(rels_xml)
        .filter_map(|cap| cap[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Run heading, minute precision
fn heading_text<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::record;
    use tempfile::tempdir;

    fn read_part(path: &Path, name: &str) -> String {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_new_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.docx");

        let mut sink = DocxSink::open(&path).unwrap();
        sink.print_header().unwrap();
        sink.print(&record(
            "https://blog.example/",
            Some("Blog & News"),
            &[("https://blog.example/p?a=1&b=2", "Post <2>"), ("https://blog.example/p1", "")],
        ))
        .unwrap();
        sink.print(&record("https://empty.example/", Some("Nothing"), &[]))
            .unwrap();
        sink.close().unwrap();

        let document = read_part(&path, DOCUMENT_PART);
        let today = Local::now().format("%Y-%m-%d").to_string();
        let heading_at = document.find(&today).unwrap();
        assert!(heading_at < document.find("Blog &amp; News").unwrap());
        assert!(document.contains("Blog &amp; News"));
        assert!(document.contains("Post &lt;2&gt;"));
        assert!(document.contains(">https://blog.example/p1</w:t>"));
        assert!(!document.contains("Nothing"));
        assert!(document.find("Blog &amp; News").unwrap() < document.find("<w:sectPr>").unwrap());

        let rels = read_part(&path, DOCUMENT_RELS_PART);
        assert!(rels.contains(r#"Id="rId1""#));
        assert!(rels.contains(r#"Target="https://blog.example/p?a=1&amp;b=2""#));
        assert!(rels.contains(r#"Id="rId2""#));

        assert!(read_part(&path, "[Content_Types].xml").contains("/word/document.xml"));
    }

    #[test]
    fn test_appends_to_existing_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.docx");

        let mut first = DocxSink::open(&path).unwrap();
        first
            .print(&record("https://a.test/", Some("First run"), &[("https://a.test/1", "One")]))
            .unwrap();
        first.close().unwrap();

        let mut second = DocxSink::open(&path).unwrap();
        second
            .print(&record("https://a.test/", Some("Second run"), &[("https://a.test/2", "Two")]))
            .unwrap();
        second.close().unwrap();

        let document = read_part(&path, DOCUMENT_PART);
        let first_idx = document.find("First run").unwrap();
        let second_idx = document.find("Second run").unwrap();
        assert!(first_idx < second_idx);
        assert_eq!(document.matches("<w:sectPr>").count(), 1);

        let rels = read_part(&path, DOCUMENT_RELS_PART);
        assert!(rels.contains(r#"Id="rId1" Type"#));
        assert!(rels.contains(r#"Id="rId2" Type"#));
        assert!(rels.contains("https://a.test/2"));
    }

    #[test]
    fn test_saved_on_drop_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dropped.docx");
        {
            let mut sink = DocxSink::open(&path).unwrap();
            sink.print(&record("https://a.test/", None, &[("https://a.test/1", "One")]))
                .unwrap();
        }
        let document = read_part(&path, DOCUMENT_PART);
        assert!(document.contains(">https://a.test/</w:t>"));
    }

    #[test]
    fn test_body_insertion_point() {
        let with_sect = "<w:body><w:p></w:p><w:sectPr/></w:body>";
        assert_eq!(body_insertion_point(with_sect), with_sect.find("<w:sectPr"));

        let para_sect = "<w:body><w:p><w:pPr><w:sectPr/></w:pPr></w:p></w:body>";
        assert_eq!(body_insertion_point(para_sect), para_sect.find("</w:body>"));

        assert_eq!(body_insertion_point("<w:document/>"), None);
    }

    #[test]
    fn test_max_rel_id() {
        let rels = r#"<Relationship Id="rId3" Target="a"/><Relationship Id="rId12" Target="b"/>"#;
        assert_eq!(max_rel_id(rels), 12);
        assert_eq!(max_rel_id(EMPTY_RELS_XML), 0);
    }

    #[test]
    fn test_heading_text() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 7, 9, 59).unwrap();
        assert_eq!(heading_text(&at), "2024-03-05 07:09");
    }
}
