//! CSV: `site,url,title` per link under a `#site,url,title` header

use super::{ReportSink, SinkState};
use crate::error::ReportError;
use crate::schema::ReportRecord;
use std::io::Write;
use tracing::warn;

const CSV_HEADER: [&str; 3] = ["#site", "url", "title"];

/// Fields containing commas, quotes or newlines are quoted; plain rows are
/// written as-is.
pub struct CsvSink<W: Write> {
    writer: Option<csv::Writer<W>>,
    state: SinkState,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_writer(out);
        Self {
            writer: Some(writer),
            state: SinkState::default(),
        }
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<W>, ReportError> {
        self.writer.as_mut().ok_or(ReportError::Closed)
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn print_header(&mut self) -> Result<(), ReportError> {
        self.state.enter_print()?;
        let writer = self.writer()?;
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        Ok(())
    }

    fn print(&mut self, record: &ReportRecord) -> Result<(), ReportError> {
        self.state.enter_print()?;
        let writer = self.writer()?;
        for (url, title) in record.links.iter() {
            writer.write_record([record.site.as_str(), url, title])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReportError> {
        if !self.state.enter_close() {
            return Ok(());
        }
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for CsvSink<W> {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            if let Err(e) = self.close() {
                warn!("Failed to close CSV report: {}", e);
            }
        }
    }
}
