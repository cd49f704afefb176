//! Plain text: one `url:title` line per link

use super::{ReportSink, SinkState};
use crate::error::ReportError;
use crate::schema::ReportRecord;
use std::io::Write;
use tracing::warn;

pub struct TextSink<W: Write> {
    out: Option<W>,
    state: SinkState,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Some(out),
            state: SinkState::default(),
        }
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn print_header(&mut self) -> Result<(), ReportError> {
        self.state.enter_print()
    }

    fn print(&mut self, record: &ReportRecord) -> Result<(), ReportError> {
        self.state.enter_print()?;
        let out = self.out.as_mut().ok_or(ReportError::Closed)?;
        for (url, title) in record.links.iter() {
            writeln!(out, "{}:{}", url, title)?;
        }
        out.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReportError> {
        if !self.state.enter_close() {
            return Ok(());
        }
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for TextSink<W> {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            if let Err(e) = self.close() {
                warn!("Failed to close text report: {}", e);
            }
        }
    }
}
