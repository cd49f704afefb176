//! JSON array of page records, streamed one record at a time

use super::{ReportSink, SinkState};
use crate::error::ReportError;
use crate::schema::ReportRecord;
use std::io::Write;
use tracing::warn;

/// Writes `[` up front, each record as it arrives, and `]` on close.
/// Records are comma-separated without a trailing comma.
pub struct JsonSink<W: Write> {
    out: Option<W>,
    state: SinkState,
    written: usize,
}

impl<W: Write> JsonSink<W> {
    pub fn new(mut out: W) -> Result<Self, ReportError> {
        write!(out, "[")?;
        out.flush()?;
        Ok(Self {
            out: Some(out),
            state: SinkState::default(),
            written: 0,
        })
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn print_header(&mut self) -> Result<(), ReportError> {
        self.state.enter_print()
    }

    fn print(&mut self, record: &ReportRecord) -> Result<(), ReportError> {
        self.state.enter_print()?;
        let out = self.out.as_mut().ok_or(ReportError::Closed)?;
        if self.written > 0 {
            write!(out, ",")?;
        }
        writeln!(out)?;
        serde_json::to_writer(&mut *out, record)?;
        out.flush()?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReportError> {
        if !self.state.enter_close() {
            return Ok(());
        }
        if let Some(mut out) = self.out.take() {
            writeln!(out)?;
            writeln!(out, "]")?;
            out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for JsonSink<W> {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            if let Err(e) = self.close() {
                warn!("Failed to close JSON report: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::record;

    fn render(records: &[ReportRecord]) -> String {
        let mut buf = Vec::new();
        {
            let mut sink = JsonSink::new(&mut buf).unwrap();
            sink.print_header().unwrap();
            for r in records {
                sink.print(r).unwrap();
            }
            sink.close().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_multiple_records_are_valid_json() {
        let out = render(&[
            record("https://a.test/", Some("A"), &[("https://a.test/1", "One")]),
            record("https://b.test/", None, &[]),
        ]);
        assert!(!out.contains(",\n]"));

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["site"], "https://a.test/");
        assert_eq!(items[0]["title"], "A");
        assert_eq!(items[0]["links"]["https://a.test/1"], "One");
        assert!(items[1].get("title").is_none());
    }

    #[test]
    fn test_empty_array() {
        let out = render(&[]);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }
}
