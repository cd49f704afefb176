//! Report sinks: one writer per output encoding
//!
//! Every sink follows `Created -> print_header -> print* -> Closed`. Printing
//! after `close` is an error; closing twice is a no-op; dropping an unclosed
//! sink closes it best-effort.

mod csv;
mod docx;
mod json;
mod text;

pub use self::csv::CsvSink;
pub use self::docx::{DocxSink, DEFAULT_DOCX_PATH};
pub use self::json::JsonSink;
pub use self::text::TextSink;

use crate::error::ReportError;
use crate::schema::ReportRecord;
use clap::ValueEnum;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Streaming writer for per-page link records
pub trait ReportSink {
    /// Write the format's preamble (no-op for some formats)
    fn print_header(&mut self) -> Result<(), ReportError>;

    /// Write one page's links
    fn print(&mut self, record: &ReportRecord) -> Result<(), ReportError>;

    /// Finish the output and release the destination
    fn close(&mut self) -> Result<(), ReportError>;
}

/// Output encoding, chosen once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Csv,
    Docx,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Docx => write!(f, "docx"),
        }
    }
}

/// Open the sink for `format`, writing to `output` or stdout.
///
/// Text and CSV append to an existing file, JSON replaces it, and the
/// document format always needs a file (`output.docx` by default).
pub fn open_sink(
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<Box<dyn ReportSink>, ReportError> {
    let sink: Box<dyn ReportSink> = match format {
        ReportFormat::Text => Box::new(TextSink::new(open_stream(output, true)?)),
        ReportFormat::Json => Box::new(JsonSink::new(open_stream(output, false)?)?),
        ReportFormat::Csv => Box::new(CsvSink::new(open_stream(output, true)?)),
        ReportFormat::Docx => Box::new(DocxSink::open(
            output.unwrap_or_else(|| Path::new(DEFAULT_DOCX_PATH)),
        )?),
    };
    Ok(sink)
}

fn open_stream(output: Option<&Path>, append: bool) -> Result<Box<dyn Write>, ReportError> {
    let Some(path) = output else {
        return Ok(Box::new(io::stdout()));
    };
    let file: File = if append {
        OpenOptions::new().create(true).append(true).open(path)?
    } else {
        File::create(path)?
    };
    Ok(Box::new(io::BufWriter::new(file)))
}

/// Lifecycle shared by all sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SinkState {
    #[default]
    Created,
    Open,
    Closed,
}

impl SinkState {
    /// Move to `Open`, failing once closed
    pub(crate) fn enter_print(&mut self) -> Result<(), ReportError> {
        if *self == SinkState::Closed {
            return Err(ReportError::Closed);
        }
        *self = SinkState::Open;
        Ok(())
    }

    /// Move to `Closed`; false if it already was
    pub(crate) fn enter_close(&mut self) -> bool {
        let was_open = *self != SinkState::Closed;
        *self = SinkState::Closed;
        was_open
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self == SinkState::Closed
    }
}
