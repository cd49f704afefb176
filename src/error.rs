//! Error types for each stage of a run

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the page renderer (browser session or navigation)
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch Chrome: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Failed to read page content for {url}: {message}")]
    Content { url: String, message: String },
}

/// Failure of a single selector query on a rendered page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Snapshot cache write failures. Reads never fail.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write snapshot {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Report output failures
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed document {}: {message}", .path.display())]
    Document { path: PathBuf, message: String },

    #[error("Report sink already closed")]
    Closed,
}

/// Page list file failures
#[derive(Debug, Error)]
pub enum PageListError {
    #[error("Failed to read page list {}: {source}", .path.display())]
    Read { path: PathBuf, source: csv::Error },
}
