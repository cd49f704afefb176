//! pseudo-rss: watch web pages for new links with headless Chrome
//!
//! Each run visits a list of pages, extracts their links, and reports either
//! all of them or only those not seen in the previous run's snapshot.

pub mod browser;
pub mod diff;
pub mod error;
pub mod links;
pub mod logging;
pub mod page;
pub mod pages;
pub mod report;
pub mod run;
pub mod schema;
pub mod snapshot;

pub use diff::new_links;
pub use links::extract_links;
pub use page::{HtmlDom, PageDom, PageRenderer, StaticRenderer};
pub use report::{open_sink, ReportFormat, ReportSink};
pub use run::{check_pages, run_pages, RunConfig, RunSummary};
pub use schema::{LinkMap, PageSpec, ReportRecord};
pub use snapshot::SnapshotStore;
