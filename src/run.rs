//! One pass over the page list: render, extract, diff, snapshot, report

use crate::diff::new_links;
use crate::links::extract_links;
use crate::page::PageRenderer;
use crate::report::{open_sink, ReportFormat, ReportSink};
use crate::schema::{LinkMap, PageSpec, ReportRecord};
use crate::snapshot::SnapshotStore;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Settings shared by every page of a run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cache_dir: PathBuf,
    /// Report only links absent from the previous snapshot
    pub diff: bool,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

/// Outcome counters for a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub failed_pages: usize,
    pub reported_links: usize,
    pub cache_failures: usize,
}

impl RunSummary {
    pub fn ok_pages(&self) -> usize {
        self.pages - self.failed_pages
    }

    /// Fail a run whose report was written but left snapshots unsaved
    pub fn check(&self) -> Result<()> {
        if self.cache_failures > 0 {
            bail!(
                "{} of {} snapshots could not be saved",
                self.cache_failures,
                self.pages
            );
        }
        Ok(())
    }
}

/// Open the configured sink and check every page with `renderer`
pub async fn run_pages<R: PageRenderer>(
    renderer: &mut R,
    pages: &[PageSpec],
    config: &RunConfig,
) -> Result<RunSummary> {
    let store = SnapshotStore::new(&config.cache_dir);
    let mut sink = open_sink(config.format, config.output.as_deref())
        .with_context(|| format!("Failed to open {} output", config.format))?;

    let result = check_pages(renderer, pages, &store, sink.as_mut(), config.diff).await;
    let closed = sink.close().context("Failed to finish report");

    let summary = result?;
    closed?;
    Ok(summary)
}

/// Check pages in order, writing one record per page to `sink`.
///
/// A page that fails to load reports no links and keeps its previous
/// snapshot. Snapshot write failures are counted, not fatal.
pub async fn check_pages<R: PageRenderer>(
    renderer: &mut R,
    pages: &[PageSpec],
    store: &SnapshotStore,
    sink: &mut dyn ReportSink,
    diff: bool,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    sink.print_header().context("Failed to write report header")?;

    for page in pages {
        summary.pages += 1;
        info!(url = %page.url, "Checking page");

        let current = match renderer.render(&page.url).await {
            Ok(dom) => Some(extract_links(&dom, page.same_domain, page.only_text_exists)),
            Err(e) => {
                error!(url = %page.url, "{}", e);
                summary.failed_pages += 1;
                None
            }
        };

        let links = match &current {
            Some(current) if diff => {
                let previous = store.restore(&page.url);
                new_links(&previous, current, page.new_only_diff)
            }
            Some(current) => current.clone(),
            None => LinkMap::new(),
        };
        debug!(url = %page.url, links = links.len(), "Links to report");

        if let Some(current) = &current {
            if let Err(e) = store.store(&page.url, current) {
                error!(url = %page.url, "Snapshot not saved: {}", e);
                summary.cache_failures += 1;
            }
        }

        summary.reported_links += links.len();
        let record = ReportRecord {
            site: page.url.clone(),
            title: page.title.clone(),
            links,
        };
        sink.print(&record)
            .with_context(|| format!("Failed to write report for {}", page.url))?;
    }

    Ok(summary)
}
