//! pseudo-rss CLI
//!
//! Visits web pages with headless Chrome and reports their links, or only the
//! links that are new since the last run.

use anyhow::{Context, Result};
use clap::Parser;
use pseudo_rss::browser::ChromeSession;
use pseudo_rss::logging::LogConfig;
use pseudo_rss::pages::{pages_from_urls, read_page_list, PageDefaults};
use pseudo_rss::{run_pages, PageSpec, ReportFormat, RunConfig};
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_CACHE_DIR: &str = ".pseudoRss";

#[derive(Parser)]
#[command(name = "pseudo-rss")]
#[command(author = "RoyalBit Inc.")]
#[command(version)]
#[command(about = "Watch web pages for new links with headless Chrome")]
#[command(long_about = "Visits each page, extracts its links and reports them.\n\nWith --diff only links missing from the previous run's snapshot are reported,\nwhich turns pages without a feed into a pseudo RSS.")]
struct Cli {
    /// Web pages to check
    #[arg(value_name = "PAGE")]
    pages: Vec<String>,

    /// Page list file: url,title,sameDomain,onlyTextExists,newOnlyDiff
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output file (default: stdout; output.docx for docx)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Snapshot cache directory (default: ~/.pseudoRss)
    #[arg(short, long, value_name = "DIR", env = "PSEUDO_RSS_CACHE")]
    cache: Option<PathBuf>,

    /// Only keep links under the page's own URL
    #[arg(short = 's', long = "sameDomain")]
    same_domain: bool,

    /// Only keep links with visible text
    #[arg(short = 't', long = "onlyTextExists")]
    only_text_exists: bool,

    /// Report only links that are new since the last run
    #[arg(short, long)]
    diff: bool,

    /// With --diff, stop at the first known link after new ones
    #[arg(short = 'n', long = "newOnlyDiff")]
    new_only_diff: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Log progress and per-page details to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Navigation timeout per page in milliseconds
    #[arg(long, default_value = "30000")]
    timeout: u64,
}

impl Cli {
    fn defaults(&self) -> PageDefaults {
        PageDefaults {
            same_domain: self.same_domain,
            only_text_exists: self.only_text_exists,
            new_only_diff: self.new_only_diff,
        }
    }

    /// List file entries first, then positional pages
    fn page_specs(&self) -> Result<Vec<PageSpec>> {
        let mut pages = Vec::new();
        if let Some(input) = &self.input {
            pages.extend(
                read_page_list(input, self.defaults())
                    .with_context(|| format!("Failed to read input {}", input.display()))?,
            );
        }
        pages.extend(pages_from_urls(&self.pages, self.defaults()));
        Ok(pages)
    }

    fn cache_dir(&self) -> PathBuf {
        self.cache.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_CACHE_DIR)
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    LogConfig {
        verbose: cli.verbose,
    }
    .init();

    let pages = cli.page_specs()?;
    if pages.is_empty() {
        eprintln!("Usage:");
        eprintln!("  pseudo-rss <PAGE>...              Check pages given as arguments");
        eprintln!("  pseudo-rss --input <list.csv>     Check pages from a list file");
        eprintln!("  pseudo-rss --diff <PAGE>...       Report only new links");
        std::process::exit(1);
    }

    let config = RunConfig {
        cache_dir: cli.cache_dir(),
        diff: cli.diff,
        format: cli.format,
        output: cli.output.clone(),
    };
    info!(
        pages = pages.len(),
        cache = %config.cache_dir.display(),
        format = %config.format,
        diff = config.diff,
        "Starting run"
    );

    let mut session = ChromeSession::launch(cli.timeout)
        .await
        .context("Failed to start browser session")?;
    let outcome = run_pages(&mut session, &pages, &config).await;
    if let Err(e) = session.close().await {
        warn!("{}", e);
    }

    let summary = outcome?;
    info!(
        ok = summary.ok_pages(),
        total = summary.pages,
        links = summary.reported_links,
        "Done"
    );

    summary.check()
}
