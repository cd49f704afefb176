//! Page list: positional URLs or a `url,title,sameDomain,onlyTextExists,newOnlyDiff` file

use crate::error::PageListError;
use crate::schema::PageSpec;
use std::path::Path;
use tracing::debug;

/// Flag values used when a page does not set its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageDefaults {
    pub same_domain: bool,
    pub only_text_exists: bool,
    pub new_only_diff: bool,
}

impl PageDefaults {
    fn apply(&self, url: &str) -> PageSpec {
        PageSpec {
            same_domain: self.same_domain,
            only_text_exists: self.only_text_exists,
            new_only_diff: self.new_only_diff,
            ..PageSpec::new(url)
        }
    }
}

/// Pages given directly on the command line
pub fn pages_from_urls(urls: &[String], defaults: PageDefaults) -> Vec<PageSpec> {
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(|u| defaults.apply(u))
        .collect()
}

/// Pages from a list file. Empty rows and rows without a URL are skipped;
/// missing flag columns fall back to `defaults`.
pub fn read_page_list(path: &Path, defaults: PageDefaults) -> Result<Vec<PageSpec>, PageListError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| PageListError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let mut pages = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| PageListError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(page) = parse_row(&row, defaults) {
            pages.push(page);
        }
    }

    debug!(path = %path.display(), count = pages.len(), "Page list loaded");
    Ok(pages)
}

fn parse_row(row: &csv::StringRecord, defaults: PageDefaults) -> Option<PageSpec> {
    let url = row.get(0).filter(|u| !u.is_empty())?;

    Some(PageSpec {
        url: url.to_string(),
        title: row.get(1).filter(|t| !t.is_empty()).map(String::from),
        same_domain: parse_flag(row.get(2), defaults.same_domain),
        only_text_exists: parse_flag(row.get(3), defaults.only_text_exists),
        new_only_diff: parse_flag(row.get(4), defaults.new_only_diff),
    })
}

fn parse_flag(field: Option<&str>, default: bool) -> bool {
    match field {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => default,
    }
}
