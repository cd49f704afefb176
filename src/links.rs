//! Link extraction and filtering on a rendered page

use crate::error::ExtractError;
use crate::page::PageDom;
use crate::schema::LinkMap;
use tracing::{debug, warn};
use url::Url;

/// Every anchor on the page
pub const ANCHOR_SELECTOR: &str = "a";

/// Anchors many blog themes use for actual posts
pub const POST_LINK_SELECTOR: &str = "a.post-link";

/// Extract the page's links.
///
/// Runs a blanket anchor pass and a post-link pass with the same filters; the
/// post-link pass wins when both produce the same URL. A failing pass
/// contributes nothing.
pub fn extract_links<D: PageDom + ?Sized>(
    dom: &D,
    same_domain: bool,
    only_text_exists: bool,
) -> LinkMap {
    let mut links = LinkMap::new();

    for selector in [ANCHOR_SELECTOR, POST_LINK_SELECTOR] {
        match links_by_selector(dom, selector, same_domain, only_text_exists) {
            Ok(found) => {
                debug!(url = dom.url(), selector, count = found.len(), "Selector pass");
                links.merge(found);
            }
            Err(e) => warn!(url = dom.url(), selector, "Link extraction failed: {}", e),
        }
    }

    links
}

/// Links matched by one selector, filtered
pub fn links_by_selector<D: PageDom + ?Sized>(
    dom: &D,
    selector: &str,
    same_domain: bool,
    only_text_exists: bool,
) -> Result<LinkMap, ExtractError> {
    let page_url = dom.url();
    let mut links = LinkMap::new();

    for anchor in dom.find_anchors(selector)? {
        let Some(url) = anchor.href else {
            continue;
        };
        let title = sanitize_title(&anchor.text);

        if only_text_exists && title.is_empty() {
            continue;
        }
        if same_domain && !is_same_domain(page_url, &url) {
            continue;
        }

        links.insert(url, title);
    }

    Ok(links)
}

/// Trim, then replace each C0 control character and DEL with a space
pub fn sanitize_title(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if is_control(c) { ' ' } else { c })
        .collect()
}

fn is_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{1f}' | '\u{7f}')
}

/// True if `link` is on the same host (and port) as `page` and starts with `page`
pub fn is_same_domain(page: &str, link: &str) -> bool {
    match (netloc(page), netloc(link)) {
        (Some(a), Some(b)) => a == b && link.starts_with(page),
        _ => false,
    }
}

fn netloc(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
