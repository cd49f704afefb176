//! Rendered pages: the renderer contract and an HTML-backed DOM handle

use crate::error::{ExtractError, RenderError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use url::Url;

/// An anchor element as seen on a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute URL, or None if the element had no usable href
    pub href: Option<String>,
    /// Visible text, whitespace runs collapsed, otherwise unsanitized
    pub text: String,
}

/// Queryable view of a rendered page
pub trait PageDom {
    /// URL the page was requested with
    fn url(&self) -> &str;

    /// Anchors matching a CSS selector, hrefs resolved against the page
    fn find_anchors(&self, selector: &str) -> Result<Vec<Anchor>, ExtractError>;
}

/// Attribute a live browser stamps on each anchor with its rendered `innerText`
pub const RENDERED_TEXT_ATTR: &str = "data-pseudo-rss-text";

/// Attribute a live browser stamps on each anchor with its resolved `href` property
pub const RENDERED_HREF_ATTR: &str = "data-pseudo-rss-href";

/// Turns a URL into a queryable page
#[async_trait(?Send)]
pub trait PageRenderer {
    type Dom: PageDom;

    async fn render(&mut self, url: &str) -> Result<Self::Dom, RenderError>;
}

/// DOM handle over a parsed HTML snapshot of a page
pub struct HtmlDom {
    url: String,
    base: Option<Url>,
    document: Html,
}

impl HtmlDom {
    /// Parse `html` requested from `url`
    pub fn parse(url: &str, html: &str) -> Self {
        Self::with_final_url(url, None, html)
    }

    /// Parse `html` requested from `url` that ended up at `final_url` after redirects.
    /// Relative hrefs resolve against `<base href>`, then the final URL, then `url`.
    pub fn with_final_url(url: &str, final_url: Option<&str>, html: &str) -> Self {
        let document = Html::parse_document(html);
        let page_base = final_url
            .and_then(|u| Url::parse(u).ok())
            .or_else(|| Url::parse(url).ok());
        let base = match base_href(&document) {
            Some(href) => match &page_base {
                Some(page) => page.join(&href).ok().or_else(|| page_base.clone()),
                None => Url::parse(&href).ok(),
            },
            None => page_base,
        };

        Self {
            url: url.to_string(),
            base,
            document,
        }
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        let resolved = match &self.base {
            Some(base) => base.join(href).ok()?,
            None => Url::parse(href).ok()?,
        };
        Some(resolved.to_string())
    }
}

impl PageDom for HtmlDom {
    fn url(&self) -> &str {
        &self.url
    }

    fn find_anchors(&self, selector: &str) -> Result<Vec<Anchor>, ExtractError> {
        let sel = Selector::parse(selector).map_err(|e| ExtractError::Selector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })?;

        Ok(self
            .document
            .select(&sel)
            .map(|el| {
                let attrs = el.value();
                let href = attrs
                    .attr(RENDERED_HREF_ATTR)
                    .or_else(|| attrs.attr("href"))
                    .and_then(|h| self.resolve(h));
                let text = match attrs.attr(RENDERED_TEXT_ATTR) {
                    Some(rendered) => collapse_whitespace(rendered),
                    None => visible_text(el),
                };
                Anchor { href, text }
            })
            .collect())
    }
}

/// Text a reader would see inside `el`: hidden subtrees skipped, whitespace runs collapsed
fn visible_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    collapse_whitespace(&raw)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if !is_rendered(&child) {
                    continue;
                }
                let block = is_block(child.value().name());
                if block {
                    out.push(' ');
                }
                collect_text(child, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn is_rendered(el: &ElementRef<'_>) -> bool {
    let element = el.value();
    if matches!(
        element.name(),
        "script" | "style" | "noscript" | "template" | "head"
    ) {
        return false;
    }
    if element.attr("hidden").is_some() {
        return false;
    }
    match element.attr("style") {
        Some(style) => {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            !style.contains("display:none") && !style.contains("visibility:hidden")
        }
        None => true,
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "address" | "article" | "aside" | "blockquote" | "br" | "dd" | "div" | "dl" | "dt"
            | "figcaption" | "figure" | "footer" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            | "header" | "hr" | "li" | "main" | "nav" | "ol" | "p" | "pre" | "section"
            | "table" | "td" | "th" | "tr" | "ul"
    )
}

fn base_href(document: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Renderer over pre-fetched HTML keyed by URL.
///
/// Unknown URLs fail like a navigation error would.
#[derive(Debug, Default)]
pub struct StaticRenderer {
    pages: HashMap<String, String>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

#[async_trait(?Send)]
impl PageRenderer for StaticRenderer {
    type Dom = HtmlDom;

    async fn render(&mut self, url: &str) -> Result<HtmlDom, RenderError> {
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| RenderError::Navigation {
                url: url.to_string(),
                message: "NETWORK_ERROR".to_string(),
            })?;
        Ok(HtmlDom::parse(url, html))
    }
}
