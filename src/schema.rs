//! Link maps, page specs and report records
//!
//! Shared by extraction, the snapshot cache, diffing and every report sink.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Links found on one page visit: url -> title, in extraction order.
///
/// Inserting an existing url replaces its title but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkMap(IndexMap<String, String>);

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a link, returning the previous title if any
    pub fn insert(&mut self, url: impl Into<String>, title: impl Into<String>) -> Option<String> {
        self.0.insert(url.into(), title.into())
    }

    /// Merge `other` into `self`; entries of `other` win on collision
    pub fn merge(&mut self, other: LinkMap) {
        self.0.extend(other.0);
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.0.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(u, t)| (u.as_str(), t.as_str()))
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<U: Into<String>, T: Into<String>> FromIterator<(U, T)> for LinkMap {
    fn from_iter<I: IntoIterator<Item = (U, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(u, t)| (u.into(), t.into()))
                .collect(),
        )
    }
}

/// One page to check during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    pub url: String,
    pub title: Option<String>,
    /// Keep only links on the page's host that are prefixed by the page URL
    pub same_domain: bool,
    /// Drop links whose title is empty
    pub only_text_exists: bool,
    /// In diff mode, stop at the first known link after new ones
    pub new_only_diff: bool,
}

impl PageSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            same_domain: false,
            only_text_exists: false,
            new_only_diff: false,
        }
    }
}

/// What a report sink receives for each page
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub site: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub links: LinkMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut links = LinkMap::new();
        links.insert("https://a.test/1", "one");
        links.insert("https://a.test/2", "two");
        assert_eq!(links.insert("https://a.test/1", "uno"), Some("one".to_string()));

        let urls: Vec<&str> = links.urls().collect();
        assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2"]);
        assert_eq!(links.get("https://a.test/1"), Some("uno"));
    }

    #[test]
    fn test_merge_second_wins() {
        let mut first: LinkMap = [("u1", "t1"), ("u2", "t2")].into_iter().collect();
        let second: LinkMap = [("u1", "t1b"), ("u3", "t3")].into_iter().collect();
        first.merge(second);

        assert_eq!(first.len(), 3);
        assert_eq!(first.get("u1"), Some("t1b"));
        assert_eq!(first.get("u3"), Some("t3"));
    }

    #[test]
    fn test_serialize_record() {
        let record = ReportRecord {
            site: "https://blog.example/".to_string(),
            title: None,
            links: [("https://blog.example/p1", "Post 1")].into_iter().collect(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"site":"https://blog.example/","links":{"https://blog.example/p1":"Post 1"}}"#
        );
    }
}
