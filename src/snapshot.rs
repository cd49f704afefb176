//! Per-page snapshot cache
//!
//! One JSON file per source URL holding the last extracted link map plus a
//! `lastUpdate` timestamp. The file name is the URL's netloc and path as
//! written, unsafe characters replaced, so distinct URLs can collide: `/a/b`
//! and `/a_b` on one host share a file.

use crate::error::CacheError;
use crate::schema::LinkMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk layout, written
#[derive(Serialize)]
struct SnapshotOut<'a> {
    #[serde(flatten)]
    links: &'a LinkMap,
    #[serde(rename = "lastUpdate")]
    last_update: String,
}

/// On-disk layout, read
#[derive(Deserialize)]
struct SnapshotIn {
    #[serde(flatten)]
    links: LinkMap,
    /// Informational only; any JSON type is accepted
    #[serde(rename = "lastUpdate", default)]
    last_update: Option<serde_json::Value>,
}

/// Snapshot files under one cache directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `url`
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(cache_file_name(url))
    }

    /// Previous links for `url`; empty when there is no usable snapshot
    pub fn restore(&self, url: &str) -> LinkMap {
        let path = self.path_for(url);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), "No snapshot: {}", e);
                return LinkMap::new();
            }
        };

        match serde_json::from_str::<SnapshotIn>(&content) {
            Ok(snapshot) => {
                debug!(
                    path = %path.display(),
                    last_update = snapshot
                        .last_update
                        .as_ref()
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown"),
                    "Snapshot restored"
                );
                snapshot.links
            }
            Err(e) => {
                warn!(path = %path.display(), "Ignoring corrupt snapshot: {}", e);
                LinkMap::new()
            }
        }
    }

    /// Persist `links` as the snapshot for `url`
    pub fn store(&self, url: &str, links: &LinkMap) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(url);
        let snapshot = SnapshotOut {
            links,
            last_update: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        // Write beside the snapshot, then rename over it
        let tmp = self.dir.join(format!(".{}.tmp", cache_file_name(url)));
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| {
                let _ = fs::remove_file(&tmp);
                CacheError::Write {
                    path: path.clone(),
                    source,
                }
            })?;

        debug!(path = %path.display(), links = links.len(), "Snapshot stored");
        Ok(path)
    }
}

/// Netloc and path of `url` as written, anything outside `[A-Za-z0-9-_.]` as `_`.
///
/// Query and fragment are dropped; the host keeps its case and an explicit
/// port stays even when it is the scheme default.
pub fn cache_file_name(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let end = rest.find(|c: char| c == '?' || c == '#').unwrap_or(rest.len());

    rest[..end]
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cache_file_name() {
        assert_eq!(cache_file_name("https://blog.example/"), "blog.example_");
        assert_eq!(cache_file_name("https://blog.example"), "blog.example");
        assert_eq!(
            cache_file_name("https://Example.com:443/Blog/"),
            "Example.com_443_Blog_"
        );
        assert_eq!(
            cache_file_name("https://example.com/blog/2024?page=2#top"),
            "example.com_blog_2024"
        );
        assert_eq!(cache_file_name("http://localhost:8080/a-b_c"), "localhost_8080_a-b_c");
        assert_eq!(cache_file_name("not a url"), "not_a_url");
    }

    #[test]
    fn test_known_collision() {
        assert_eq!(
            cache_file_name("https://a.test/x/y"),
            cache_file_name("https://a.test/x_y")
        );
    }

    #[test]
    fn test_store_restore_roundtrip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("cache"));
        let links: LinkMap = [
            ("https://blog.example/p2", "Post 2"),
            ("https://blog.example/p1", "Post 1"),
            ("https://blog.example/img", ""),
        ]
        .into_iter()
        .collect();

        let path = store.store("https://blog.example/", &links).unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "blog.example_");
        assert!(!links.contains("lastUpdate"));

        let restored = store.restore("https://blog.example/");
        assert_eq!(restored, links);
        assert!(!restored.contains("lastUpdate"));

        let raw = std::fs::read_to_string(path).unwrap();
        assert!(raw.contains("\"lastUpdate\""));
    }

    #[test]
    fn test_restore_missing_or_corrupt() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.restore("https://nothing.test/").is_empty());

        std::fs::write(store.path_for("https://bad.test/"), "{not json").unwrap();
        assert!(store.restore("https://bad.test/").is_empty());

        std::fs::write(store.path_for("https://num.test/"), r#"{"https://num.test/a": 3}"#).unwrap();
        assert!(store.restore("https://num.test/").is_empty());
    }

    #[test]
    fn test_store_overwrites() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let first: LinkMap = [("https://a.test/1", "one")].into_iter().collect();
        let second: LinkMap = [("https://a.test/2", "two")].into_iter().collect();

        store.store("https://a.test/", &first).unwrap();
        store.store("https://a.test/", &second).unwrap();
        assert_eq!(store.restore("https://a.test/"), second);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("a.test_")]);
    }

    #[test]
    fn test_restore_with_numeric_timestamp() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        std::fs::write(
            store.path_for("https://a.test/"),
            r#"{"https://a.test/1": "One", "lastUpdate": 1700000000.5}"#,
        )
        .unwrap();

        let restored = store.restore("https://a.test/");
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get("https://a.test/1"), Some("One"));
        assert!(!restored.contains("lastUpdate"));
    }

    #[test]
    fn test_store_into_unwritable_dir() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let store = SnapshotStore::new(blocker.join("cache"));
        let links: LinkMap = [("https://a.test/1", "one")].into_iter().collect();
        assert!(matches!(
            store.store("https://a.test/", &links),
            Err(CacheError::CreateDir { .. })
        ));
    }
}
