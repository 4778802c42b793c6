use crate::models::RawRecord;
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only table of raw records, at most one per listing URL.
#[derive(Debug)]
pub struct RecordCache {
    path: PathBuf,
    records: Vec<RawRecord>,
    urls: HashSet<String>,
}

impl RecordCache {
    /// Load the cache at `path`; a missing file is an empty cache.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stored: Vec<RawRecord> = super::read_json_or_default(&path).await?;

        let mut cache = Self {
            path,
            records: Vec::with_capacity(stored.len()),
            urls: HashSet::with_capacity(stored.len()),
        };
        for record in stored {
            let url = record.url.clone();
            if !cache.insert(record) {
                warn!(url = %url, "Dropping duplicate cache row");
            }
        }
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `record` unless its URL is already cached.
    pub fn insert(&mut self, record: RawRecord) -> bool {
        if !self.urls.insert(record.url.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Rewrite the whole table at its path.
    pub async fn save(&self) -> Result<()> {
        super::write_json(&self.path, &self.records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, price: &str) -> RawRecord {
        let mut record = RawRecord::new(url);
        record.insert("Slutpris", price);
        record
    }

    #[tokio::test]
    async fn rows_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = RecordCache::load(&path).await.unwrap();
        assert!(cache.is_empty());
        assert!(cache.insert(record("https://h.se/1", "1 000 000 kr")));
        cache.save().await.unwrap();

        let reloaded = RecordCache::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("https://h.se/1"));
        assert_eq!(reloaded.records()[0].get("Slutpris"), Some("1 000 000 kr"));
    }

    #[tokio::test]
    async fn second_insert_for_same_url_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RecordCache::load(dir.path().join("c.json")).await.unwrap();

        assert!(cache.insert(record("https://h.se/1", "1 kr")));
        assert!(!cache.insert(record("https://h.se/1", "2 kr")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.records()[0].get("Slutpris"), Some("1 kr"));
    }

    #[tokio::test]
    async fn rows_are_stored_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        let mut cache = RecordCache::load(&path).await.unwrap();
        cache.insert(record("https://h.se/1", "1 kr"));
        cache.save().await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json[0]["url"], "https://h.se/1");
        assert_eq!(json[0]["Slutpris"], "1 kr");
    }
}
