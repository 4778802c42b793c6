use crate::models::GeoPoint;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Listing title -> coordinates, `None` meaning the lookup found nothing.
/// Entries are never replaced once written.
#[derive(Debug)]
pub struct GeocodeCache {
    path: PathBuf,
    entries: BTreeMap<String, Option<GeoPoint>>,
}

impl GeocodeCache {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = super::read_json_or_default(&path).await?;
        Ok(Self { path, entries })
    }

    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    /// Coordinates for `title` if it was looked up and found.
    pub fn point(&self, title: &str) -> Option<GeoPoint> {
        self.entries.get(title).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Record a lookup result; existing entries win.
    pub fn insert(&mut self, title: impl Into<String>, point: Option<GeoPoint>) -> bool {
        let title = title.into();
        if self.entries.contains_key(&title) {
            return false;
        }
        self.entries.insert(title, point);
        true
    }

    pub async fn save(&self) -> Result<()> {
        super::write_json(&self.path, &self.entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn found_and_not_found_are_both_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.json");

        let mut cache = GeocodeCache::load(&path).await.unwrap();
        cache.insert("Storgatan 1", Some(GeoPoint { lat: 55.6, lon: 13.0 }));
        cache.insert("Okänd väg 9", None);
        cache.save().await.unwrap();

        let cache = GeocodeCache::load(&path).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.point("Storgatan 1"), Some(GeoPoint { lat: 55.6, lon: 13.0 }));
        assert!(cache.contains("Okänd väg 9"));
        assert_eq!(cache.point("Okänd väg 9"), None);
    }

    #[tokio::test]
    async fn entries_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = GeocodeCache::load(dir.path().join("geo.json")).await.unwrap();

        assert!(cache.insert("A", None));
        assert!(!cache.insert("A", Some(GeoPoint { lat: 1.0, lon: 2.0 })));
        assert_eq!(cache.point("A"), None);
    }
}
