use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

/// Every listing URL seen so far, in first-seen order.
#[derive(Debug)]
pub struct LinkStore {
    path: PathBuf,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl LinkStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stored: Vec<String> = super::read_json_or_default(&path).await?;

        let mut store = Self {
            path,
            urls: Vec::new(),
            seen: HashSet::new(),
        };
        store.merge(stored);
        Ok(store)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Add the URLs not seen before; returns how many were new.
    pub fn merge<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.urls.len();
        for url in urls {
            if self.seen.insert(url.clone()) {
                self.urls.push(url);
            }
        }
        self.urls.len() - before
    }

    pub async fn save(&self) -> Result<()> {
        super::write_json(&self.path, &self.urls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn merge_counts_only_unseen_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");

        let mut store = LinkStore::load(&path).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.merge(urls(&["a", "b", "a"])), 2);
        assert!(!store.is_empty());
        store.save().await.unwrap();

        let mut store = LinkStore::load(&path).await.unwrap();
        assert_eq!(store.merge(urls(&["b", "c"])), 1);
        assert_eq!(store.urls(), &urls(&["a", "b", "c"])[..]);
    }
}
