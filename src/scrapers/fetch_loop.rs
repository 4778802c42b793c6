use crate::models::RawRecord;
use crate::pacing::Pacing;
use crate::scrapers::listing::extract_fields;
use crate::scrapers::traits::Fetcher;
use crate::storage::RecordCache;
use anyhow::Result;
use tracing::{error, info};

/// Counts for one pass over the candidate URLs. Every candidate lands in
/// exactly one of the buckets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub fetched: usize,
    pub cached: usize,
    pub failed: usize,
    /// Uncached URLs left for a later run because of the per-run limit
    pub deferred: usize,
}

/// Fetch and extract every candidate that is not cached yet, persisting the
/// cache after each new record. Returns the counts plus the newly added
/// records, in the order they were fetched.
///
/// A failed URL is logged and left out of the cache so the next run picks it
/// up again. Only a failure to write the cache aborts the loop.
pub async fn fetch_uncached(
    fetcher: &dyn Fetcher,
    cache: &mut RecordCache,
    candidates: &[String],
    pacing: Pacing,
    limit: Option<usize>,
) -> Result<(FetchSummary, Vec<RawRecord>)> {
    let mut summary = FetchSummary::default();
    let mut added = Vec::new();
    let mut attempts = 0usize;

    for url in candidates {
        if cache.contains(url) {
            info!(url = %url, "Skipping already scraped URL");
            summary.cached += 1;
            continue;
        }

        if limit.is_some_and(|max| attempts >= max) {
            summary.deferred += 1;
            continue;
        }
        attempts += 1;

        let html = match fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                error!(url = %url, error = %e, "Error collecting data");
                summary.failed += 1;
                pacing.pause().await;
                continue;
            }
        };

        let mut record = extract_fields(&html);
        record.url = url.clone();

        let inserted = cache.insert(record.clone());
        debug_assert!(inserted, "uncached URL was already in the cache");
        cache.save().await?;
        info!(url = %url, fields = record.fields.len(), "Data collected");
        summary.fetched += 1;
        added.push(record);

        pacing.pause().await;
    }

    info!(
        fetched = summary.fetched,
        cached = summary.cached,
        failed = summary.failed,
        deferred = summary.deferred,
        "Fetch pass finished"
    );
    Ok((summary, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http::testing::StaticFetcher;

    const PAGE: &str = r#"<h1 class="hcl-heading">Storgatan 1</h1>"#;

    fn candidates(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fetches_uncached_and_skips_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = RecordCache::load(&path).await.unwrap();
        cache.insert(RawRecord::new("https://h.se/old"));

        let fetcher = StaticFetcher::default().with_page("https://h.se/new", PAGE);
        let urls = candidates(&["https://h.se/old", "https://h.se/new"]);

        let (summary, added) = fetch_uncached(&fetcher, &mut cache, &urls, Pacing::disabled(), None)
            .await
            .unwrap();

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.cached, 1);
        assert_eq!(fetcher.requests(), vec!["https://h.se/new"]);
        assert_eq!(added[0].url, "https://h.se/new");
        assert_eq!(added[0].title(), Some("Storgatan 1"));

        let reloaded = RecordCache::load(&path).await.unwrap();
        assert!(reloaded.contains("https://h.se/new"));
    }

    #[tokio::test]
    async fn failure_is_counted_and_left_for_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RecordCache::load(dir.path().join("cache.json")).await.unwrap();

        let fetcher = StaticFetcher::default().with_page("https://h.se/2", PAGE);
        let urls = candidates(&["https://h.se/1", "https://h.se/2"]);

        let (summary, _) = fetch_uncached(&fetcher, &mut cache, &urls, Pacing::disabled(), None)
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 1);
        assert!(!cache.contains("https://h.se/1"));
        assert_eq!(summary.fetched + summary.cached + summary.failed, urls.len());
    }

    #[tokio::test]
    async fn rerun_without_new_urls_leaves_cache_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let fetcher = StaticFetcher::default()
            .with_page("https://h.se/1", PAGE)
            .with_page("https://h.se/2", PAGE);
        let urls = candidates(&["https://h.se/1", "https://h.se/2"]);

        let mut cache = RecordCache::load(&path).await.unwrap();
        fetch_uncached(&fetcher, &mut cache, &urls, Pacing::disabled(), None)
            .await
            .unwrap();
        let first = std::fs::read(&path).unwrap();

        let mut cache = RecordCache::load(&path).await.unwrap();
        let (summary, added) = fetch_uncached(&fetcher, &mut cache, &urls, Pacing::disabled(), None)
            .await
            .unwrap();

        assert_eq!(summary.cached, 2);
        assert!(added.is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), first);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn repeated_candidate_is_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RecordCache::load(dir.path().join("cache.json")).await.unwrap();
        let fetcher = StaticFetcher::default().with_page("https://h.se/1", PAGE);
        let urls = candidates(&["https://h.se/1", "https://h.se/1"]);

        let (summary, added) = fetch_uncached(&fetcher, &mut cache, &urls, Pacing::disabled(), None)
            .await
            .unwrap();

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.cached, 1);
        assert_eq!(added.len(), 1);
        assert_eq!(fetcher.requests(), vec!["https://h.se/1"]);
    }

    #[tokio::test]
    async fn failures_are_paced_like_successes() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RecordCache::load(dir.path().join("cache.json")).await.unwrap();
        let fetcher = StaticFetcher::default();
        let urls = candidates(&["https://h.se/1", "https://h.se/2"]);

        let started = std::time::Instant::now();
        let (summary, _) =
            fetch_uncached(&fetcher, &mut cache, &urls, Pacing::new(40, 0), None)
                .await
                .unwrap();

        assert_eq!(summary.failed, 2);
        assert!(started.elapsed() >= std::time::Duration::from_millis(80));
    }

    #[tokio::test]
    async fn limit_defers_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RecordCache::load(dir.path().join("cache.json")).await.unwrap();
        let fetcher = StaticFetcher::default()
            .with_page("https://h.se/1", PAGE)
            .with_page("https://h.se/2", PAGE)
            .with_page("https://h.se/3", PAGE);
        let urls = candidates(&["https://h.se/1", "https://h.se/2", "https://h.se/3"]);

        let (summary, _) = fetch_uncached(&fetcher, &mut cache, &urls, Pacing::disabled(), Some(2))
            .await
            .unwrap();

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.deferred, 1);
        assert!(!cache.contains("https://h.se/3"));
    }
}
