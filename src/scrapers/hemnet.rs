use crate::pacing::Pacing;
use crate::scrapers::traits::{FetchError, Fetcher};
use crate::scrapers::types::{AreaBin, SearchParams};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

static PAGINATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".hcl-pagination").unwrap());
static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-testid="result-list"] a.hcl-card"#).unwrap());
// "Visar 1 - 50 av 1 234"; the total may carry thousands separators.
static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"av\s+(\d+(?:[ \u{a0}]\d{3})*)").unwrap());

/// Outcome of a range-partitioned crawl. `urls` is in crawl order and may
/// contain duplicates; deduplication happens against the link store.
#[derive(Debug, Default)]
pub struct CollectedLinks {
    pub urls: Vec<String>,
    pub bins: usize,
    pub bins_skipped: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
}

/// Walk every area bin and every result page in it, gathering listing URLs.
/// Failures only ever drop the bin or page they happened in.
pub async fn collect_links(
    fetcher: &dyn Fetcher,
    params: &SearchParams,
    pacing: Pacing,
) -> CollectedLinks {
    let mut collected = CollectedLinks::default();

    for bin in params.area_bins() {
        collected.bins += 1;

        let pages = match bin_page_count(fetcher, params, bin).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(range = %bin, error = %e, "Skipping range, could not read result count");
                collected.bins_skipped += 1;
                pacing.pause().await;
                continue;
            }
        };
        debug!(range = %bin, width = bin.width(), pages, "Result pages in range");
        pacing.pause().await;

        for page in 1..=pages {
            let url = params.page_url(bin, page);
            match fetcher.fetch(&url).await {
                Ok(html) => {
                    let links = extract_listing_links(&html, &params.origin);
                    info!(range = %bin, page, count = links.len(), "Collected links");
                    collected.urls.extend(links);
                    collected.pages_fetched += 1;
                }
                Err(e) => {
                    error!(range = %bin, page, error = %e, "Failed to collect links from page");
                    collected.pages_failed += 1;
                }
            }
            pacing.pause().await;
        }
    }

    info!(
        bins = collected.bins,
        bins_skipped = collected.bins_skipped,
        pages = collected.pages_fetched,
        pages_failed = collected.pages_failed,
        links = collected.urls.len(),
        "Link collection finished"
    );
    collected
}

/// Query the first page of a bin and turn its result total into a page
/// count. An unreadable summary counts as zero pages.
async fn bin_page_count(
    fetcher: &dyn Fetcher,
    params: &SearchParams,
    bin: AreaBin,
) -> Result<u32, FetchError> {
    let url = params.bin_url(bin);
    let html = fetcher.fetch(&url).await?;

    match parse_total_results(&html) {
        Some(total) => Ok(params.page_count(total)),
        None => {
            warn!(url = %url, "Could not find total results in pagination text");
            Ok(0)
        }
    }
}

/// Total hit count from the pagination summary (`"... av <N>"`).
pub fn parse_total_results(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let pagination = document.select(&PAGINATION).next()?;
    // Nodes are joined with a newline so adjacent page links never run into
    // the total; thousands separators are spaces inside a single node.
    let text = pagination.text().collect::<Vec<_>>().join("\n");

    let digits: String = TOTAL_RE
        .captures(&text)?
        .get(1)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Absolute listing URLs from a search result page.
pub fn extract_listing_links(html: &str, origin: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| format!("{}{}", origin, href))
        .collect()
}
