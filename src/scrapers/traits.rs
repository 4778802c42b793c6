use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Page download capability shared by the link collector and the fetch loop.
/// Kept behind a trait so crawls can run against canned pages in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the markup behind `url`. Any transport failure or non-success
    /// status is an error the caller treats as a skippable miss.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
