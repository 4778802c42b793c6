pub mod browser;
pub mod fetch_loop;
pub mod hemnet;
pub mod http;
pub mod listing;
pub mod traits;
pub mod types;

pub use browser::BrowserCoordinateExtractor;
pub use fetch_loop::fetch_uncached;
pub use hemnet::collect_links;
pub use http::HttpFetcher;
