use crate::pacing::Pacing;
use crate::scrapers::types::SearchParams;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run configuration: defaults, then an optional TOML file, then `HEMNET_*`
/// environment variables (`HEMNET_SEARCH__MIN_AREA=40`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchParams,
    pub http: HttpSettings,
    pub pacing: PacingSettings,
    pub paths: PathSettings,
    pub geocode: GeocodeSettings,
    pub browser: BrowserSettings,
}

impl Settings {
    pub fn load(file: &Path) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix("HEMNET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Between search result pages
    pub links: Pacing,
    /// Between listing pages
    pub listings: Pacing,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            links: Pacing::new(1_000, 2_000),
            listings: Pacing::new(5_000, 5_000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: PathBuf,
    pub links_file: String,
    pub cache_file: String,
    pub geocode_cache_file: String,
    pub dataset_stem: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("output"),
            links_file: "hemnet_links_total.json".to_string(),
            cache_file: "hemnet_properties_cache.json".to_string(),
            geocode_cache_file: "address_cache.json".to_string(),
            dataset_stem: "hemnet_properties_transformed".to_string(),
        }
    }
}

impl PathSettings {
    pub fn links(&self) -> PathBuf {
        self.data_dir.join(&self.links_file)
    }

    pub fn cache(&self) -> PathBuf {
        self.data_dir.join(&self.cache_file)
    }

    pub fn geocode_cache(&self) -> PathBuf {
        self.data_dir.join(&self.geocode_cache_file)
    }

    /// Output path for the records added by one scrape run.
    pub fn snapshot(&self, date: chrono::NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("hemnet_properties_{}.json", date.format("%Y-%m-%d")))
    }

    pub fn dataset(&self, extension: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", self.dataset_stem, extension))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodeSettings {
    pub endpoint: String,
    pub user_agent: String,
    /// Appended to the listing title to form the address query
    pub query_suffix: String,
    pub min_delay_secs: u64,
    pub error_wait_secs: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for GeocodeSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            query_suffix: "Malmö, Sweden".to_string(),
            min_delay_secs: 5,
            error_wait_secs: 10,
            max_retries: 2,
            timeout_secs: 10,
        }
    }
}

impl GeocodeSettings {
    pub fn min_delay(&self) -> Pacing {
        Pacing::new(self.min_delay_secs * 1_000, 0)
    }

    pub fn error_wait(&self) -> Duration {
        Duration::from_secs(self.error_wait_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// How long to watch network traffic for the map request
    pub load_window_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            load_window_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(settings.search.page_size, 50);
        assert_eq!(settings.search.wide_threshold, 160);
        assert_eq!(settings.paths.cache(), PathBuf::from("output/hemnet_properties_cache.json"));
    }

    #[test]
    fn file_overrides_selected_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hemnet.toml");
        std::fs::write(
            &path,
            "[search]\nmin_area = 40\nwide_threshold = 120\n\n[pacing.listings]\nmin_ms = 100\njitter_ms = 0\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.search.min_area, 40);
        assert_eq!(settings.search.wide_threshold, 120);
        assert_eq!(settings.search.max_area, 250);
        assert_eq!(settings.pacing.listings, Pacing::new(100, 0));
        assert_eq!(settings.pacing.links, Pacing::new(1_000, 2_000));
    }
}
