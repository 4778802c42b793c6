mod config;
mod geocode;
mod models;
mod pacing;
mod scrapers;
mod storage;
mod transform;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Settings;
use geocode::{CoordinateSource, NominatimGeocoder};
use scrapers::{BrowserCoordinateExtractor, HttpFetcher};
use std::path::PathBuf;
use storage::{dataset, GeocodeCache, LinkStore, RecordCache};
use tracing::{info, warn};
use transform::Pipeline;

#[derive(Parser)]
#[command(name = "hemnet-sold", about = "Scraper and dataset builder for Hemnet sold listings")]
struct Cli {
    /// TOML settings file; missing file means defaults
    #[arg(short, long, default_value = "hemnet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the search results range by range and update the link store
    Links,
    /// Fetch every stored link that is not cached yet
    Scrape {
        /// Max listings to fetch (default: all uncached)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Build the clean dataset from the raw cache
    Transform,
    /// Look up coordinates for cached listings
    Geocode {
        /// Max addresses to look up
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Read coordinates from the listing's map instead of Nominatim
        #[arg(long)]
        browser: bool,
    },
    /// links, scrape and transform in one go
    Run {
        /// Max listings to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    match cli.command {
        Commands::Links => links(&settings).await,
        Commands::Scrape { limit } => scrape(&settings, limit).await,
        Commands::Transform => transform(&settings).await,
        Commands::Geocode { limit, browser } => geocode(&settings, limit, browser).await,
        Commands::Run { limit } => {
            links(&settings).await?;
            scrape(&settings, limit).await?;
            transform(&settings).await
        }
    }
}

async fn links(settings: &Settings) -> Result<()> {
    let fetcher = HttpFetcher::new(&settings.http)?;
    let collected =
        scrapers::collect_links(&fetcher, &settings.search, settings.pacing.links).await;

    let mut store = LinkStore::load(settings.paths.links()).await?;
    let new = store.merge(collected.urls);
    store.save().await?;

    info!(new, total = store.len(), "Link store updated");
    Ok(())
}

async fn scrape(settings: &Settings, limit: Option<usize>) -> Result<()> {
    let store = LinkStore::load(settings.paths.links()).await?;
    if store.is_empty() {
        warn!("No stored links, run `links` first");
    }
    let mut cache = RecordCache::load(settings.paths.cache()).await?;
    info!(
        links = store.len(),
        cached = cache.len(),
        cache = %cache.path().display(),
        "Starting scrape"
    );

    let fetcher = HttpFetcher::new(&settings.http)?;
    let (summary, added) = scrapers::fetch_uncached(
        &fetcher,
        &mut cache,
        store.urls(),
        settings.pacing.listings,
        limit,
    )
    .await?;

    if !added.is_empty() {
        let snapshot = settings
            .paths
            .snapshot(chrono::Local::now().date_naive());
        storage::write_json(&snapshot, &added).await?;
        info!(path = %snapshot.display(), records = added.len(), "Wrote snapshot");
    }

    info!(
        fetched = summary.fetched,
        failed = summary.failed,
        total = cache.len(),
        "Scrape finished"
    );
    Ok(())
}

async fn transform(settings: &Settings) -> Result<()> {
    let cache = RecordCache::load(settings.paths.cache()).await?;
    let geocodes = GeocodeCache::load(settings.paths.geocode_cache()).await?;
    if cache.is_empty() {
        warn!(cache = %cache.path().display(), "Raw cache is empty, writing an empty dataset");
    }

    let (clean, report) = Pipeline::standard().run_all(cache.records(), Some(&geocodes));
    report.log();

    let json = settings.paths.dataset("json");
    let csv = settings.paths.dataset("csv");
    dataset::write_json(&json, &clean).await?;
    dataset::write_csv(&csv, &clean).await?;

    info!(
        rows = clean.len(),
        json = %json.display(),
        csv = %csv.display(),
        "Wrote clean dataset"
    );
    Ok(())
}

async fn geocode(settings: &Settings, limit: Option<usize>, browser: bool) -> Result<()> {
    let cache = RecordCache::load(settings.paths.cache()).await?;
    let mut geocodes = GeocodeCache::load(settings.paths.geocode_cache()).await?;

    let source: Box<dyn CoordinateSource> = if browser {
        Box::new(BrowserCoordinateExtractor::new(&settings.browser)?)
    } else {
        Box::new(NominatimGeocoder::new(&settings.geocode)?)
    };

    geocode::enrich_coordinates(
        source.as_ref(),
        cache.records(),
        &mut geocodes,
        &settings.geocode,
        limit,
    )
    .await?;

    info!(entries = geocodes.len(), "Geocode cache updated");
    Ok(())
}
