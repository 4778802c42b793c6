//! Coordinate enrichment for scraped listings.
//!
//! Lookups are keyed by listing title and persisted in a [`GeocodeCache`],
//! so each address is resolved at most once across runs.

use crate::config::GeocodeSettings;
use crate::models::{GeoPoint, RawRecord};
use crate::storage::GeocodeCache;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder answered HTTP {0}")]
    Status(u16),
    #[error("malformed coordinate {0:?}")]
    Malformed(String),
    #[error("browser error: {0}")]
    Browser(String),
}

/// Resolves a listing to coordinates. `Ok(None)` means the source answered
/// but knows no location, which is cached just like a hit.
#[async_trait]
pub trait CoordinateSource: Send + Sync {
    async fn locate(&self, record: &RawRecord) -> Result<Option<GeoPoint>, GeocodeError>;
}

/// OpenStreetMap Nominatim search
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    query_suffix: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocodeSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .context("Failed to create geocoding client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            query_suffix: settings.query_suffix.clone(),
        })
    }

    pub fn query(&self, title: &str) -> String {
        format!("{}, {}", title, self.query_suffix)
    }
}

fn first_place(places: &[Place]) -> Result<Option<GeoPoint>, GeocodeError> {
    let Some(place) = places.first() else {
        return Ok(None);
    };
    let parse = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::Malformed(raw.to_string()))
    };
    Ok(Some(GeoPoint {
        lat: parse(&place.lat)?,
        lon: parse(&place.lon)?,
    }))
}

#[async_trait]
impl CoordinateSource for NominatimGeocoder {
    async fn locate(&self, record: &RawRecord) -> Result<Option<GeoPoint>, GeocodeError> {
        let Some(title) = record.title() else {
            return Ok(None);
        };
        let query = self.query(title);
        debug!(query = %query, "Geocoding");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<Place> = response.json().await?;
        first_place(&places)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GeocodeSummary {
    pub found: usize,
    pub not_found: usize,
    pub cached: usize,
    pub failed: usize,
    pub deferred: usize,
    pub untitled: usize,
}

/// Look up every distinct title not in `cache`, saving after each result.
///
/// A source error is retried up to `max_retries` times with `error_wait`
/// between attempts. Titles that still fail are left out of the cache.
pub async fn enrich_coordinates(
    source: &dyn CoordinateSource,
    records: &[RawRecord],
    cache: &mut GeocodeCache,
    settings: &GeocodeSettings,
    limit: Option<usize>,
) -> Result<GeocodeSummary> {
    let mut summary = GeocodeSummary::default();
    let mut seen = HashSet::new();
    let pacing = settings.min_delay();
    let mut attempts = 0usize;

    for record in records {
        let Some(title) = record.title() else {
            summary.untitled += 1;
            continue;
        };
        if !seen.insert(title) {
            continue;
        }
        if cache.contains(title) {
            summary.cached += 1;
            continue;
        }
        if limit.is_some_and(|max| attempts >= max) {
            summary.deferred += 1;
            continue;
        }
        attempts += 1;

        match locate_with_retry(source, record, settings).await {
            Some(point) => {
                match point {
                    Some(p) => {
                        info!(title, lat = p.lat, lon = p.lon, "Geocoded");
                        summary.found += 1;
                    }
                    None => {
                        info!(title, "No location found");
                        summary.not_found += 1;
                    }
                }
                cache.insert(title, point);
                cache.save().await?;
            }
            None => summary.failed += 1,
        }

        pacing.pause().await;
    }

    info!(
        found = summary.found,
        not_found = summary.not_found,
        cached = summary.cached,
        failed = summary.failed,
        deferred = summary.deferred,
        "Geocoding finished"
    );
    Ok(summary)
}

/// `None` when every attempt errored.
async fn locate_with_retry(
    source: &dyn CoordinateSource,
    record: &RawRecord,
    settings: &GeocodeSettings,
) -> Option<Option<GeoPoint>> {
    for attempt in 0..=settings.max_retries {
        match source.locate(record).await {
            Ok(point) => return Some(point),
            Err(e) => {
                warn!(url = %record.url, attempt, error = %e, "Coordinate lookup failed");
                if attempt < settings.max_retries {
                    tokio::time::sleep(settings.error_wait()).await;
                }
            }
        }
    }
    None
}
