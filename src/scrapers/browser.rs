use crate::config::BrowserSettings;
use crate::geocode::{CoordinateSource, GeocodeError};
use crate::models::{GeoPoint, RawRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::{RequestPausedDecision, Tab};
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::{Browser, LaunchOptions};
use regex::Regex;
use std::sync::{Arc, LazyLock, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// Shapes the embedded map uses to carry the listing position, tried in order.
static COORDINATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\[null,\s*(-?\d+\.\d+),\s*(-?\d+\.\d+)",
        r#""lat\w*":\s*(-?\d+\.\d+).*?"lng\w*":\s*(-?\d+\.\d+)"#,
        r#""latitude":\s*(-?\d+\.\d+).*?"longitude":\s*(-?\d+\.\d+)"#,
        r"q=(-?\d+\.\d+),(-?\d+\.\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const ACCEPT_COOKIES: &str = r#"
    const button = document.querySelector('#onetrust-accept-btn-handler, button[id*="accept"]');
    if (button) button.click();
"#;

/// Only map-service traffic carries the listing position.
pub fn is_map_request(url: &str) -> bool {
    url.contains("google") && url.contains("maps")
}

/// Pull a latitude/longitude pair out of a map request payload.
pub fn coordinates_from_payload(payload: &str) -> Option<GeoPoint> {
    COORDINATE_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(payload)?;
        let lat = caps.get(1)?.as_str().parse().ok()?;
        let lon = caps.get(2)?.as_str().parse().ok()?;
        Some(GeoPoint { lat, lon })
    })
}

/// Opens a listing page in headless Chrome and watches its outgoing map
/// requests for the coordinates the page plots.
pub struct BrowserCoordinateExtractor {
    browser: Browser,
    load_window: Duration,
}

impl BrowserCoordinateExtractor {
    pub fn new(settings: &BrowserSettings) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            load_window: Duration::from_secs(settings.load_window_secs),
        })
    }

    fn watch_listing(browser: &Browser, url: &str, window: Duration) -> Result<Option<GeoPoint>> {
        let tab = browser.new_tab().context("Failed to open tab")?;
        close_after(
            || Self::watch_tab(&tab, url, window),
            || {
                if let Err(e) = tab.close(true) {
                    debug!(url, error = %e, "Failed to close tab");
                }
            },
        )
    }

    fn watch_tab(tab: &Tab, url: &str, window: Duration) -> Result<Option<GeoPoint>> {
        let found: Arc<Mutex<Option<GeoPoint>>> = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&found);
        tab.enable_fetch(None, None)?;
        tab.enable_request_interception(Arc::new(
            move |_transport: Arc<Transport>, _session: SessionId, event: RequestPausedEvent| {
                let request = &event.params.request;
                if is_map_request(&request.url) {
                    let point = request
                        .post_data
                        .as_deref()
                        .and_then(coordinates_from_payload)
                        .or_else(|| coordinates_from_payload(&request.url));
                    if let (Some(point), Ok(mut slot)) = (point, sink.lock()) {
                        slot.get_or_insert(point);
                    }
                }
                RequestPausedDecision::Continue(None)
            },
        ))?;

        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;
        let _ = tab.evaluate(ACCEPT_COOKIES, false);

        let started = Instant::now();
        loop {
            let current = found.lock().ok().and_then(|slot| *slot);
            if current.is_some() || started.elapsed() >= window {
                return Ok(current);
            }
            thread::sleep(Duration::from_millis(250));
        }
    }
}

/// Run `work`, then `close`, whatever `work` returned.
fn close_after<T>(work: impl FnOnce() -> Result<T>, close: impl FnOnce()) -> Result<T> {
    let result = work();
    close();
    result
}

#[async_trait]
impl CoordinateSource for BrowserCoordinateExtractor {
    async fn locate(&self, record: &RawRecord) -> Result<Option<GeoPoint>, GeocodeError> {
        let browser = self.browser.clone();
        let url = record.url.clone();
        let window = self.load_window;
        debug!(url = %url, "Watching map requests");

        tokio::task::spawn_blocking(move || Self::watch_listing(&browser, &url, window))
            .await
            .map_err(|e| GeocodeError::Browser(e.to_string()))?
            .map_err(|e| GeocodeError::Browser(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_map_traffic_is_inspected() {
        assert!(is_map_request("https://www.google.com/maps/api/js/ViewportInfoService"));
        assert!(is_map_request("https://maps.googleapis.com/maps/vt?pb=1"));
        assert!(!is_map_request("https://www.hemnet.se/graphql"));
    }

    #[test]
    fn protobuf_style_payload() {
        let payload = r#"[[["a",null],[null,55.6049,13.0038],12]]"#;
        assert_eq!(
            coordinates_from_payload(payload),
            Some(GeoPoint { lat: 55.6049, lon: 13.0038 })
        );
    }

    #[test]
    fn json_payloads() {
        assert_eq!(
            coordinates_from_payload(r#"{"latLng": 55.61, "zoom": 14, "lngLat": 12.99}"#),
            Some(GeoPoint { lat: 55.61, lon: 12.99 })
        );
        assert_eq!(
            coordinates_from_payload(r#"{"latitude": 55.5, "longitude": 13.1}"#),
            Some(GeoPoint { lat: 55.5, lon: 13.1 })
        );
    }

    #[test]
    fn query_string_coordinates() {
        assert_eq!(
            coordinates_from_payload("https://maps.google.com/?q=55.59,13.02&z=15"),
            Some(GeoPoint { lat: 55.59, lon: 13.02 })
        );
    }

    #[test]
    fn tab_is_closed_when_the_visit_fails() {
        let closed = std::cell::Cell::new(false);
        let result: Result<Option<GeoPoint>> =
            close_after(|| Err(anyhow::anyhow!("navigation failed")), || closed.set(true));

        assert!(result.is_err());
        assert!(closed.get());
    }

    #[test]
    fn tab_is_closed_after_a_successful_visit() {
        let closed = std::cell::Cell::new(false);
        let result = close_after(
            || Ok(Some(GeoPoint { lat: 55.6, lon: 13.0 })),
            || closed.set(true),
        );

        assert_eq!(result.unwrap(), Some(GeoPoint { lat: 55.6, lon: 13.0 }));
        assert!(closed.get());
    }

    #[test]
    fn payload_without_coordinates() {
        assert_eq!(coordinates_from_payload(r#"{"zoom": 14}"#), None);
    }
}
