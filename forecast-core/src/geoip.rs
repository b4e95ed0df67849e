//! Approximate caller location from the public IP address.
//! Uses ipinfo.io - free, no API key required.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const IPINFO_URL: &str = "https://ipinfo.io/json";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CallerLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeoIpLocator {
    url: String,
    timeout: Duration,
}

impl Default for GeoIpLocator {
    fn default() -> Self {
        Self::new(IPINFO_URL)
    }
}

impl GeoIpLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Best-effort lookup. Returns `None` on any failure; the caller should
    /// fall back to asking the user for a place.
    pub async fn locate(&self) -> Option<CallerLocation> {
        let client = match Client::builder().timeout(self.timeout).build() {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to create GeoIP client: {}", e);
                return None;
            }
        };

        let response = match client.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("GeoIP request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("GeoIP lookup returned status {}", response.status());
            return None;
        }

        let body: IpInfoResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                debug!("GeoIP parse error: {}", e);
                return None;
            }
        };

        let (latitude, longitude) = parse_loc(body.loc.as_deref()?)?;

        info!(
            "Approximate location from IP: {:?}, {:?} ({:?})",
            body.city,
            body.region,
            body.country
        );
        Some(CallerLocation {
            latitude,
            longitude,
            city: body.city,
            region: body.region,
            country: body.country,
        })
    }
}

/// Parse ipinfo's `"lat,lon"` field.
fn parse_loc(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loc_field() {
        assert_eq!(parse_loc("47.6062,-122.3321"), Some((47.6062, -122.3321)));
        assert_eq!(parse_loc(" 1.5 , 2.5 "), Some((1.5, 2.5)));
    }

    #[test]
    fn rejects_malformed_loc() {
        assert_eq!(parse_loc("47.6062"), None);
        assert_eq!(parse_loc("north,south"), None);
        assert_eq!(parse_loc(""), None);
    }

    #[tokio::test]
    async fn unreachable_service_yields_none() {
        let locator = GeoIpLocator::new("http://127.0.0.1:9/json")
            .with_timeout(Duration::from_millis(500));
        assert_eq!(locator.locate().await, None);
    }
}
