use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

use crate::{
    Config,
    model::{CurrentConditions, ForecastDocument, Location, Units},
};

use super::{GatewayError, WeatherGateway};

pub const DEFAULT_BASE_URL: &str = "https://dataservice.accuweather.com";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct AccuWeatherGateway {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl AccuWeatherGateway {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeout(api_key, base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for AccuWeather")?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Gateway using the configured key and base URL. A missing key is not an
    /// error here; each call reports it instead.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Self::new(config.api_key().map(str::to_owned), base_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::Configuration)?;
        let url = format!("{}{}", self.base_url, path);
        debug!(%path, "AccuWeather request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("apikey", api_key)])
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                warn!(%path, error = %e, "AccuWeather request failed");
                GatewayError::transport(e)
            })?;

        let status = res.status();
        let body = res.text().await.map_err(GatewayError::transport)?;

        if !status.is_success() {
            warn!(%path, status = status.as_u16(), "AccuWeather returned an error status");
            return Err(GatewayError::remote(Some(status.as_u16()), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(%path, error = %e, "Failed to parse AccuWeather response");
            GatewayError::remote(
                Some(status.as_u16()),
                &format!("unexpected response ({e}): {body}"),
            )
        })
    }
}

impl fmt::Debug for AccuWeatherGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccuWeatherGateway")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcLocation {
    key: String,
    localized_name: Option<String>,
    english_name: Option<String>,
    administrative_area: Option<AcNamed>,
    country: Option<AcNamed>,
    geo_position: Option<AcGeoPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcNamed {
    localized_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcGeoPosition {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<AcLocation> for Location {
    fn from(raw: AcLocation) -> Self {
        let named = |n: Option<AcNamed>| n.and_then(|n| n.localized_name).unwrap_or_default();
        let (latitude, longitude) = raw
            .geo_position
            .map(|g| (g.latitude, g.longitude))
            .unwrap_or((None, None));

        Location {
            key: raw.key,
            name: raw.localized_name.or(raw.english_name).unwrap_or_default(),
            admin_area: named(raw.administrative_area),
            country: named(raw.country),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcMeasure {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcUnitValues {
    metric: Option<AcMeasure>,
}

impl AcUnitValues {
    fn metric_value(self) -> Option<f64> {
        self.metric.and_then(|m| m.value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcWind {
    speed: Option<AcUnitValues>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcCurrentConditions {
    weather_icon: Option<u8>,
    weather_text: Option<String>,
    temperature: Option<AcUnitValues>,
    real_feel_temperature: Option<AcUnitValues>,
    relative_humidity: Option<u8>,
    wind: Option<AcWind>,
    #[serde(rename = "UVIndex")]
    uv_index: Option<u8>,
}

impl From<AcCurrentConditions> for CurrentConditions {
    fn from(raw: AcCurrentConditions) -> Self {
        CurrentConditions {
            icon: raw.weather_icon.unwrap_or(1),
            description: raw.weather_text.unwrap_or_default(),
            temperature_c: raw.temperature.and_then(AcUnitValues::metric_value),
            feels_like_c: raw.real_feel_temperature.and_then(AcUnitValues::metric_value),
            humidity_pct: raw.relative_humidity,
            wind_speed_kmh: raw
                .wind
                .and_then(|w| w.speed)
                .and_then(AcUnitValues::metric_value),
            uv_index: raw.uv_index,
        }
    }
}

fn details() -> (&'static str, String) {
    ("details", "true".to_string())
}

#[async_trait]
impl WeatherGateway for AccuWeatherGateway {
    async fn search_by_text(&self, query: &str) -> Result<Vec<Location>, GatewayError> {
        let raw: Vec<AcLocation> = self
            .get(
                "/locations/v1/cities/search",
                &[("q", query.to_string()), details()],
            )
            .await?;
        Ok(raw.into_iter().map(Location::from).collect())
    }

    async fn search_by_postal(&self, code: &str) -> Result<Vec<Location>, GatewayError> {
        let raw: Vec<AcLocation> = self
            .get(
                "/locations/v1/postalcodes/search",
                &[("q", code.to_string()), details()],
            )
            .await?;
        Ok(raw.into_iter().map(Location::from).collect())
    }

    async fn search_by_geo(&self, lat: f64, lon: f64) -> Result<Option<Location>, GatewayError> {
        let raw: Option<AcLocation> = self
            .get(
                "/locations/v1/cities/geoposition/search",
                &[("q", format!("{lat},{lon}")), details()],
            )
            .await?;
        Ok(raw.map(Location::from))
    }

    async fn current_conditions(
        &self,
        location_key: &str,
    ) -> Result<Option<CurrentConditions>, GatewayError> {
        let raw: Vec<AcCurrentConditions> = self
            .get(&format!("/currentconditions/v1/{location_key}"), &[details()])
            .await?;
        Ok(raw.into_iter().next().map(CurrentConditions::from))
    }

    async fn forecast(
        &self,
        location_key: &str,
        units: Units,
    ) -> Result<ForecastDocument, GatewayError> {
        let raw: Value = self
            .get(
                &format!("/forecasts/v1/daily/5day/{location_key}"),
                &[("metric", units.is_metric().to_string())],
            )
            .await?;
        Ok(ForecastDocument::new(raw))
    }
}
