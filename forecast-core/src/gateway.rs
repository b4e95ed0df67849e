use crate::model::{CurrentConditions, ForecastDocument, Location, Units};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod accuweather;

pub use accuweather::AccuWeatherGateway;

/// Longest slice of a response body kept in an error.
pub const MAX_EXCERPT_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No API key is configured; raised before any request is sent.
    #[error(
        "Missing AccuWeather API key.\n\
         Hint: run `forecast configure` or set ACCUWEATHER_API_KEY."
    )]
    Configuration,

    /// Non-2xx answer, timeout, transport failure or undecodable body.
    #[error("{}", describe_remote(.status, .excerpt))]
    RemoteService { status: Option<u16>, excerpt: String },
}

impl GatewayError {
    pub fn remote(status: Option<u16>, body: &str) -> Self {
        GatewayError::RemoteService {
            status,
            excerpt: truncate_body(body),
        }
    }

    /// The request URL carries the API key, so it is stripped from the text.
    pub fn transport(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        Self::remote(status, &err.without_url().to_string())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, GatewayError::Configuration)
    }
}

fn describe_remote(status: &Option<u16>, excerpt: &str) -> String {
    match status {
        Some(code) => format!("AccuWeather API error: {code} {excerpt}"),
        None => format!("AccuWeather request failed: {excerpt}"),
    }
}

/// First [`MAX_EXCERPT_CHARS`] characters of `body`, with `...` when cut.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Remote weather provider.
#[async_trait]
pub trait WeatherGateway: Send + Sync + Debug {
    async fn search_by_text(&self, query: &str) -> Result<Vec<Location>, GatewayError>;

    async fn search_by_postal(&self, code: &str) -> Result<Vec<Location>, GatewayError>;

    async fn search_by_geo(&self, lat: f64, lon: f64) -> Result<Option<Location>, GatewayError>;

    async fn current_conditions(
        &self,
        location_key: &str,
    ) -> Result<Option<CurrentConditions>, GatewayError>;

    async fn forecast(
        &self,
        location_key: &str,
        units: Units,
    ) -> Result<ForecastDocument, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::API_KEY_ENV;

    #[test]
    fn short_body_is_kept_whole() {
        assert_eq!(truncate_body("Unauthorized"), "Unauthorized");
    }

    #[test]
    fn long_body_is_cut_at_200_chars() {
        let body = "x".repeat(500);
        let excerpt = truncate_body(&body);
        assert_eq!(excerpt.len(), MAX_EXCERPT_CHARS + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn multibyte_body_is_cut_on_char_boundary() {
        let body = "é".repeat(300);
        let excerpt = truncate_body(&body);
        assert_eq!(excerpt.chars().count(), MAX_EXCERPT_CHARS + 3);
    }

    #[test]
    fn remote_error_mentions_status_and_excerpt() {
        let err = GatewayError::remote(Some(401), "Api Authorization failed");
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Api Authorization failed"));
    }

    #[test]
    fn configuration_error_has_hint() {
        let err = GatewayError::Configuration;
        assert!(err.is_configuration());
        assert!(err.to_string().contains(API_KEY_ENV));
    }
}
