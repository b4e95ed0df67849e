use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Field of the provider forecast document holding the day sequence.
pub const DAILY_FORECASTS: &str = "DailyForecasts";

/// A place resolved by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Opaque provider key used for conditions and forecast lookups.
    pub key: String,
    pub name: String,
    pub admin_area: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    /// Label stored alongside a snapshot, e.g. `Seattle - Washington, United States`.
    pub fn snapshot_label(&self) -> String {
        format!("{} - {}, {}", self.name, self.admin_area, self.country)
    }

    /// Label shown when the user has to pick among several matches.
    pub fn choice_label(&self) -> String {
        format!(
            "{}, {}, {}  ·  Key: {}",
            self.name, self.admin_area, self.country, self.key
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.name, self.admin_area, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub icon: u8,
    pub description: String,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub wind_speed_kmh: Option<f64>,
    pub uv_index: Option<u8>,
}

/// The only unit system snapshots are recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, Units::Metric)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric."
            )),
        }
    }
}

/// One day of a 5-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub min_c: Option<f64>,
    pub max_c: Option<f64>,
    pub day_icon: u8,
    pub night_icon: u8,
    pub day_phrase: String,
    pub night_phrase: String,
}

impl ForecastDay {
    /// Build a typed view over one raw `DailyForecasts` element.
    pub fn from_entry(entry: &Value) -> Option<Self> {
        let raw: AcDailyForecast = serde_json::from_value(entry.clone()).ok()?;
        let date = parse_day_date(raw.date.as_deref()?)?;

        let (min_c, max_c) = raw
            .temperature
            .map(|t| (t.minimum.and_then(|v| v.value), t.maximum.and_then(|v| v.value)))
            .unwrap_or((None, None));
        let day = raw.day.unwrap_or_default();
        let night = raw.night.unwrap_or_default();

        Some(Self {
            date,
            min_c,
            max_c,
            day_icon: day.icon.unwrap_or(1),
            night_icon: night.icon.unwrap_or(33),
            day_phrase: day.icon_phrase.unwrap_or_default(),
            night_phrase: night.icon_phrase.unwrap_or_default(),
        })
    }
}

/// Raw forecast payload exactly as the provider returned it.
///
/// Only `DailyForecasts` is ever rewritten (by narrowing); every other field
/// is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastDocument(Value);

impl ForecastDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// `{}`; what a corrupt stored payload reads back as.
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Raw day entries, or an empty slice when the document has none.
    pub fn daily_entries(&self) -> &[Value] {
        self.0
            .get(DAILY_FORECASTS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Typed days, skipping entries without a readable date.
    pub fn days(&self) -> Vec<ForecastDay> {
        self.daily_entries().iter().filter_map(ForecastDay::from_entry).collect()
    }

    pub fn headline(&self) -> Option<&str> {
        self.0.get("Headline")?.get("Text")?.as_str()
    }

    pub fn to_json_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn from_json_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text).map(Self)
    }
}

impl From<Value> for ForecastDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Calendar date of a provider timestamp such as `2024-06-01T07:00:00-04:00`.
///
/// The date is taken in the offset the timestamp carries, not converted to UTC.
pub fn parse_day_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcDailyForecast {
    date: Option<String>,
    temperature: Option<AcTemperatureRange>,
    day: Option<AcHalfDay>,
    night: Option<AcHalfDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcTemperatureRange {
    minimum: Option<AcValue>,
    maximum: Option<AcValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcValue {
    value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AcHalfDay {
    icon: Option<u8>,
    icon_phrase: Option<String>,
}
