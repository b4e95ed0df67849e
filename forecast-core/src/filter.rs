use chrono::NaiveDate;
use serde_json::Value;

use crate::model::{DAILY_FORECASTS, ForecastDocument, parse_day_date};

/// Keep only the days dated within `start..=end`.
///
/// Bounds that are not `YYYY-MM-DD` dates leave the document untouched:
/// showing unfiltered data beats silently dropping it.
pub fn narrow(document: &ForecastDocument, start: &str, end: &str) -> ForecastDocument {
    let (Ok(start), Ok(end)) = (
        NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d"),
        NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d"),
    ) else {
        return document.clone();
    };
    narrow_dates(document, start, end)
}

/// Typed form of [`narrow`]. Entries without a readable `Date` are dropped;
/// all other top-level fields are copied as-is.
pub fn narrow_dates(
    document: &ForecastDocument,
    start: NaiveDate,
    end: NaiveDate,
) -> ForecastDocument {
    let Value::Object(fields) = document.as_value() else {
        return document.clone();
    };

    let kept: Vec<Value> = document
        .daily_entries()
        .iter()
        .filter(|entry| {
            entry
                .get("Date")
                .and_then(Value::as_str)
                .and_then(parse_day_date)
                .is_some_and(|date| start <= date && date <= end)
        })
        .cloned()
        .collect();

    let mut fields = fields.clone();
    fields.insert(DAILY_FORECASTS.to_string(), Value::Array(kept));
    ForecastDocument::new(Value::Object(fields))
}
