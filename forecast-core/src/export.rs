//! Export a snapshot's days as CSV, JSON, XML or PDF.

use anyhow::{Context, Result, anyhow};
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use serde::Serialize;
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::model::{ForecastDocument, parse_day_date};

pub mod pdf;

/// Column names shared by the tabular exports.
pub const COLUMNS: [&str; 5] = ["date", "min", "max", "day", "night"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
    Xml,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Xml => "application/xml",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub const fn all() -> &'static [ExportFormat] {
        &[
            ExportFormat::Csv,
            ExportFormat::Json,
            ExportFormat::Xml,
            ExportFormat::Pdf,
        ]
    }

    /// Default file name for snapshot `id`, e.g. `weather_request_3.csv`.
    pub fn file_name(&self, id: i64) -> String {
        format!("weather_request_{id}.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(anyhow::anyhow!(
                "Unknown export format '{value}'. Supported formats: csv, json, xml, pdf."
            )),
        }
    }
}

/// One exported day. Field names double as the CSV header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub date: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub day: Option<String>,
    pub night: Option<String>,
}

impl ExportRow {
    pub fn from_entry(entry: &Value) -> Self {
        let text = |pointer: &str| {
            entry
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        let number = |pointer: &str| entry.pointer(pointer).and_then(Value::as_f64);

        ExportRow {
            date: day_label(entry.get("Date").and_then(Value::as_str).unwrap_or_default()),
            min: number("/Temperature/Minimum/Value"),
            max: number("/Temperature/Maximum/Value"),
            day: text("/Day/IconPhrase"),
            night: text("/Night/IconPhrase"),
        }
    }

    /// Cell values in [`COLUMNS`] order; missing values are empty. Whole
    /// numbers keep their decimal point (`8.0`).
    pub fn cells(&self) -> [String; 5] {
        let num = |v: Option<f64>| v.map(|v| format!("{v:?}")).unwrap_or_default();
        [
            self.date.clone(),
            num(self.min),
            num(self.max),
            self.day.clone().unwrap_or_default(),
            self.night.clone().unwrap_or_default(),
        ]
    }
}

/// `Mon, Jan 02` for a provider timestamp; the raw text if it can't be read.
pub fn day_label(raw: &str) -> String {
    parse_day_date(raw)
        .map(|d| d.format("%a, %b %d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub fn rows(document: &ForecastDocument) -> Vec<ExportRow> {
    document.daily_entries().iter().map(ExportRow::from_entry).collect()
}

/// Render `document` in `format`. `title` heads the PDF page.
pub fn render(document: &ForecastDocument, format: ExportFormat, title: &str) -> Result<Vec<u8>> {
    let rows = rows(document);
    let bytes = match format {
        ExportFormat::Csv => to_csv(&rows)?.into_bytes(),
        ExportFormat::Json => to_json(document)?.into_bytes(),
        ExportFormat::Xml => to_xml(&rows)?.into_bytes(),
        ExportFormat::Pdf => pdf::render(title, &pdf::layout(title, &rows))?,
    };
    Ok(bytes)
}

pub fn to_csv(rows: &[ExportRow]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(COLUMNS).context("Failed to write CSV header")?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write CSV row for {}", row.date))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV export: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV export is not valid UTF-8")
}

/// The whole document, 2-space indented.
pub fn to_json(document: &ForecastDocument) -> Result<String> {
    serde_json::to_string_pretty(document.as_value())
        .context("Failed to serialize forecast as JSON")
}

/// `<Forecast>` with one `<Day>` per row and one child per column.
pub fn to_xml(rows: &[ExportRow]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Start(BytesStart::new("Forecast")))?;
    for row in rows {
        writer.write_event(Event::Start(BytesStart::new("Day")))?;
        for (column, value) in COLUMNS.iter().zip(row.cells()) {
            writer.write_event(Event::Start(BytesStart::new(*column)))?;
            writer.write_event(Event::Text(BytesText::new(&value)))?;
            writer.write_event(Event::End(BytesEnd::new(*column)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Day")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Forecast")))?;

    String::from_utf8(writer.into_inner()).context("XML export is not valid UTF-8")
}
