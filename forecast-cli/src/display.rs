use forecast_core::{
    CurrentConditions, ForecastDay, Location, SnapshotSummary, export::ExportRow,
};

const DASH: &str = "—";

/// Emoji for an AccuWeather icon code.
pub fn icon_emoji(icon: u8) -> &'static str {
    match icon {
        1 => "☀️",
        2 | 34 => "🌤️",
        3 => "⛅",
        4 => "🌥️",
        5..=8 | 36..=38 => "☁️",
        11 => "🌫️",
        12 | 18..=22 | 39 | 40 => "🌧️",
        13 | 14 => "🌦️",
        15..=17 | 41 | 42 => "⛈️",
        23 => "❄️",
        24..=26 | 43 | 44 => "🌨️",
        29 => "🌧️❄️",
        30 | 31 => "🥶",
        32 => "💨",
        33 => "🌙",
        35 => "🌙⛅",
        _ => "🌡️",
    }
}

pub fn temp(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}°C")).unwrap_or_else(|| DASH.to_string())
}

fn or_dash<T: std::fmt::Display>(value: Option<T>, suffix: &str) -> String {
    value
        .map(|v| format!("{v}{suffix}"))
        .unwrap_or_else(|| DASH.to_string())
}

pub fn location_header(location: &Location) -> String {
    format!(
        "{}\n{}, {}\nLocation Key: {}",
        location.name, location.admin_area, location.country, location.key
    )
}

pub fn current_conditions(cc: &CurrentConditions) -> String {
    let mut lines = vec![format!("{}  {}", icon_emoji(cc.icon), temp(cc.temperature_c))];
    if !cc.description.is_empty() {
        lines.push(cc.description.clone());
    }
    lines.push(format!("RealFeel®: {}", temp(cc.feels_like_c)));
    lines.push(format!("Humidity:  {}", or_dash(cc.humidity_pct, "%")));
    lines.push(format!("Wind:      {}", or_dash(cc.wind_speed_kmh, " km/h")));
    lines.push(format!("UV Index:  {}", or_dash(cc.uv_index, "")));
    lines.join("\n")
}

pub fn forecast_day(day: &ForecastDay) -> String {
    format!(
        "{}\n  {}  Day: {}\n  {}  Night: {}\n  Min/Max: {} / {}",
        day.date.format("%a, %b %d"),
        icon_emoji(day.day_icon),
        day.day_phrase,
        icon_emoji(day.night_icon),
        day.night_phrase,
        temp(day.min_c),
        temp(day.max_c),
    )
}

pub fn summary_line(summary: &SnapshotSummary) -> String {
    format!(
        "#{} — {} [{} → {}] ({})",
        summary.id, summary.label, summary.start, summary.end, summary.units
    )
}

/// Plain-text table of exported rows.
pub fn table(rows: &[ExportRow]) -> String {
    let header = forecast_core::export::COLUMNS;
    let cells: Vec<[String; 5]> = rows.iter().map(ExportRow::cells).collect();

    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |values: &[String]| {
        values
            .iter()
            .zip(widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(&header.map(str::to_string))];
    lines.extend(cells.iter().map(|row| render(row)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use forecast_core::Units;

    #[test]
    fn known_and_unknown_icons() {
        assert_eq!(icon_emoji(1), "☀️");
        assert_eq!(icon_emoji(33), "🌙");
        assert_eq!(icon_emoji(9), "🌡️");
        assert_eq!(icon_emoji(0), "🌡️");
    }

    #[test]
    fn temperatures_are_rounded() {
        assert_eq!(temp(Some(17.6)), "18°C");
        assert_eq!(temp(None), "—");
    }

    #[test]
    fn summary_line_format() {
        let summary = SnapshotSummary {
            id: 3,
            label: "Seattle - Washington, United States".into(),
            start: NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"),
            end: NaiveDate::from_ymd_opt(2024, 6, 5).expect("date"),
            units: Units::Metric,
        };
        assert_eq!(
            summary_line(&summary),
            "#3 — Seattle - Washington, United States [2024-06-01 → 2024-06-05] (metric)"
        );
    }

    #[test]
    fn conditions_show_dashes_for_missing_values() {
        let cc = CurrentConditions {
            icon: 1,
            description: String::new(),
            temperature_c: Some(20.0),
            feels_like_c: None,
            humidity_pct: None,
            wind_speed_kmh: Some(12.5),
            uv_index: None,
        };
        let text = current_conditions(&cc);
        assert!(text.contains("RealFeel®: —"));
        assert!(text.contains("Wind:      12.5 km/h"));
        assert!(text.contains("UV Index:  —"));
    }

    #[test]
    fn table_aligns_columns() {
        let rows = vec![ExportRow {
            date: "Mon, Jan 02".into(),
            min: Some(3.0),
            max: Some(8.5),
            day: Some("Rain".into()),
            night: Some("Showers".into()),
        }];
        let text = table(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date         min  max  day   night");
        assert_eq!(lines[1], "Mon, Jan 02  3.0  8.5  Rain  Showers");
    }
}
