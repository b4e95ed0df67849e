use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use forecast_core::{
    AccuWeatherGateway, Config, ExportFormat, GeoIpLocator, Location, LocationResolver,
    Resolution, SnapshotStore, Units, WeatherGateway, export, lifecycle,
};
use inquire::{Confirm, Password, Select};
use std::path::PathBuf;
use tracing::warn;

use crate::display;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecasts you can keep")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the AccuWeather API key.
    Configure,

    /// Show current conditions and the 5-day forecast for a place.
    Show {
        /// City, landmark, ZIP/postal code or GPS "lat,lon".
        query: Option<String>,

        /// Use the approximate location of this machine's IP address.
        #[arg(long, conflicts_with = "query")]
        here: bool,

        /// Save the forecast as a snapshot.
        #[arg(long)]
        save: bool,

        /// Snapshot start date (YYYY-MM-DD); defaults to today.
        #[arg(long, requires = "save")]
        start: Option<NaiveDate>,

        /// Snapshot end date (YYYY-MM-DD); defaults to today.
        #[arg(long, requires = "save")]
        end: Option<NaiveDate>,
    },

    /// List saved snapshots, newest first.
    List,

    /// Show one saved snapshot.
    View { id: i64 },

    /// Narrow a snapshot's date range.
    Update {
        id: i64,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,
    },

    /// Delete a snapshot.
    Delete {
        id: i64,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Export a snapshot's forecast.
    Export {
        id: i64,

        /// csv, json, xml or pdf.
        #[arg(long, short, default_value = "csv")]
        format: ExportFormat,

        /// Output file; defaults to weather_request_<id>.<ext>.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                query,
                here,
                save,
                start,
                end,
            } => {
                let config = Config::load()?;
                let gateway = AccuWeatherGateway::from_config(&config)?;

                let Some(location) = pick_location(&config, &gateway, query, here).await? else {
                    return Ok(());
                };
                let forecast = show_weather(&gateway, &location).await?;

                if save {
                    let today = Local::now().date_naive();
                    let start = start.unwrap_or(today);
                    let end = end.unwrap_or(today);

                    let store = open_store(&config)?;
                    let id = lifecycle::save_snapshot(&store, &location, start, end, &forecast)?;
                    println!("Saved request #{id} for {}.", location.snapshot_label());
                }
                Ok(())
            }
            Command::List => {
                let store = open_store(&Config::load()?)?;
                let snapshots = store.list()?;
                if snapshots.is_empty() {
                    println!("No saved requests yet.");
                }
                for summary in &snapshots {
                    println!("{}", display::summary_line(summary));
                }
                Ok(())
            }
            Command::View { id } => {
                let store = open_store(&Config::load()?)?;
                let Some(snapshot) = store.get(id)? else {
                    bail!("Snapshot #{id} does not exist.");
                };

                println!("Location: {}", snapshot.label);
                println!("Dates:    {} → {}", snapshot.start, snapshot.end);
                println!("Units:    {}", snapshot.units);

                let rows = export::rows(&snapshot.payload);
                if !rows.is_empty() {
                    println!();
                    println!("{}", display::table(&rows));
                }
                Ok(())
            }
            Command::Update { id, start, end } => {
                let store = open_store(&Config::load()?)?;
                let updated = lifecycle::narrow_snapshot(&store, id, start, end)?;
                println!(
                    "Updated! Kept {} day(s) within {start} → {end}.",
                    updated.payload.daily_entries().len()
                );
                Ok(())
            }
            Command::Delete { id, yes } => {
                let store = open_store(&Config::load()?)?;
                if !yes {
                    let confirmed = Confirm::new(&format!("Delete snapshot #{id}?"))
                        .with_default(false)
                        .prompt()?;
                    if !confirmed {
                        return Ok(());
                    }
                }
                store.delete(id)?;
                println!("Deleted snapshot #{id}.");
                Ok(())
            }
            Command::Export { id, format, output } => {
                let store = open_store(&Config::load()?)?;
                let Some(snapshot) = store.get(id)? else {
                    bail!("Snapshot #{id} does not exist.");
                };
                if snapshot.payload.daily_entries().is_empty() {
                    bail!("Snapshot #{id} has no forecast days to export.");
                }

                let title = format!("Forecast for {}", snapshot.label);
                let bytes = export::render(&snapshot.payload, format, &title)?;
                let path = output.unwrap_or_else(|| PathBuf::from(format.file_name(id)));
                std::fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;

                println!("Wrote {} ({}).", path.display(), format.mime_type());
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let api_key = Password::new("AccuWeather API key:")
        .without_confirmation()
        .prompt()?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty.");
    }

    let mut config = Config::load_file()?;
    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<SnapshotStore> {
    SnapshotStore::open(config.database_path()?)
}

/// Resolve the place to show, asking the user to choose when the search is
/// ambiguous. `None` means there is nothing to show and a hint was printed.
async fn pick_location(
    config: &Config,
    gateway: &dyn WeatherGateway,
    query: Option<String>,
    here: bool,
) -> anyhow::Result<Option<Location>> {
    if here {
        let Some(guess) = GeoIpLocator::default().locate().await else {
            println!("Could not determine your location automatically. Please type a city or ZIP.");
            return Ok(None);
        };
        println!(
            "Using approximate location based on IP: {}, {} ({})",
            guess.city.as_deref().unwrap_or("?"),
            guess.region.as_deref().unwrap_or("?"),
            guess.country.as_deref().unwrap_or("?"),
        );
        let found = gateway.search_by_geo(guess.latitude, guess.longitude).await?;
        if found.is_none() {
            println!("No matches. Try a nearby city or ZIP code.");
        }
        return Ok(found);
    }

    let Some(query) = query else {
        bail!("Give a city, ZIP/postal code or \"lat,lon\" to search for, or use --here.");
    };

    let memo_path = config.location_memo_path()?;
    let mut resolver = LocationResolver::load(&memo_path);
    let resolution = resolver.resolve(gateway, &query).await?;
    if let Err(e) = resolver.save(&memo_path) {
        warn!(error = %e, "Failed to save location memo");
    }

    match resolution {
        Resolution::NoMatch => {
            println!("No matches. Try a nearby city or ZIP code.");
            Ok(None)
        }
        Resolution::Single(location) => Ok(Some(location)),
        Resolution::Multiple(mut candidates) => {
            let labels: Vec<String> = candidates.iter().map(Location::choice_label).collect();
            let picked = Select::new("Did you mean…", labels).raw_prompt()?;
            Ok(Some(candidates.swap_remove(picked.index)))
        }
    }
}

/// Print conditions and forecast; returns the forecast for saving.
async fn show_weather(
    gateway: &dyn WeatherGateway,
    location: &Location,
) -> anyhow::Result<forecast_core::ForecastDocument> {
    println!("{}", display::location_header(location));
    println!("---");

    match gateway.current_conditions(&location.key).await? {
        Some(cc) => println!("{}", display::current_conditions(&cc)),
        None => println!("No current conditions available."),
    }

    let forecast = gateway.forecast(&location.key, Units::Metric).await?;

    println!();
    println!("5-Day Forecast");
    if let Some(headline) = forecast.headline() {
        println!("{headline}");
    }
    let days = forecast.days();
    if days.is_empty() {
        println!("No forecast data available.");
    }
    for day in &days {
        println!("{}", display::forecast_day(day));
    }

    Ok(forecast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_save_and_dates() {
        let cli = Cli::try_parse_from([
            "forecast",
            "show",
            "Seattle",
            "--save",
            "--start",
            "2024-06-01",
            "--end",
            "2024-06-05",
        ])
        .expect("valid args");

        match cli.command {
            Command::Show {
                query,
                here,
                save,
                start,
                end,
            } => {
                assert_eq!(query.as_deref(), Some("Seattle"));
                assert!(!here);
                assert!(save);
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 1));
                assert_eq!(end, NaiveDate::from_ymd_opt(2024, 6, 5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn dates_require_save() {
        let res = Cli::try_parse_from(["forecast", "show", "Seattle", "--start", "2024-06-01"]);
        assert!(res.is_err());
    }

    #[test]
    fn here_conflicts_with_query() {
        let res = Cli::try_parse_from(["forecast", "show", "Seattle", "--here"]);
        assert!(res.is_err());
    }

    #[test]
    fn export_format_is_parsed() {
        let cli = Cli::try_parse_from(["forecast", "export", "3", "--format", "pdf"])
            .expect("valid args");
        match cli.command {
            Command::Export { id, format, output } => {
                assert_eq!(id, 3);
                assert_eq!(format, ExportFormat::Pdf);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_export_format_is_rejected() {
        let res = Cli::try_parse_from(["forecast", "export", "3", "--format", "docx"]);
        assert!(res.is_err());
    }

    #[test]
    fn update_requires_both_dates() {
        let res = Cli::try_parse_from(["forecast", "update", "3", "--start", "2024-06-02"]);
        assert!(res.is_err());
    }
}
