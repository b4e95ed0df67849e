//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The AccuWeather gateway and the GeoIP fallback
//! - Location resolution from free-text input
//! - Forecast snapshot storage, narrowing and export
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod export;
pub mod filter;
pub mod gateway;
pub mod geoip;
pub mod lifecycle;
pub mod model;
pub mod resolver;
pub mod store;

pub use config::Config;
pub use export::ExportFormat;
pub use gateway::{AccuWeatherGateway, GatewayError, WeatherGateway};
pub use geoip::{CallerLocation, GeoIpLocator};
pub use lifecycle::{RangeError, SnapshotError};
pub use model::{CurrentConditions, ForecastDay, ForecastDocument, Location, Units};
pub use resolver::{LocationResolver, Resolution};
pub use store::{NewSnapshot, Snapshot, SnapshotStore, SnapshotSummary};
