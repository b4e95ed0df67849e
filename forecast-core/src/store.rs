//! SQLite-backed storage for forecast snapshots.
//!
//! Every operation opens its own connection, runs one statement and drops
//! the connection again, so no handle outlives the call whether it succeeds
//! or fails. A single writer is assumed.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params, types::Type};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::model::{ForecastDocument, Units};

/// A snapshot about to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub location_key: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub units: Units,
    pub payload: ForecastDocument,
}

/// Row of the saved-snapshot listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub id: i64,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub units: Units,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: i64,
    pub location_key: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub units: Units,
    /// Current, possibly narrowed, payload.
    pub payload: ForecastDocument,
    /// Payload as it was when the snapshot was created.
    pub original_payload: ForecastDocument,
}

impl Snapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            label: self.label.clone(),
            start: self.start,
            end: self.end,
            units: self.units,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Open the store at `path`, creating the file and schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let store = Self { path };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database: {}", self.path.display()))
    }

    /// Create the table, or add `original_json` to a table from the older
    /// layout that only kept the current payload.
    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS forecast_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location_key TEXT NOT NULL,
                location_label TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                units TEXT NOT NULL,
                data_json TEXT NOT NULL,
                original_json TEXT
            );
            "#,
        )
        .context("Failed to create forecast_snapshots table")?;

        if !Self::has_original_column(&conn)? {
            conn.execute_batch("ALTER TABLE forecast_snapshots ADD COLUMN original_json TEXT;")
                .context("Failed to add original_json column")?;
        }
        Ok(())
    }

    fn has_original_column(conn: &Connection) -> Result<bool> {
        let columns: Vec<String> = conn
            .prepare("PRAGMA table_info(forecast_snapshots)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns.iter().any(|name| name == "original_json"))
    }

    /// Insert a snapshot and return its id. Ids only ever grow.
    pub fn create(&self, snapshot: &NewSnapshot) -> Result<i64> {
        let payload = snapshot
            .payload
            .to_json_text()
            .context("Failed to serialize forecast payload")?;

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO forecast_snapshots
                (location_key, location_label, start_date, end_date, units, data_json, original_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                snapshot.location_key,
                snapshot.label,
                snapshot.start,
                snapshot.end,
                snapshot.units.as_str(),
                payload,
            ],
        )
        .context("Failed to insert snapshot")?;

        let id = conn.last_insert_rowid();
        info!(id, label = %snapshot.label, "Saved forecast snapshot");
        Ok(id)
    }

    /// All snapshots, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotSummary>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, location_label, start_date, end_date, units
             FROM forecast_snapshots
             ORDER BY id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SnapshotSummary {
                id: row.get(0)?,
                label: row.get(1)?,
                start: row.get(2)?,
                end: row.get(3)?,
                units: units_at(row, 4)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to read snapshot list")
    }

    pub fn get(&self, id: i64) -> Result<Option<Snapshot>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, location_key, location_label, start_date, end_date, units,
                    data_json, COALESCE(original_json, data_json)
             FROM forecast_snapshots
             WHERE id = ?1",
            params![id],
            |row| {
                let id: i64 = row.get(0)?;
                Ok(Snapshot {
                    id,
                    location_key: row.get(1)?,
                    label: row.get(2)?,
                    start: row.get(3)?,
                    end: row.get(4)?,
                    units: units_at(row, 5)?,
                    payload: decode_payload(id, row.get(6)?),
                    original_payload: decode_payload(id, row.get(7)?),
                })
            },
        )
        .optional()
        .with_context(|| format!("Failed to read snapshot #{id}"))
    }

    /// Overwrite range and current payload. Key, label, units and the
    /// original payload never change after creation.
    pub fn update(
        &self,
        id: i64,
        start: NaiveDate,
        end: NaiveDate,
        payload: &ForecastDocument,
    ) -> Result<()> {
        let payload = payload
            .to_json_text()
            .context("Failed to serialize forecast payload")?;

        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE forecast_snapshots
                 SET start_date = ?1, end_date = ?2, data_json = ?3
                 WHERE id = ?4",
                params![start, end, payload, id],
            )
            .with_context(|| format!("Failed to update snapshot #{id}"))?;

        if changed == 0 {
            bail!("Snapshot #{id} does not exist");
        }
        info!(id, %start, %end, "Narrowed forecast snapshot");
        Ok(())
    }

    /// Remove a snapshot. Deleting an unknown id is not an error.
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute("DELETE FROM forecast_snapshots WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete snapshot #{id}"))?;
        info!(id, removed = changed > 0, "Deleted forecast snapshot");
        Ok(())
    }
}

fn units_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Units> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: anyhow::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
    })
}

/// Corrupt stored text reads as an empty document so the metadata stays usable.
fn decode_payload(id: i64, text: Option<String>) -> ForecastDocument {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return ForecastDocument::empty();
    };
    ForecastDocument::from_json_text(&text).unwrap_or_else(|e| {
        warn!(id, error = %e, "Stored forecast payload is malformed; treating as empty");
        ForecastDocument::empty()
    })
}
