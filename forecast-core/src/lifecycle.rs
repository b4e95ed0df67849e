use chrono::NaiveDate;

use crate::{
    filter,
    model::{ForecastDocument, Location, Units},
    store::{NewSnapshot, Snapshot, SnapshotStore},
};

/// A date range the user asked for that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Start date ({start}) must be on or before end date ({end}).")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("You can only update within the original start date ({original}).")]
    BeforeOriginalStart { original: NaiveDate },

    #[error("You can only update within the original end date ({original}).")]
    AfterOriginalEnd { original: NaiveDate },

    #[error("No forecast days fall within {start} → {end}. Nothing to update.")]
    NoDaysInRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("Snapshot #{0} does not exist.")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), RangeError> {
    if start > end {
        return Err(RangeError::StartAfterEnd { start, end });
    }
    Ok(())
}

/// A stored range may shrink but never grow.
pub fn validate_narrowing(
    stored_start: NaiveDate,
    stored_end: NaiveDate,
    new_start: NaiveDate,
    new_end: NaiveDate,
) -> Result<(), RangeError> {
    validate_range(new_start, new_end)?;
    if new_start < stored_start {
        return Err(RangeError::BeforeOriginalStart {
            original: stored_start,
        });
    }
    if new_end > stored_end {
        return Err(RangeError::AfterOriginalEnd {
            original: stored_end,
        });
    }
    Ok(())
}

/// Persist a freshly fetched forecast for `location`.
pub fn save_snapshot(
    store: &SnapshotStore,
    location: &Location,
    start: NaiveDate,
    end: NaiveDate,
    forecast: &ForecastDocument,
) -> Result<i64, SnapshotError> {
    validate_range(start, end)?;

    let id = store.create(&NewSnapshot {
        location_key: location.key.clone(),
        label: location.snapshot_label(),
        start,
        end,
        units: Units::Metric,
        payload: forecast.clone(),
    })?;
    Ok(id)
}

/// Shrink a snapshot to `start..=end` and return it as stored afterwards.
///
/// Days are always re-sliced from the payload captured at creation, so
/// repeated narrowing never compounds earlier filtering.
pub fn narrow_snapshot(
    store: &SnapshotStore,
    id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Snapshot, SnapshotError> {
    let current = store.get(id)?.ok_or(SnapshotError::NotFound(id))?;
    validate_narrowing(current.start, current.end, start, end)?;

    let narrowed = filter::narrow_dates(&current.original_payload, start, end);
    if narrowed.daily_entries().is_empty() {
        return Err(RangeError::NoDaysInRange { start, end }.into());
    }

    store.update(id, start, end, &narrowed)?;

    Ok(Snapshot {
        start,
        end,
        payload: narrowed,
        ..current
    })
}
