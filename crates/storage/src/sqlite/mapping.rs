use sqlx::Row;

use crate::repository::{ProgressRow, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Ordinals are stored as a JSON array so the record stays a single row.
pub(crate) fn encode_ordinals(ordinals: &[u32]) -> Result<String, StorageError> {
    serde_json::to_string(ordinals).map_err(ser)
}

pub(crate) fn decode_ordinals(raw: &str) -> Result<Vec<u32>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressRow, StorageError> {
    let schema_version = u32_from_i64(
        "schema_version",
        row.try_get::<i64, _>("schema_version").map_err(ser)?,
    )?;
    let completed_ordinals =
        decode_ordinals(&row.try_get::<String, _>("completed_ordinals").map_err(ser)?)?;
    let updated_at = row.try_get("updated_at").map_err(ser)?;

    Ok(ProgressRow {
        schema_version,
        completed_ordinals,
        updated_at,
    })
}
