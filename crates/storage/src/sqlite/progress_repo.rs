use async_trait::async_trait;

use super::SqliteRepository;
use super::mapping::{encode_ordinals, map_progress_row};
use crate::repository::{ProgressRepository, ProgressRow, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self, namespace: &str) -> Result<Option<ProgressRow>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT schema_version, completed_ordinals, updated_at
            FROM progress_records
            WHERE namespace = ?1
            ",
        )
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn save_progress(&self, namespace: &str, row: &ProgressRow) -> Result<(), StorageError> {
        let ordinals = encode_ordinals(&row.completed_ordinals)?;

        sqlx::query(
            r"
            INSERT INTO progress_records (namespace, schema_version, completed_ordinals, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(namespace) DO UPDATE SET
                schema_version = excluded.schema_version,
                completed_ordinals = excluded.completed_ordinals,
                updated_at = excluded.updated_at
            ",
        )
        .bind(namespace)
        .bind(i64::from(row.schema_version))
        .bind(ordinals)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
