//! SQLite WatermarkStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::storage::schema::{SyncWatermark, CREATE_WATERMARK_TABLE};
use crate::storage::watermark_store::WatermarkStore;
use crate::storage::{Result, StoreError};
use crate::utils::{parse_rfc3339, rfc3339_micros};

/// The watermark table holds exactly one row.
const WATERMARK_ROW_ID: i64 = 1;

/// SQLite implementation of WatermarkStore.
pub struct SqliteWatermarkStore {
    pool: SqlitePool,
}

impl SqliteWatermarkStore {
    /// Create a new SQLite watermark store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for SqliteWatermarkStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_WATERMARK_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self) -> Result<Option<DateTime<Utc>>> {
        let query = Query::select()
            .column(SyncWatermark::ChangedAt)
            .from(SyncWatermark::Table)
            .and_where(Expr::col(SyncWatermark::Id).eq(WATERMARK_ROW_ID))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let changed_at: String = row.get("changed_at");
                let watermark = parse_rfc3339(&changed_at).ok_or_else(|| {
                    StoreError::Corrupt(format!("unparseable watermark: {changed_at}"))
                })?;
                Ok(Some(watermark))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, watermark: DateTime<Utc>) -> Result<()> {
        let query = Query::insert()
            .into_table(SyncWatermark::Table)
            .columns([
                SyncWatermark::Id,
                SyncWatermark::ChangedAt,
                SyncWatermark::UpdatedAt,
            ])
            .values_panic([
                WATERMARK_ROW_ID.into(),
                rfc3339_micros(watermark).into(),
                rfc3339_micros(Utc::now()).into(),
            ])
            .on_conflict(
                OnConflict::column(SyncWatermark::Id)
                    .update_columns([SyncWatermark::ChangedAt, SyncWatermark::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }
}
