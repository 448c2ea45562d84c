//! Storage implementations.

use std::sync::Arc;

use tracing::info;

pub mod fact_store;
pub mod schema;
pub mod sqlite;
pub mod watermark_store;

pub use fact_store::{
    FactRow, FactStore, OrderStatus, ProductSalesRecord, SummaryRecord, TrendPointRecord,
};
pub use sqlite::{SqliteFactStore, SqliteWatermarkStore};
pub use watermark_store::WatermarkStore;

use crate::config::StorageConfig;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value failed to parse back into its domain type.
    #[error("invalid stored value: {0}")]
    Corrupt(String),
}

/// Open (creating if needed) the SQLite database and initialize both stores.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<(Arc<SqliteFactStore>, Arc<SqliteWatermarkStore>)> {
    if let Some(parent) = std::path::Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.path)).await?;

    let facts = Arc::new(SqliteFactStore::new(pool.clone()));
    facts.init_schema().await?;

    let watermarks = Arc::new(SqliteWatermarkStore::new(pool));
    watermarks.init_schema().await?;

    info!(path = %config.path, "storage: sqlite");

    Ok((facts, watermarks))
}
