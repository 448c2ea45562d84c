//! WatermarkStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// Interface for the sync watermark.
///
/// The watermark records the highest upstream change timestamp that has
/// been fully loaded. It is persisted separately from the facts table so
/// a fact-page rollback cannot silently desynchronize it, and it is only
/// advanced after a page's fact transaction commits.
///
/// The value never regresses in normal operation; rolling it back is a
/// manual operator intervention.
///
/// Implementations:
/// - `SqliteWatermarkStore`: SQLite storage
#[async_trait]
pub trait WatermarkStore: Send + Sync + 'static {
    /// Create the watermark table if it doesn't exist.
    async fn init_schema(&self) -> Result<()>;

    /// Read the current watermark. `None` before the first completed page.
    async fn get(&self) -> Result<Option<DateTime<Utc>>>;

    /// Persist a new watermark value.
    ///
    /// Upserts: creates the cursor on first run, overwrites it afterwards.
    async fn put(&self, watermark: DateTime<Utc>) -> Result<()>;
}
