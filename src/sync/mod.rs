//! Sync cycle: Extract → Transform → Load.
//!
//! A cycle is a function of `(watermark, upstream state)`: it reads the
//! persisted watermark once, pulls bounded pages of changed order lines,
//! transforms and validates them, upserts each page in one transaction,
//! and advances the watermark only after that page commits. A failed page
//! leaves the watermark at the last committed page; the next scheduled
//! tick retries from there.

pub mod scheduler;
pub mod transform;


use std::sync::atomic::{AtomicBool, Ordering};

use backon::Retryable;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::storage::fact_store::FactStore;
use crate::storage::watermark_store::WatermarkStore;
use crate::storage::StoreError;
use crate::upstream::{OrderLineRecord, OrderSource, SourceError};
use crate::utils::retry::extract_backoff;

pub use scheduler::{SyncScheduler, SyncState};
pub use transform::{transform_line, TransformError};

/// Result type for sync cycles.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Unrecoverable errors that end a cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Upstream stayed unavailable through all retries for a page.
    #[error("extraction failed: {0}")]
    Extract(#[from] SourceError),

    /// A page failed to load or the watermark failed to persist.
    #[error("load failed: {0}")]
    Store(#[from] StoreError),
}

/// Tuning knobs for a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Target upstream records per page. A group of rows sharing one
    /// change timestamp always loads whole, even when larger than this.
    pub page_size: u32,
    /// Retry attempts per page before the cycle fails.
    pub max_retries: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 500,
            max_retries: 3,
        }
    }
}

/// Outcome of one completed cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Pages committed.
    pub pages: u32,
    /// Fact rows upserted.
    pub loaded: u64,
    /// Order lines skipped as malformed.
    pub skipped: u64,
    /// Watermark after the last committed page, if any page committed.
    pub watermark: Option<DateTime<Utc>>,
}

/// Run one Extract→Transform→Load cycle.
///
/// `cancel` is honored at page boundaries only; a page in flight always
/// runs to commit or rollback.
pub async fn run_cycle(
    source: &dyn OrderSource,
    facts: &dyn FactStore,
    watermarks: &dyn WatermarkStore,
    opts: &SyncOptions,
    cancel: &AtomicBool,
) -> Result<CycleStats> {
    let mut watermark = watermarks
        .get()
        .await?
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let mut stats = CycleStats::default();

    loop {
        if cancel.load(Ordering::Relaxed) {
            info!("sync cycle stopping at page boundary");
            break;
        }

        let mut limit = opts.page_size;
        let mut lines = fetch_page(source, watermark, limit, opts).await?;
        if lines.is_empty() {
            break;
        }
        let mut drained = (lines.len() as u32) < limit;

        // A full page must not end inside a group of rows sharing one
        // changed_at: strictly-after paging would strand the rest of the
        // group. Drop the tied tail so the next fetch re-reads the whole
        // group; the idempotent upsert makes the overlap safe.
        while !drained {
            let newest = match lines.last() {
                Some(line) => line.changed_at,
                None => break,
            };
            let cut = lines.partition_point(|l| l.changed_at < newest);
            if cut > 0 {
                lines.truncate(cut);
                break;
            }
            // Every row in the page shares one changed_at; widen the
            // fetch until the group fits in a single page.
            limit = limit.saturating_mul(2);
            lines = fetch_page(source, watermark, limit, opts).await?;
            drained = (lines.len() as u32) < limit;
        }

        let now = Utc::now();
        let mut rows = Vec::with_capacity(lines.len());
        let mut page_watermark = watermark;
        for line in &lines {
            if line.changed_at > page_watermark {
                page_watermark = line.changed_at;
            }
            match transform_line(line, now) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    // Skip the single offending line; the rest of the page loads.
                    stats.skipped += 1;
                    warn!(
                        order_id = %line.order_id,
                        product_id = %line.product_id,
                        error = %e,
                        "skipping order line"
                    );
                }
            }
        }

        facts.upsert_batch(&rows).await?;
        watermarks.put(page_watermark).await?;

        stats.pages += 1;
        stats.loaded += rows.len() as u64;
        stats.watermark = Some(page_watermark);
        watermark = page_watermark;

        if drained {
            break;
        }
    }

    Ok(stats)
}

/// Fetch one page, retrying transient upstream failures with bounded
/// exponential backoff.
async fn fetch_page(
    source: &dyn OrderSource,
    watermark: DateTime<Utc>,
    limit: u32,
    opts: &SyncOptions,
) -> std::result::Result<Vec<OrderLineRecord>, SourceError> {
    (|| async { source.fetch_changed_since(watermark, limit).await })
        .retry(extract_backoff(opts.max_retries))
        .when(SourceError::is_transient)
        .notify(|err, dur| {
            warn!(error = %err, retry_in = ?dur, "upstream extraction failed, retrying");
        })
        .await
}
