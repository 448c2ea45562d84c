//! In-memory OrderSource for tests and local development.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{OrderLineRecord, OrderSource, Result, SourceError};

/// In-memory mock of the upstream order API.
///
/// Lines are filtered and ordered by `changed_at` the way the real feed
/// is. Failures and response delays can be injected to exercise retry and
/// overlap handling.
#[derive(Default)]
pub struct MockOrderSource {
    lines: Mutex<Vec<OrderLineRecord>>,
    fail_next: AtomicU32,
    delay: Mutex<Option<Duration>>,
}

impl MockOrderSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order line to the feed.
    pub fn push(&self, line: OrderLineRecord) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push(line);
    }

    /// Replace the line with the same `(order_id, product_id)`, or add it.
    /// Mirrors an upstream mutation before terminal state.
    pub fn upsert(&self, line: OrderLineRecord) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        match lines
            .iter_mut()
            .find(|l| l.order_id == line.order_id && l.product_id == line.product_id)
        {
            Some(existing) => *existing = line,
            None => lines.push(line),
        }
    }

    /// Fail the next `n` fetches with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Delay every fetch by `delay` (for overlap tests).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }
}

#[async_trait]
impl OrderSource for MockOrderSource {
    async fn fetch_changed_since(
        &self,
        watermark: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<OrderLineRecord>> {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SourceError::Unavailable("injected failure".into()));
        }

        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<OrderLineRecord> = lines
            .iter()
            .filter(|l| l.changed_at > watermark)
            .cloned()
            .collect();
        matched.sort_by_key(|l| l.changed_at);
        matched.truncate(limit as usize);
        Ok(matched)
    }
}
