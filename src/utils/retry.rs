//! Retry utilities: backoff builders for upstream extraction.
//!
//! Uses `backon` for exponential backoff with jitter. Extraction is the
//! only retried path in the pipeline; query-side errors are never retried.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Backoff for upstream extraction calls within a sync cycle.
///
/// - Min delay: 200ms
/// - Max delay: 5s
/// - Jitter enabled
///
/// `max_attempts` bounds the retries per page; exhausting them fails the
/// whole cycle, and the next scheduled tick starts over from the last
/// committed watermark.
pub fn extract_backoff(max_attempts: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(max_attempts)
        .with_jitter()
}
