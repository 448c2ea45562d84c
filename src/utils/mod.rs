//! Shared utilities: retry backoff and timestamp formatting.

pub mod retry;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp as RFC3339 with fixed microsecond precision and a
/// `Z` suffix, so lexicographic order of stored TEXT values matches
/// chronological order.
pub fn rfc3339_micros(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
