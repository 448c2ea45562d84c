//! Aggregation query engine.
//!
//! Stateless read-side facade over the fact store. Tenant scope is an
//! explicit sum type threaded through every query — there is no admin
//! boolean below the HTTP layer — and grouping/windowing arrive as typed
//! parameters, never query strings.

use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};

use crate::storage::fact_store::{FactStore, ProductSalesRecord, SummaryRecord, TrendPointRecord};
use crate::storage::StoreError;

/// Result type for analytics queries.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors from the query engine.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Caller problem; surfaces as a client error, never retried.
    #[error("{0}")]
    BadRequest(String),

    /// Storage problem; logged with context server-side, surfaced as a
    /// generic server error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Tenant scope for a query: one vendor's slice, or the global view
/// (administrative callers only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Tenant(String),
    Global,
}

/// Grouping period for sales trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Day,
    Month,
}

impl Interval {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(Interval::Day),
            "month" => Some(Interval::Month),
            _ => None,
        }
    }
}

/// Default number of products returned by top-products queries.
pub const DEFAULT_TOP_LIMIT: u32 = 5;
/// Default trailing window for sales trends, in months.
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Read-side query facade.
pub struct AnalyticsEngine {
    facts: Arc<dyn FactStore>,
}

impl AnalyticsEngine {
    pub fn new(facts: Arc<dyn FactStore>) -> Self {
        Self { facts }
    }

    /// Revenue summary over delivered rows within the scope.
    pub async fn summary(&self, scope: &Scope) -> Result<SummaryRecord> {
        Ok(self.facts.summary(scope).await?)
    }

    /// Top products by revenue. `start` defaults to the epoch, `end` to
    /// today, `limit` to [`DEFAULT_TOP_LIMIT`].
    pub async fn top_products(
        &self,
        scope: &Scope,
        limit: Option<u32>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<ProductSalesRecord>> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT);
        if limit == 0 {
            return Err(QueryError::BadRequest("limit must be positive".into()));
        }

        let start = start.unwrap_or_default();
        let end = end.unwrap_or_else(|| Utc::now().date_naive());
        if start > end {
            return Err(QueryError::BadRequest(
                "start_date is after end_date".into(),
            ));
        }

        Ok(self.facts.top_products(scope, start, end, limit).await?)
    }

    /// Revenue per period over a trailing window of `months` (default
    /// [`DEFAULT_TREND_MONTHS`]) ending today. Empty periods are omitted;
    /// callers needing a dense series must zero-fill themselves.
    pub async fn sales_trend(
        &self,
        scope: &Scope,
        interval: Interval,
        months: Option<u32>,
    ) -> Result<Vec<TrendPointRecord>> {
        let months = months.unwrap_or(DEFAULT_TREND_MONTHS);
        if months == 0 {
            return Err(QueryError::BadRequest("months must be positive".into()));
        }

        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_months(Months::new(months))
            .unwrap_or_default();

        Ok(self.facts.sales_trend(scope, start, end, interval).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_parse() {
        assert_eq!(Interval::parse("day"), Some(Interval::Day));
        assert_eq!(Interval::parse("month"), Some(Interval::Month));
        assert_eq!(Interval::parse("week"), None);
        assert_eq!(Interval::parse(""), None);
    }

    #[test]
    fn test_interval_default_is_day() {
        assert_eq!(Interval::default(), Interval::Day);
    }
}
