//! FactStore trait and fact record types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Result;
use crate::query::{Interval, Scope};

/// Order lifecycle status carried on every fact row.
///
/// The set is closed: an upstream status outside it is a transform-time
/// error, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the storage/upstream representation; `None` for anything
    /// outside the enumeration.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "out_for_delivery" => Some(OrderStatus::OutForDelivery),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One denormalized analytical record: a single product line within a
/// single order.
///
/// Monetary fields are integer minor currency units (cents). `subtotal`
/// is always `quantity * unit_price`; the transformer recomputes it
/// rather than trusting upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    pub order_id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub subtotal: i64,
    pub order_status: OrderStatus,
    /// Calendar date the order was placed (business time).
    pub order_date: NaiveDate,
    /// Wall-clock time this row was last written by the pipeline (audit time).
    pub load_ts: DateTime<Utc>,
}

/// Revenue summary over delivered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub total_revenue: i64,
    /// Distinct originating orders.
    pub total_orders: i64,
    /// Mean subtotal per *line item*, matching the source system's
    /// definition (not a per-order average).
    pub average_order_value: f64,
    /// Freshness: newest load timestamp among matching rows.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Per-product revenue and units over delivered rows in a date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSalesRecord {
    pub product_id: String,
    pub revenue: i64,
    pub units_sold: i64,
}

/// Revenue for one calendar period (a day or a month).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPointRecord {
    /// `YYYY-MM-DD` for daily grouping, `YYYY-MM` for monthly.
    pub period: String,
    pub revenue: i64,
}

/// Interface for the denormalized fact store.
///
/// The loader is the only writer (`upsert_batch`); the aggregation
/// queries are read-only and scoped by [`Scope`].
///
/// Implementations:
/// - `SqliteFactStore`: SQLite storage
#[async_trait]
pub trait FactStore: Send + Sync + 'static {
    /// Create tables and indexes if they don't exist.
    async fn init_schema(&self) -> Result<()>;

    /// Upsert a batch of fact rows by `(order_id, product_id)` inside a
    /// single transaction: insert if absent, overwrite all non-key fields
    /// if present. The whole batch becomes visible atomically.
    async fn upsert_batch(&self, rows: &[FactRow]) -> Result<()>;

    /// Fetch one fact row by key.
    async fn get(&self, order_id: &str, product_id: &str) -> Result<Option<FactRow>>;

    /// Total number of fact rows.
    async fn count(&self) -> Result<i64>;

    /// Revenue summary over delivered rows within the scope.
    async fn summary(&self, scope: &Scope) -> Result<SummaryRecord>;

    /// Top products by revenue over delivered rows with `order_date` in
    /// `[start, end]`, descending by revenue. Revenue ties break by first
    /// inserted row, deterministic for a fixed underlying row order.
    async fn top_products(
        &self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ProductSalesRecord>>;

    /// Revenue per calendar period over delivered rows with `order_date`
    /// in `[start, end]`, ascending by period. Periods without rows are
    /// omitted.
    async fn sales_trend(
        &self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<TrendPointRecord>>;
}
