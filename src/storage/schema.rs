//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Facts table schema: one denormalized row per order line.
#[derive(Iden)]
pub enum Facts {
    Table,
    #[iden = "order_id"]
    OrderId,
    #[iden = "vendor_id"]
    VendorId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "quantity"]
    Quantity,
    #[iden = "unit_price"]
    UnitPrice,
    #[iden = "subtotal"]
    Subtotal,
    #[iden = "order_status"]
    OrderStatus,
    #[iden = "order_date"]
    OrderDate,
    #[iden = "load_ts"]
    LoadTs,
}

/// Watermark table schema: a single-row cursor over the upstream change stream.
#[derive(Iden)]
pub enum SyncWatermark {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "changed_at"]
    ChangedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the facts table.
///
/// `(order_id, product_id)` is the upsert key; the composite index on
/// `(vendor_id, order_date)` backs every tenant-scoped aggregation.
pub const CREATE_FACTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS facts (
    order_id TEXT NOT NULL,
    vendor_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price INTEGER NOT NULL,
    subtotal INTEGER NOT NULL,
    order_status TEXT NOT NULL,
    order_date TEXT NOT NULL,
    load_ts TEXT NOT NULL,
    PRIMARY KEY (order_id, product_id)
)";

/// SQL for the tenant/date aggregation index.
pub const CREATE_FACTS_VENDOR_DATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_facts_vendor_date ON facts(vendor_id, order_date)";

/// SQL for creating the watermark table.
///
/// The CHECK pins the table to a single row; the watermark lives outside
/// the facts transaction so a fact-page rollback cannot desynchronize it.
pub const CREATE_WATERMARK_TABLE: &str = "CREATE TABLE IF NOT EXISTS sync_watermark (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    changed_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";
