//! SQLite storage implementations (sqlx + sea-query).

mod fact_store;
mod watermark_store;


pub use fact_store::SqliteFactStore;
pub use watermark_store::SqliteWatermarkStore;
