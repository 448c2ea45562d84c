//! Upstream operational order system client.
//!
//! The operational system is an opaque external collaborator; this module
//! only reads its paged change feed of order lines. Extraction is a pure
//! read, safe to repeat for the same watermark.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub use http::HttpOrderSource;
pub use mock::MockOrderSource;

/// Result type for upstream operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors from the upstream order API.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport-level failure (connect, timeout). Transient.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Non-success response from the upstream API.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Response body was not a JSON array of order lines.
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Transient errors are retried with backoff inside a sync cycle;
    /// client errors and malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Unavailable(_) => true,
            SourceError::Status(code) => *code >= 500,
            SourceError::Malformed(_) => false,
        }
    }
}

/// One order line as exposed by the operational order API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRecord {
    pub order_id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in major currency units, as the operational system
    /// stores it. Converted to minor units exactly once, by the transformer.
    pub price: f64,
    pub status: String,
    /// When the order was placed (business time).
    pub created_at: DateTime<Utc>,
    /// When this line last changed; drives the watermark.
    pub changed_at: DateTime<Utc>,
}

/// Interface for reading the upstream change feed.
#[async_trait]
pub trait OrderSource: Send + Sync + 'static {
    /// Fetch up to `limit` order lines changed strictly after `watermark`,
    /// ordered by change time ascending.
    ///
    /// Pure read with no side effects; calling it repeatedly with the same
    /// watermark returns the same data for unchanged upstream state.
    async fn fetch_changed_since(
        &self,
        watermark: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<OrderLineRecord>>;
}
