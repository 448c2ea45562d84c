//! HTTP client for the upstream order API.
//!
//! Reads `GET {base}/order-lines?changed_after=<rfc3339>&limit=<n>`, a JSON
//! array of order lines ordered by change time ascending. The array is
//! decoded element-wise so one malformed record is skipped and logged
//! instead of poisoning the whole page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::warn;

use super::{OrderLineRecord, OrderSource, Result, SourceError};
use crate::utils::rfc3339_micros;

/// Reqwest-backed implementation of OrderSource.
pub struct HttpOrderSource {
    client: Client,
    base_url: String,
}

impl HttpOrderSource {
    /// Create a new client for the upstream API at `base_url`.
    pub fn new(base_url: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl OrderSource for HttpOrderSource {
    async fn fetch_changed_since(
        &self,
        watermark: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<OrderLineRecord>> {
        let url = format!("{}/order-lines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("changed_after", rfc3339_micros(watermark)),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let values: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(decode_lines(values))
    }
}

/// Decode each array element independently, skipping records that don't
/// parse (forward progress with partial loss).
fn decode_lines(values: Vec<serde_json::Value>) -> Vec<OrderLineRecord> {
    let mut lines = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<OrderLineRecord>(value) {
            Ok(line) => lines.push(line),
            Err(e) => warn!(error = %e, "skipping malformed upstream record"),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_lines_skips_malformed() {
        let values = vec![
            json!({
                "orderId": "A",
                "vendorId": "V1",
                "productId": "P1",
                "quantity": 2,
                "price": 10.5,
                "status": "delivered",
                "createdAt": "2024-03-01T10:00:00Z",
                "changedAt": "2024-03-01T11:00:00Z"
            }),
            json!({"orderId": "B"}),
            json!("not an object"),
        ];

        let lines = decode_lines(values);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].order_id, "A");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].price, 10.5);
    }

    #[test]
    fn test_decode_lines_empty() {
        assert!(decode_lines(vec![]).is_empty());
    }
}
