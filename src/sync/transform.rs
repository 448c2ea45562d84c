//! Pure transformation from upstream order lines to fact rows.

use chrono::{DateTime, Utc};

use crate::storage::fact_store::{FactRow, OrderStatus};
use crate::upstream::OrderLineRecord;

/// Result type for transformations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Validation errors for a single order line. The cycle skips and logs the
/// offending line; these never abort a batch.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("price must be a finite non-negative number, got {0}")]
    InvalidPrice(f64),

    #[error("missing {0} identifier")]
    MissingId(&'static str),
}

/// Map one upstream order line to a fact row.
///
/// Pure function: validates identifiers, quantity, price, and status;
/// rounds the upstream decimal price to minor units exactly once;
/// recomputes the subtotal from quantity and price rather than trusting
/// upstream; truncates the order creation time to a calendar date. The
/// caller supplies `now` as the load timestamp.
pub fn transform_line(line: &OrderLineRecord, now: DateTime<Utc>) -> Result<FactRow> {
    if line.order_id.is_empty() {
        return Err(TransformError::MissingId("order"));
    }
    if line.vendor_id.is_empty() {
        return Err(TransformError::MissingId("vendor"));
    }
    if line.product_id.is_empty() {
        return Err(TransformError::MissingId("product"));
    }
    if line.quantity <= 0 {
        return Err(TransformError::InvalidQuantity(line.quantity));
    }
    if !line.price.is_finite() || line.price < 0.0 {
        return Err(TransformError::InvalidPrice(line.price));
    }
    let order_status = OrderStatus::parse(&line.status)
        .ok_or_else(|| TransformError::UnknownStatus(line.status.clone()))?;

    let unit_price = (line.price * 100.0).round() as i64;

    Ok(FactRow {
        order_id: line.order_id.clone(),
        vendor_id: line.vendor_id.clone(),
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        unit_price,
        subtotal: line.quantity * unit_price,
        order_status,
        order_date: line.created_at.date_naive(),
        load_ts: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn line() -> OrderLineRecord {
        OrderLineRecord {
            order_id: "ord-1".into(),
            vendor_id: "vend-1".into(),
            product_id: "prod-1".into(),
            quantity: 3,
            price: 19.99,
            status: "delivered".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 23, 45, 0).unwrap(),
            changed_at: Utc.with_ymd_and_hms(2024, 3, 6, 1, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_transform_valid_line() {
        let now = Utc::now();
        let row = transform_line(&line(), now).unwrap();
        assert_eq!(row.order_id, "ord-1");
        assert_eq!(row.unit_price, 1999);
        assert_eq!(row.subtotal, 3 * 1999);
        assert_eq!(row.order_status, OrderStatus::Delivered);
        assert_eq!(row.order_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(row.load_ts, now);
    }

    #[test]
    fn test_subtotal_recomputed_from_rounded_price() {
        let mut l = line();
        l.price = 0.335; // rounds to 34 cents, never 33.5
        let row = transform_line(&l, Utc::now()).unwrap();
        assert_eq!(row.unit_price, 34);
        assert_eq!(row.subtotal, 3 * 34);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut l = line();
        l.status = "refunded".into();
        assert_eq!(
            transform_line(&l, Utc::now()),
            Err(TransformError::UnknownStatus("refunded".into()))
        );
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut l = line();
        l.quantity = 0;
        assert_eq!(
            transform_line(&l, Utc::now()),
            Err(TransformError::InvalidQuantity(0))
        );
        l.quantity = -2;
        assert_eq!(
            transform_line(&l, Utc::now()),
            Err(TransformError::InvalidQuantity(-2))
        );
    }

    #[test]
    fn test_bad_price_rejected() {
        let mut l = line();
        l.price = -0.01;
        assert!(matches!(
            transform_line(&l, Utc::now()),
            Err(TransformError::InvalidPrice(_))
        ));
        l.price = f64::NAN;
        assert!(matches!(
            transform_line(&l, Utc::now()),
            Err(TransformError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_missing_identifiers_rejected() {
        let mut l = line();
        l.vendor_id = String::new();
        assert_eq!(
            transform_line(&l, Utc::now()),
            Err(TransformError::MissingId("vendor"))
        );

        let mut l = line();
        l.product_id = String::new();
        assert_eq!(
            transform_line(&l, Utc::now()),
            Err(TransformError::MissingId("product"))
        );

        let mut l = line();
        l.order_id = String::new();
        assert_eq!(
            transform_line(&l, Utc::now()),
            Err(TransformError::MissingId("order"))
        );
    }

    #[test]
    fn test_zero_price_allowed() {
        let mut l = line();
        l.price = 0.0;
        let row = transform_line(&l, Utc::now()).unwrap();
        assert_eq!(row.unit_price, 0);
        assert_eq!(row.subtotal, 0);
    }
}
