//! Router-level tests via tower's oneshot, no listening socket.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, Response, StatusCode};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

use super::{router, ROLE_HEADER, VENDOR_HEADER};
use crate::query::AnalyticsEngine;
use crate::storage::fact_store::{FactRow, FactStore, OrderStatus};
use crate::storage::sqlite::SqliteFactStore;

fn fact(
    order_id: &str,
    vendor_id: &str,
    product_id: &str,
    subtotal: i64,
    status: OrderStatus,
) -> FactRow {
    FactRow {
        order_id: order_id.to_string(),
        vendor_id: vendor_id.to_string(),
        product_id: product_id.to_string(),
        quantity: 1,
        unit_price: subtotal,
        subtotal,
        order_status: status,
        // Today, so default query windows include every seeded row.
        order_date: chrono::Utc::now().date_naive(),
        load_ts: chrono::Utc::now(),
    }
}

/// Router over a seeded in-memory store: V1 has one delivered order with
/// two line items (100 + 50), V2 one delivered line (200), plus a pending
/// line that no aggregate should count.
async fn test_app() -> Router {
    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("failed to create in-memory pool");

    let store = SqliteFactStore::new(pool);
    store.init_schema().await.expect("failed to init schema");
    store
        .upsert_batch(&[
            fact("A", "V1", "P1", 100, OrderStatus::Delivered),
            fact("A", "V1", "P2", 50, OrderStatus::Delivered),
            fact("B", "V2", "P3", 200, OrderStatus::Delivered),
            fact("C", "V1", "P1", 999, OrderStatus::Pending),
        ])
        .await
        .expect("failed to seed facts");

    router(Arc::new(AnalyticsEngine::new(Arc::new(store))))
}

async fn get(app: &Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let mut req = Request::builder().uri(uri);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    app.clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let resp = get(&app, "/api/health", &[]).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_summary_requires_scope() {
    let app = test_app().await;

    let resp = get(&app, "/api/analytics/summary", &[]).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "vendor scope could not be resolved");
}

#[tokio::test]
async fn test_summary_vendor_scoped() {
    let app = test_app().await;

    let resp = get(&app, "/api/analytics/summary", &[(VENDOR_HEADER, "V1")]).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["totalRevenue"], 150);
    assert_eq!(body["totalOrders"], 1);
    assert_eq!(body["averageOrderValue"], 75.0);
    assert!(body["lastUpdated"].is_string());
}

#[tokio::test]
async fn test_summary_admin_sees_global() {
    let app = test_app().await;

    let resp = get(&app, "/api/analytics/summary", &[(ROLE_HEADER, "admin")]).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["totalRevenue"], 350);
    assert_eq!(body["totalOrders"], 2);
}

#[tokio::test]
async fn test_top_products_scoped_and_ordered() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/top-products",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let products = body.as_array().expect("array body");
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["productId"], "P1");
    assert_eq!(products[0]["revenue"], 100);
    assert_eq!(products[0]["unitsSold"], 1);
    assert_eq!(products[1]["productId"], "P2");
}

#[tokio::test]
async fn test_top_products_limit() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/top-products?limit=1",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body.as_array().expect("array body").len(), 1);
}

#[tokio::test]
async fn test_top_products_rejects_zero_limit() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/top-products?limit=0",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_products_rejects_bad_date() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/top-products?start_date=2024-13-01",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid start_date: expected YYYY-MM-DD");
}

#[tokio::test]
async fn test_top_products_rejects_inverted_date_window() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/top-products?start_date=2024-05-01&end_date=2024-04-01",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "start_date is after end_date");
}

#[tokio::test]
async fn test_top_products_global_needs_no_headers() {
    let app = test_app().await;

    let resp = get(&app, "/api/analytics/top-products/global", &[]).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let products = body.as_array().expect("array body");
    assert_eq!(products.len(), 3);
    assert_eq!(products[0]["productId"], "P3");
    assert_eq!(products[0]["revenue"], 200);
}

#[tokio::test]
async fn test_sales_trend_daily_default() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/sales-trend",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let points = body.as_array().expect("array body");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["revenue"], 150);
}

#[tokio::test]
async fn test_sales_trend_monthly() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/sales-trend?interval=month",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let points = body.as_array().expect("array body");
    assert_eq!(points.len(), 1);
    // YYYY-MM period for monthly grouping.
    assert_eq!(points[0]["period"].as_str().unwrap().len(), 7);
}

#[tokio::test]
async fn test_sales_trend_rejects_bad_interval() {
    let app = test_app().await;

    let resp = get(
        &app,
        "/api/analytics/sales-trend?interval=week",
        &[(VENDOR_HEADER, "V1")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sales_trend_requires_scope() {
    let app = test_app().await;

    let resp = get(&app, "/api/analytics/sales-trend", &[]).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_serve_stops_when_shutdown_resolves() {
    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("failed to create in-memory pool");
    let store = SqliteFactStore::new(pool);
    store.init_schema().await.expect("failed to init schema");
    let engine = Arc::new(AnalyticsEngine::new(Arc::new(store)));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(super::serve(engine, "127.0.0.1", 0, async move {
        let _ = rx.await;
    }));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!server.is_finished());

    tx.send(()).unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_secs(2), server)
        .await
        .expect("server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
