//! REST API for the aggregation query engine.
//!
//! Endpoints (all GET, all JSON):
//! - `/api/health` — health check
//! - `/api/analytics/summary` — revenue summary, tenant-scoped
//! - `/api/analytics/top-products` — top products by revenue, tenant-scoped
//! - `/api/analytics/top-products/global` — same shape, never scoped
//! - `/api/analytics/sales-trend` — revenue per day or month, tenant-scoped
//!
//! Scoped endpoints resolve the caller's vendor from the `x-vendor-id`
//! header; `x-role: admin` grants the unscoped global view. A non-admin
//! caller without a vendor identity gets a 400, never an empty result.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::query::{AnalyticsEngine, Interval, QueryError, Scope};
use crate::storage::fact_store::{ProductSalesRecord, SummaryRecord, TrendPointRecord};
use crate::utils::rfc3339_micros;

/// Shared state for axum handlers.
type AppState = Arc<AnalyticsEngine>;

/// Vendor identity header for tenant-scoped queries.
pub const VENDOR_HEADER: &str = "x-vendor-id";
/// Role header; the value `admin` grants the global view.
pub const ROLE_HEADER: &str = "x-role";

/// Start the REST server on the given host/port, running until the
/// `shutdown` future resolves.
///
/// When `port` is 0, the OS assigns an ephemeral port; the bound address
/// is always logged.
pub async fn serve(
    engine: Arc<AnalyticsEngine>,
    host: &str,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(engine);
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "analytics REST API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(engine: Arc<AnalyticsEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/analytics/summary", get(summary))
        .route("/api/analytics/top-products", get(top_products))
        .route("/api/analytics/top-products/global", get(top_products_global))
        .route("/api/analytics/sales-trend", get(sales_trend))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(engine)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn summary(
    State(engine): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SummaryResponse>, ApiError> {
    let scope = resolve_scope(&headers)?;
    let record = engine.summary(&scope).await?;
    Ok(Json(record.into()))
}

async fn top_products(
    State(engine): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TopProductsParams>,
) -> Result<Json<Vec<ProductEntry>>, ApiError> {
    let scope = resolve_scope(&headers)?;
    top_products_scoped(&engine, scope, params).await
}

/// Administrative/home-page variant: identical semantics, never scoped.
async fn top_products_global(
    State(engine): State<AppState>,
    Query(params): Query<TopProductsParams>,
) -> Result<Json<Vec<ProductEntry>>, ApiError> {
    top_products_scoped(&engine, Scope::Global, params).await
}

async fn top_products_scoped(
    engine: &AnalyticsEngine,
    scope: Scope,
    params: TopProductsParams,
) -> Result<Json<Vec<ProductEntry>>, ApiError> {
    let start = parse_date(params.start_date.as_deref(), "start_date")?;
    let end = parse_date(params.end_date.as_deref(), "end_date")?;
    let records = engine
        .top_products(&scope, params.limit, start, end)
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

async fn sales_trend(
    State(engine): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TrendParams>,
) -> Result<Json<Vec<TrendEntry>>, ApiError> {
    let scope = resolve_scope(&headers)?;
    let interval = match params.interval.as_deref() {
        None => Interval::default(),
        Some(s) => Interval::parse(s)
            .ok_or_else(|| ApiError::bad_request("invalid interval: expected day or month"))?,
    };
    let points = engine.sales_trend(&scope, interval, params.months).await?;
    Ok(Json(points.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Scope and parameter resolution
// ============================================================================

/// Resolve the caller's scope: admins get the global view, everyone else
/// must present a vendor identity.
fn resolve_scope(headers: &HeaderMap) -> Result<Scope, ApiError> {
    let role = headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok());
    if role == Some("admin") {
        return Ok(Scope::Global);
    }

    match headers.get(VENDOR_HEADER).and_then(|v| v.to_str().ok()) {
        Some(vendor) if !vendor.is_empty() => Ok(Scope::Tenant(vendor.to_string())),
        _ => Err(ApiError::bad_request("vendor scope could not be resolved")),
    }
}

fn parse_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value {
        None => Ok(None),
        Some(s) => s.parse::<NaiveDate>().map(Some).map_err(|_| {
            ApiError::bad_request(&format!("invalid {name}: expected YYYY-MM-DD"))
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct TopProductsParams {
    limit: Option<u32>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TrendParams {
    interval: Option<String>,
    months: Option<u32>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
struct SummaryResponse {
    #[serde(rename = "totalRevenue")]
    total_revenue: i64,
    #[serde(rename = "totalOrders")]
    total_orders: i64,
    #[serde(rename = "averageOrderValue")]
    average_order_value: f64,
    #[serde(rename = "lastUpdated")]
    last_updated: Option<String>,
}

impl From<SummaryRecord> for SummaryResponse {
    fn from(record: SummaryRecord) -> Self {
        Self {
            total_revenue: record.total_revenue,
            total_orders: record.total_orders,
            average_order_value: record.average_order_value,
            last_updated: record.last_updated.map(rfc3339_micros),
        }
    }
}

#[derive(Serialize)]
struct ProductEntry {
    #[serde(rename = "productId")]
    product_id: String,
    revenue: i64,
    #[serde(rename = "unitsSold")]
    units_sold: i64,
}

impl From<ProductSalesRecord> for ProductEntry {
    fn from(record: ProductSalesRecord) -> Self {
        Self {
            product_id: record.product_id,
            revenue: record.revenue,
            units_sold: record.units_sold,
        }
    }
}

#[derive(Serialize)]
struct TrendEntry {
    period: String,
    revenue: i64,
}

impl From<TrendPointRecord> for TrendEntry {
    fn from(record: TrendPointRecord) -> Self {
        Self {
            period: record.period,
            revenue: record.revenue,
        }
    }
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error response: 400 with the message for request errors, 500 with a
/// generic body for everything else (internals stay server-side).
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::BadRequest(message) => Self {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            QueryError::Store(e) => {
                error!(error = %e, "analytics query failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
