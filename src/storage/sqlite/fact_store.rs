//! SQLite FactStore implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_query::{Alias, Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::query::{Interval, Scope};
use crate::storage::fact_store::{
    FactRow, FactStore, OrderStatus, ProductSalesRecord, SummaryRecord, TrendPointRecord,
};
use crate::storage::schema::{Facts, CREATE_FACTS_TABLE, CREATE_FACTS_VENDOR_DATE_INDEX};
use crate::storage::{Result, StoreError};
use crate::utils::{parse_rfc3339, rfc3339_micros};

/// SQLite implementation of FactStore.
pub struct SqliteFactStore {
    pool: SqlitePool,
}

impl SqliteFactStore {
    /// Create a new SQLite fact store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert rows within an already-started transaction.
    async fn insert_rows(conn: &mut SqliteConnection, rows: &[FactRow]) -> Result<()> {
        for row in rows {
            let query = Query::insert()
                .into_table(Facts::Table)
                .columns([
                    Facts::OrderId,
                    Facts::VendorId,
                    Facts::ProductId,
                    Facts::Quantity,
                    Facts::UnitPrice,
                    Facts::Subtotal,
                    Facts::OrderStatus,
                    Facts::OrderDate,
                    Facts::LoadTs,
                ])
                .values_panic([
                    row.order_id.as_str().into(),
                    row.vendor_id.as_str().into(),
                    row.product_id.as_str().into(),
                    row.quantity.into(),
                    row.unit_price.into(),
                    row.subtotal.into(),
                    row.order_status.as_str().into(),
                    row.order_date.to_string().into(),
                    rfc3339_micros(row.load_ts).into(),
                ])
                .on_conflict(
                    OnConflict::columns([Facts::OrderId, Facts::ProductId])
                        .update_columns([
                            Facts::VendorId,
                            Facts::Quantity,
                            Facts::UnitPrice,
                            Facts::Subtotal,
                            Facts::OrderStatus,
                            Facts::OrderDate,
                            Facts::LoadTs,
                        ])
                        .to_owned(),
                )
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Apply the tenant filter for scoped queries; `Scope::Global` adds none.
    fn apply_scope(stmt: &mut sea_query::SelectStatement, scope: &Scope) {
        if let Scope::Tenant(vendor_id) = scope {
            stmt.and_where(Expr::col(Facts::VendorId).eq(vendor_id.as_str()));
        }
    }

    fn row_to_fact(row: &sqlx::sqlite::SqliteRow) -> Result<FactRow> {
        let status_str: String = row.get("order_status");
        let order_status = OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status: {status_str}")))?;

        let date_str: String = row.get("order_date");
        let order_date = date_str
            .parse::<NaiveDate>()
            .map_err(|_| StoreError::Corrupt(format!("unparseable order date: {date_str}")))?;

        let load_ts_str: String = row.get("load_ts");
        let load_ts = parse_rfc3339(&load_ts_str)
            .ok_or_else(|| StoreError::Corrupt(format!("unparseable load_ts: {load_ts_str}")))?;

        Ok(FactRow {
            order_id: row.get("order_id"),
            vendor_id: row.get("vendor_id"),
            product_id: row.get("product_id"),
            quantity: row.get("quantity"),
            unit_price: row.get("unit_price"),
            subtotal: row.get("subtotal"),
            order_status,
            order_date,
            load_ts,
        })
    }
}

#[async_trait]
impl FactStore for SqliteFactStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_FACTS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_FACTS_VENDOR_DATE_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_batch(&self, rows: &[FactRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
        // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = Self::insert_rows(&mut conn, rows).await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn get(&self, order_id: &str, product_id: &str) -> Result<Option<FactRow>> {
        let query = Query::select()
            .columns([
                Facts::OrderId,
                Facts::VendorId,
                Facts::ProductId,
                Facts::Quantity,
                Facts::UnitPrice,
                Facts::Subtotal,
                Facts::OrderStatus,
                Facts::OrderDate,
                Facts::LoadTs,
            ])
            .from(Facts::Table)
            .and_where(Expr::col(Facts::OrderId).eq(order_id))
            .and_where(Expr::col(Facts::ProductId).eq(product_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        row.map(|r| Self::row_to_fact(&r)).transpose()
    }

    async fn count(&self) -> Result<i64> {
        let query = Query::select()
            .expr(Expr::col(Facts::OrderId).count())
            .from(Facts::Table)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        Ok(row.get(0))
    }

    async fn summary(&self, scope: &Scope) -> Result<SummaryRecord> {
        // The statement holds non-Send Rc idents; it must not live across
        // the await, so build the SQL string in its own scope.
        let query = {
            let mut stmt = Query::select();
            stmt.expr_as(Expr::col(Facts::Subtotal).sum(), Alias::new("total_revenue"))
                .expr_as(
                    Expr::col(Facts::OrderId).count_distinct(),
                    Alias::new("total_orders"),
                )
                .expr_as(
                    Func::avg(Expr::col(Facts::Subtotal)),
                    Alias::new("average_order_value"),
                )
                .expr_as(Expr::col(Facts::LoadTs).max(), Alias::new("last_updated"))
                .from(Facts::Table)
                .and_where(Expr::col(Facts::OrderStatus).eq(OrderStatus::Delivered.as_str()));
            Self::apply_scope(&mut stmt, scope);
            stmt.to_string(SqliteQueryBuilder)
        };

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;

        let total_revenue: Option<i64> = row.get("total_revenue");
        let total_orders: i64 = row.get("total_orders");
        let average_order_value: Option<f64> = row.get("average_order_value");
        let last_updated: Option<String> = row.get("last_updated");
        let last_updated = match last_updated {
            Some(ts) => Some(
                parse_rfc3339(&ts)
                    .ok_or_else(|| StoreError::Corrupt(format!("unparseable load_ts: {ts}")))?,
            ),
            None => None,
        };

        Ok(SummaryRecord {
            total_revenue: total_revenue.unwrap_or(0),
            total_orders,
            average_order_value: average_order_value.unwrap_or(0.0),
            last_updated,
        })
    }

    async fn top_products(
        &self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ProductSalesRecord>> {
        let query = {
            let mut stmt = Query::select();
            stmt.column(Facts::ProductId)
                .expr_as(Expr::col(Facts::Subtotal).sum(), Alias::new("revenue"))
                .expr_as(Expr::col(Facts::Quantity).sum(), Alias::new("units_sold"))
                .from(Facts::Table)
                .and_where(Expr::col(Facts::OrderStatus).eq(OrderStatus::Delivered.as_str()))
                .and_where(Expr::col(Facts::OrderDate).gte(start.to_string()))
                .and_where(Expr::col(Facts::OrderDate).lte(end.to_string()))
                .group_by_col(Facts::ProductId)
                .order_by(Alias::new("revenue"), Order::Desc)
                // Revenue ties break by first inserted row, so the order is
                // stable for unchanged underlying data.
                .order_by_expr(Expr::cust("MIN(rowid)"), Order::Asc)
                .limit(limit as u64);
            Self::apply_scope(&mut stmt, scope);
            stmt.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let records = rows
            .iter()
            .map(|row| ProductSalesRecord {
                product_id: row.get("product_id"),
                revenue: row.get("revenue"),
                units_sold: row.get("units_sold"),
            })
            .collect();

        Ok(records)
    }

    async fn sales_trend(
        &self,
        scope: &Scope,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<TrendPointRecord>> {
        // order_date is TEXT `YYYY-MM-DD`, so the month period is a prefix.
        let period_sql = match interval {
            Interval::Day => "order_date",
            Interval::Month => "substr(order_date, 1, 7)",
        };

        let query = {
            let mut stmt = Query::select();
            stmt.expr_as(Expr::cust(period_sql), Alias::new("period"))
                .expr_as(Expr::col(Facts::Subtotal).sum(), Alias::new("revenue"))
                .from(Facts::Table)
                .and_where(Expr::col(Facts::OrderStatus).eq(OrderStatus::Delivered.as_str()))
                .and_where(Expr::col(Facts::OrderDate).gte(start.to_string()))
                .and_where(Expr::col(Facts::OrderDate).lte(end.to_string()))
                .add_group_by([Expr::cust(period_sql)])
                .order_by(Alias::new("period"), Order::Asc);
            Self::apply_scope(&mut stmt, scope);
            stmt.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let points = rows
            .iter()
            .map(|row| TrendPointRecord {
                period: row.get("period"),
                revenue: row.get("revenue"),
            })
            .collect();

        Ok(points)
    }
}
