//! Order analytics pipeline.
//!
//! Materializes order lines from an upstream operational order system into
//! a denormalized fact store — scheduled, incremental, and idempotent —
//! and serves tenant-scoped revenue, top-product, and trend aggregations
//! over it.
//!
//! ## Architecture
//! ```text
//! [Order API] -> Extract -> Transform -> Load -> [facts + watermark]
//!                   ^                                   |
//!             SyncScheduler                      AnalyticsEngine
//!          (startup + interval)                   (axum REST API)
//! ```
//!
//! The sync cycle advances a persisted watermark per committed page; the
//! query surface reads the same store concurrently, scoped per tenant.

pub mod config;
pub mod query;
pub mod rest;
pub mod storage;
pub mod sync;
pub mod upstream;
pub mod utils;
