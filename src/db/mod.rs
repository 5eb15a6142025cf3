//! Warehouse access layer
//!
//! The inference pipeline only sees the [`DataStore`] trait. Pooling and
//! connection lifecycle belong to the implementation.

pub mod connection;
pub mod warehouse;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use connection::{init_pool, DbPool, MssqlClient, PooledClient};
pub use warehouse::MssqlDataStore;

/// One result row, column name to value
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Read access to the warehouse
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Backend name (e.g., "postgres")
    fn name(&self) -> &'static str;

    /// Names of the queryable views, in catalog order
    async fn list_views(&self) -> Result<Vec<String>>;

    /// Column names and declared types of one view
    async fn describe_view(&self, view: &str) -> Result<Vec<ColumnInfo>>;

    /// Run a statement and return its rows. Callers guard the text first.
    async fn run_query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;
}
