//! SQL Server-backed warehouse store

use super::{ColumnInfo, DataStore, DbPool, Row};
use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tiberius::{ColumnData, FromSql, Query};
use tracing::{debug, info};

const LIST_VIEWS_SQL: &str = r#"
    SELECT v.name
    FROM sys.views v
    INNER JOIN sys.schemas s ON v.schema_id = s.schema_id
    WHERE s.name = @P1
    ORDER BY v.name
"#;

const DESCRIBE_VIEW_SQL: &str = r#"
    SELECT COLUMN_NAME, DATA_TYPE
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_NAME = @P1
    AND TABLE_SCHEMA = @P2
    ORDER BY ORDINAL_POSITION
"#;

pub struct MssqlDataStore {
    pool: DbPool,
    schema: String,
}

impl MssqlDataStore {
    pub fn new(pool: DbPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Lazily connected store for the configured warehouse
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = super::init_pool(config)?;
        Ok(Self::new(pool, config.schema.clone()))
    }

    /// Run a parameterized statement and return its first result set.
    async fn fetch(&self, sql: &str, params: &[&str]) -> Result<Vec<tiberius::Row>> {
        let mut conn = self.pool.acquire().await?;
        let mut query = Query::new(sql);
        for param in params {
            query.bind(param.to_string());
        }
        let rows = query.query(&mut conn.client).await?.into_first_result().await?;
        self.pool.release(conn);
        Ok(rows)
    }
}

#[async_trait]
impl DataStore for MssqlDataStore {
    fn name(&self) -> &'static str {
        "mssql"
    }

    async fn list_views(&self) -> Result<Vec<String>> {
        let rows = self.fetch(LIST_VIEWS_SQL, &[self.schema.as_str()]).await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(name) = row.try_get::<&str, _>(0)? {
                views.push(name.to_string());
            }
        }

        info!("Retrieved {} views from schema {}", views.len(), self.schema);
        Ok(views)
    }

    async fn describe_view(&self, view: &str) -> Result<Vec<ColumnInfo>> {
        let rows = self.fetch(DESCRIBE_VIEW_SQL, &[view, self.schema.as_str()]).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = row.try_get::<&str, _>(0)?.unwrap_or_default();
            let data_type = row.try_get::<&str, _>(1)?.unwrap_or_default();
            columns.push(ColumnInfo::new(name, data_type));
        }

        debug!("View {} has {} columns", view, columns.len());
        Ok(columns)
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Row>> {
        let mut conn = self.pool.acquire().await?;
        let rows = conn.client.simple_query(sql).await?.into_first_result().await?;
        self.pool.release(conn);

        rows.iter()
            .map(|row| {
                let mut out = Row::new();
                for (column, data) in row.cells() {
                    out.insert(column.name().to_string(), cell_to_json(data)?);
                }
                Ok(out)
            })
            .collect()
    }

    async fn health_check(&self) -> Result<bool> {
        let rows = self.fetch("SELECT 1", &[]).await?;
        let one = match rows.first() {
            Some(row) => row.try_get::<i32, _>(0)?,
            None => None,
        };
        Ok(one == Some(1))
    }
}

/// Convert one SQL Server cell into JSON. Temporal values become ISO-8601
/// strings, binary becomes a byte array, NULL becomes `null`.
fn cell_to_json(data: &ColumnData<'static>) -> Result<Value> {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.map(|f| Value::from(f as f64)),
        ColumnData::F64(v) => v.map(Value::from),
        ColumnData::Bit(v) => v.map(Value::from),
        ColumnData::String(v) => v.as_ref().map(|s| Value::from(s.as_ref())),
        ColumnData::Guid(v) => v.map(|g| Value::from(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| Value::from(b.to_vec())),
        ColumnData::Numeric(v) => v
            .as_ref()
            .and_then(|n| n.to_string().parse::<f64>().ok())
            .map(Value::from),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(|d| Value::from(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.map(|d| Value::from(d.to_string())),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|t| Value::from(t.to_string())),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<FixedOffset>::from_sql(data)?.map(|d| Value::from(d.to_rfc3339()))
        }
        other => {
            debug!("Unsupported column value {:?}, returning null", other);
            None
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
