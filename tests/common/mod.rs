//! In-memory warehouse shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warehouse_chat::db::{ColumnInfo, DataStore, Row};
use warehouse_chat::error::{AgentError, Result};
use warehouse_chat::tools::DataTools;

#[derive(Default)]
pub struct MockStore {
    views: Vec<String>,
    schemas: HashMap<String, Vec<ColumnInfo>>,
    results: HashMap<String, Vec<Row>>,
    unreachable: bool,
    broken_schemas: HashSet<String>,
    broken_views: HashSet<String>,
    calls: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl MockStore {
    /// The warehouse used throughout the chat scenarios
    pub fn warehouse() -> Self {
        let mut store = Self {
            views: ["CustomerSummary", "SalesByMonth", "ProductCatalog", "Regions"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            ..Default::default()
        };
        store.schemas.insert(
            "CustomerSummary".to_string(),
            vec![
                ColumnInfo::new("CustomerId", "int"),
                ColumnInfo::new("Name", "nvarchar"),
                ColumnInfo::new("LastUpdated", "datetime"),
            ],
        );
        store.schemas.insert(
            "SalesByMonth".to_string(),
            vec![ColumnInfo::new("Month", "date"), ColumnInfo::new("Revenue", "decimal")],
        );
        store.results.insert(
            "SELECT COUNT(*) AS Total_Count FROM CustomerSummary".to_string(),
            vec![row(serde_json::json!({ "Total_Count": 1523 }))],
        );
        store.results.insert(
            "SELECT TOP 10 * FROM ProductCatalog".to_string(),
            vec![
                row(serde_json::json!({ "ProductId": 7, "Name": "Espresso Machine" })),
                row(serde_json::json!({ "ProductId": 9, "Name": "Grinder" })),
            ],
        );
        store.results.insert(
            "SELECT TOP 5 * FROM Regions".to_string(),
            vec![row(serde_json::json!({ "RegionId": 1, "Name": "North" }))],
        );
        store.results.insert(
            "SELECT * FROM SalesByMonth".to_string(),
            vec![
                row(serde_json::json!({ "Month": "2024-01-01", "Revenue": 1200.5 })),
                row(serde_json::json!({ "Month": "2024-02-01", "Revenue": 980.0 })),
                row(serde_json::json!({ "Month": "2024-03-01", "Revenue": 1410.25 })),
                row(serde_json::json!({ "Month": "2024-04-01", "Revenue": 1105.0 })),
            ],
        );
        store
    }

    /// Every call fails as if the database could not be reached
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    /// Describing `view` fails; everything else works
    pub fn with_broken_schema(mut self, view: &str) -> Self {
        self.broken_schemas.insert(view.to_string());
        self
    }

    /// Statements reading from `view` fail; describing it still works
    pub fn with_broken_view(mut self, view: &str) -> Self {
        self.broken_views.insert(view.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn touch(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(AgentError::StoreUnavailable(
                "no connection available after 30s".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_views(&self) -> Result<Vec<String>> {
        self.touch()?;
        Ok(self.views.clone())
    }

    async fn describe_view(&self, view: &str) -> Result<Vec<ColumnInfo>> {
        self.touch()?;
        if self.broken_schemas.contains(view) {
            return Err(AgentError::InvalidRequest(format!("permission denied on {}", view)));
        }
        Ok(self.schemas.get(view).cloned().unwrap_or_default())
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.touch()?;
        if self
            .broken_views
            .iter()
            .any(|view| sql.ends_with(&format!("FROM {}", view)))
        {
            return Err(AgentError::InvalidRequest(format!("invalid object name in: {}", sql)));
        }
        Ok(self.results.get(sql).cloned().unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool> {
        self.touch()?;
        Ok(true)
    }
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

pub fn tools_over(store: &Arc<MockStore>) -> DataTools {
    DataTools::new(Arc::clone(store) as Arc<dyn DataStore>)
}
