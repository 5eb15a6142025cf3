//! Data tools
//!
//! Request boundary in front of the warehouse. Every call comes back as a
//! response object with a success flag; store failures are never raised.
//! Statements pass two independent checks here: a SELECT prefix test and
//! the forbidden-keyword guard.

use crate::db::{ColumnInfo, DataStore, Row};
use crate::error::{AgentError, Result};
use crate::query_guard::{ensure_select, guard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewListing {
    pub success: bool,
    pub views: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaListing {
    pub success: bool,
    pub view: String,
    pub schema: Vec<ColumnInfo>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of running one statement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub sql: String,
    pub data: Vec<Row>,
    pub row_count: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    fn failed(sql: &str, error: &AgentError) -> Self {
        Self {
            success: false,
            sql: sql.to_string(),
            data: Vec::new(),
            row_count: 0,
            message: "I encountered an error while querying the database.".to_string(),
            error: Some(error.to_string()),
        }
    }
}

/// Body of a data-tool request, e.g. `{"action":"describeView","tableName":"Orders"}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRequest {
    pub action: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Views(ViewListing),
    Schema(SchemaListing),
    Rows(ExecutionResult),
}

impl ToolResponse {
    pub fn success(&self) -> bool {
        match self {
            ToolResponse::Views(r) => r.success,
            ToolResponse::Schema(r) => r.success,
            ToolResponse::Rows(r) => r.success,
        }
    }
}

pub const ACTIONS: [&str; 4] = ["query", "listViews", "describeView", "sampleData"];

#[derive(Clone)]
pub struct DataTools {
    store: Arc<dyn DataStore>,
}

impl DataTools {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub async fn list_views(&self) -> ViewListing {
        match self.store.list_views().await {
            Ok(views) => ViewListing {
                success: true,
                message: format!("Found {} views available for querying.", views.len()),
                views,
                error: None,
            },
            Err(e) => {
                warn!("Listing views failed: {}", e);
                ViewListing {
                    success: false,
                    views: Vec::new(),
                    message: "Could not list views.".to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn describe_view(&self, view: &str) -> SchemaListing {
        match self.store.describe_view(view).await {
            Ok(schema) => SchemaListing {
                success: true,
                view: view.to_string(),
                message: format!("Found {} columns in view {}.", schema.len(), view),
                schema,
                error: None,
            },
            Err(e) => {
                warn!("Describing view {} failed: {}", view, e);
                SchemaListing {
                    success: false,
                    view: view.to_string(),
                    schema: Vec::new(),
                    message: format!("Could not describe view {}.", view),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn run_query(&self, sql: &str) -> ExecutionResult {
        let sql = sql.trim();
        match self.checked_run(sql).await {
            Ok(data) => {
                let row_count = data.len();
                info!("Query completed, {} rows returned", row_count);
                ExecutionResult {
                    success: true,
                    sql: sql.to_string(),
                    data,
                    row_count,
                    message: format!("Query executed successfully. {} rows returned.", row_count),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Query failed: {} ({})", e, sql);
                ExecutionResult::failed(sql, &e)
            }
        }
    }

    pub async fn sample_data(&self, view: &str) -> ExecutionResult {
        self.run_query(&format!("SELECT TOP 5 * FROM {}", view)).await
    }

    async fn checked_run(&self, sql: &str) -> Result<Vec<Row>> {
        ensure_select(sql)?;
        guard(sql)?;
        info!("Executing query: {}", sql);
        self.store.run_query(sql).await
    }

    /// Route a request body onto one of the actions.
    pub async fn dispatch(&self, request: &ToolRequest) -> Result<ToolResponse> {
        match request.action.as_str() {
            "query" => {
                let sql = required(&request.query, "Query is required")?;
                Ok(ToolResponse::Rows(self.run_query(sql).await))
            }
            "listViews" => Ok(ToolResponse::Views(self.list_views().await)),
            "describeView" => {
                let view = required(&request.table_name, "View name is required")?;
                Ok(ToolResponse::Schema(self.describe_view(view).await))
            }
            "sampleData" => {
                let view = required(&request.table_name, "View name is required")?;
                Ok(ToolResponse::Rows(self.sample_data(view).await))
            }
            other => Err(AgentError::InvalidRequest(format!("Invalid action: {}", other))),
        }
    }
}

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AgentError::InvalidRequest(message.to_string()))
}
