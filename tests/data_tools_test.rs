mod common;

use common::{tools_over, MockStore};
use std::sync::Arc;
use warehouse_chat::error::AgentError;
use warehouse_chat::tools::{ToolRequest, ToolResponse};

fn request(json: &str) -> ToolRequest {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_list_views_action() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    let response = tools.dispatch(&request(r#"{"action":"listViews"}"#)).await.unwrap();
    assert!(response.success());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["views"][0], "CustomerSummary");
    assert_eq!(json["message"], "Found 4 views available for querying.");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_describe_view_action() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    let response = tools
        .dispatch(&request(r#"{"action":"describeView","tableName":"SalesByMonth"}"#))
        .await
        .unwrap();
    match response {
        ToolResponse::Schema(listing) => {
            assert!(listing.success);
            assert_eq!(listing.schema.len(), 2);
            assert_eq!(listing.schema[1].column_name, "Revenue");
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_parameters_and_unknown_action() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    for body in [
        r#"{"action":"describeView"}"#,
        r#"{"action":"sampleData","tableName":"  "}"#,
        r#"{"action":"query"}"#,
        r#"{"action":"dropEverything"}"#,
    ] {
        let result = tools.dispatch(&request(body)).await;
        assert!(matches!(result, Err(AgentError::InvalidRequest(_))), "{}", body);
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_non_select_statement_is_rejected_before_the_store() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    let result = tools.run_query("DELETE FROM CustomerSummary").await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Only SELECT queries are allowed"));
    assert!(store.executed().is_empty());
}

#[tokio::test]
async fn test_chained_drop_is_rejected_before_the_store() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    let response = tools
        .dispatch(&request(
            r#"{"action":"query","query":"SELECT * FROM Regions; DROP TABLE Regions"}"#,
        ))
        .await
        .unwrap();
    assert!(!response.success());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json["error"],
        "Operation not allowed: DROP. This interface is read-only."
    );
    assert_eq!(json["rowCount"], 0);
    assert!(store.executed().is_empty());
}

#[tokio::test]
async fn test_query_action_returns_rows() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    let result = tools.run_query("  SELECT * FROM SalesByMonth  ").await;
    assert!(result.success);
    assert_eq!(result.sql, "SELECT * FROM SalesByMonth");
    assert_eq!(result.row_count, 4);
    assert_eq!(result.data[0]["Revenue"], 1200.5);
}

#[tokio::test]
async fn test_sample_data_uses_top_five() {
    let store = Arc::new(MockStore::warehouse());
    let tools = tools_over(&store);

    let response = tools
        .dispatch(&request(r#"{"action":"sampleData","tableName":"Regions"}"#))
        .await
        .unwrap();
    match response {
        ToolResponse::Rows(result) => {
            assert!(result.success);
            assert_eq!(result.sql, "SELECT TOP 5 * FROM Regions");
            assert_eq!(result.row_count, 1);
            assert_eq!(result.data[0]["Name"], "North");
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert_eq!(store.executed(), vec!["SELECT TOP 5 * FROM Regions"]);
}

#[tokio::test]
async fn test_store_error_becomes_failed_result() {
    let store = Arc::new(MockStore::warehouse().with_broken_view("Regions"));
    let tools = tools_over(&store);

    let result = tools.run_query("SELECT * FROM Regions").await;
    assert!(!result.success);
    assert_eq!(result.row_count, 0);
    assert!(result.error.unwrap().contains("invalid object name"));
}

#[tokio::test]
async fn test_unreachable_store_reports_failure() {
    let store = Arc::new(MockStore::unreachable());
    let tools = tools_over(&store);

    let listing = tools.list_views().await;
    assert!(!listing.success);
    assert!(listing.views.is_empty());
    assert!(listing.error.is_some());

    let schema = tools.describe_view("Regions").await;
    assert!(!schema.success);
    assert_eq!(schema.view, "Regions");
}
