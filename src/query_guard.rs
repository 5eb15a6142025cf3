//! Query Guards
//!
//! Read-only enforcement for every statement that reaches the warehouse.

use crate::error::{AgentError, Result};

/// Keywords that mark a statement as mutating. Checked in this order.
pub const FORBIDDEN_KEYWORDS: [&str; 9] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
];

/// Reject any statement containing a forbidden keyword.
///
/// This is a plain substring test on the uppercased text, not a tokenizer:
/// a keyword inside a string literal or identifier is also rejected.
pub fn guard(sql: &str) -> Result<()> {
    let upper = sql.to_uppercase();
    match FORBIDDEN_KEYWORDS.iter().find(|kw| upper.contains(*kw)) {
        Some(keyword) => Err(AgentError::ForbiddenKeyword(keyword)),
        None => Ok(()),
    }
}

/// Request-boundary check: the trimmed statement must start with SELECT.
pub fn ensure_select(sql: &str) -> Result<()> {
    if sql.trim().to_uppercase().starts_with("SELECT") {
        Ok(())
    } else {
        Err(AgentError::NotSelect)
    }
}
