//! Agent Prompts - System prompts for the chat model
//!
//! The evidence transcript from the exploration pipeline is embedded
//! verbatim; without one the model gets the general-assistant prompt.

/// System prompt when no warehouse evidence was gathered
pub const GENERAL_SYSTEM_PROMPT: &str = r#"You are a data assistant with read-only access to the company SQL data warehouse.

You help with questions, explanations, analysis and general conversation.
When the user asks about data, customers, sales, products or other business
metrics, the warehouse is explored automatically and the results are given to
you. This message did not trigger that exploration, so answer conversationally.
Never invent figures."#;

const DATA_PROMPT_HEADER: &str = r#"You are a data assistant with REAL read-only access to the company SQL data warehouse.

The warehouse has already been explored for the latest user message. The
evidence below comes from the live database: the query analysis, the views
that exist, the columns of the most relevant views, and, when a statement
was executed, its row count and sample rows.

Rules:
- If a suggested query was executed, answer with its EXACT results and name
  the view and the SQL that produced them.
- If a query failed or the catalog was unavailable, say so plainly and
  suggest what the user could ask instead.
- If no statement was executed, use the view and column information to
  explain where the answer lives or what to ask next.
- Do not claim you cannot access data, and do not tell the user to write
  the query themselves when results are shown below.

WAREHOUSE EVIDENCE:
"#;

/// Build the system prompt for one chat turn.
pub fn system_prompt(transcript: &str) -> String {
    if transcript.trim().is_empty() {
        return GENERAL_SYSTEM_PROMPT.to_string();
    }
    let mut prompt = String::with_capacity(DATA_PROMPT_HEADER.len() + transcript.len());
    prompt.push_str(DATA_PROMPT_HEADER);
    prompt.push_str(transcript);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transcript_uses_general_prompt() {
        assert_eq!(system_prompt(""), GENERAL_SYSTEM_PROMPT);
        assert_eq!(system_prompt("  \n"), GENERAL_SYSTEM_PROMPT);
    }

    #[test]
    fn test_transcript_embedded_verbatim() {
        let transcript = "QUERY ANALYSIS:\nIntent detected: COUNT\n";
        let prompt = system_prompt(transcript);
        assert!(prompt.starts_with("You are a data assistant with REAL"));
        assert!(prompt.ends_with(transcript));
    }
}
