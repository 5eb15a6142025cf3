//! Exploration Orchestrator
//!
//! Runs the inference pipeline for one chat turn and accumulates an evidence
//! transcript for the language model:
//! 1. Topical gate - purely conversational messages never touch the store
//! 2. View catalog fetch
//! 3. Query analysis
//! 4. Schema probes for up to three candidate views, one at a time
//! 5. At most one synthesized statement, guarded and executed
//!
//! Store failures become lines of evidence; `explore` never returns an error.

use crate::analyzer::{word_pattern, QueryAnalysis, QueryAnalyzer};
use crate::fuzzy_matcher::{find_similar_names, TOPIC_THRESHOLD};
use crate::llm::ChatMessage;
use crate::query_guard::guard;
use crate::sql_synthesizer::CandidateQuery;
use crate::tools::{DataTools, ExecutionResult, SchemaListing};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

const MAX_REFERENCED_PROBES: usize = 3;
const MAX_TOPIC_PROBES: usize = 2;
const MAX_DEFAULT_PROBES: usize = 3;
const SAMPLE_ROWS: usize = 3;

lazy_static! {
    static ref DATA_QUERY_GATE: Regex = word_pattern(
        r"data|databases?|views?|tables?|query|queries|sql|analytics|reports?|show|find|search|count|sum|total|revenues?|sales|customers?|products?"
    );
}

/// Cheap admission filter: does the message look like a data question at all?
pub fn is_data_query(message: &str) -> bool {
    DATA_QUERY_GATE.is_match(message)
}

/// Views worth describing: referenced views first, then a topic-driven guess,
/// then the head of the catalog.
pub fn views_to_probe(analysis: &QueryAnalysis, catalog: &[String]) -> Vec<String> {
    if !analysis.referenced_views.is_empty() {
        return analysis
            .referenced_views
            .iter()
            .take(MAX_REFERENCED_PROBES)
            .cloned()
            .collect();
    }

    let topics = analysis.topics;
    let topic_term = if topics.customer {
        Some("customer")
    } else if topics.product {
        Some("product")
    } else if topics.sales {
        Some("sales")
    } else {
        None
    };

    if let Some(term) = topic_term {
        let matches = find_similar_names(term, catalog, TOPIC_THRESHOLD);
        if !matches.is_empty() {
            return matches.into_iter().take(MAX_TOPIC_PROBES).collect();
        }
        debug!("No views resemble topic keyword {}", term);
    }

    catalog.iter().take(MAX_DEFAULT_PROBES).cloned().collect()
}

/// Human-readable evidence accumulated during one exploration
#[derive(Debug, Default)]
pub struct EvidenceTranscript {
    text: String,
}

impl EvidenceTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    fn section(&mut self, title: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.line(title);
    }

    fn record_analysis(&mut self, message: &str, analysis: &QueryAnalysis) {
        self.section("QUERY ANALYSIS:");
        self.line(format!("User Message: \"{}\"", message));

        let intents: Vec<&str> = analysis.intents.iter().map(|i| i.as_str()).collect();
        if intents.is_empty() {
            self.line("Intent detected: General inquiry");
        } else {
            self.line(format!("Intent detected: {}", intents.join(", ")));
        }

        if analysis.referenced_views.is_empty() {
            self.line("No specific views mentioned - will use contextual matching");
        } else {
            self.line(format!(
                "Relevant views found: {}",
                analysis.referenced_views.join(", ")
            ));
        }

        let context = analysis.topics.labels();
        if !context.is_empty() {
            self.line(format!("Context: {}", context.join(", ")));
        }
    }

    fn record_catalog(&mut self, catalog: &[String]) {
        self.section("AVAILABLE VIEWS:");
        if catalog.is_empty() {
            self.line("(none)");
        } else {
            self.line(catalog.join(", "));
        }
    }

    fn record_schema(&mut self, listing: &SchemaListing) {
        if !listing.success {
            self.line(format!(
                "Schema unavailable for {}: {}",
                listing.view,
                listing.error.as_deref().unwrap_or("unknown error")
            ));
            return;
        }
        self.section(&format!("VIEW: {}", listing.view));
        if listing.schema.is_empty() {
            self.line("Columns: None");
        } else {
            let columns: Vec<String> = listing
                .schema
                .iter()
                .map(|c| format!("{} ({})", c.column_name, c.data_type))
                .collect();
            self.line(format!("Columns: {}", columns.join(", ")));
        }
    }

    fn record_execution(&mut self, result: &ExecutionResult) {
        if !result.success {
            self.line(format!(
                "Query failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ));
            return;
        }
        self.line(format!("Query Results: {} rows returned", result.row_count));
        if !result.data.is_empty() {
            let sample = &result.data[..result.data.len().min(SAMPLE_ROWS)];
            let json = serde_json::to_string_pretty(sample).unwrap_or_else(|_| "[]".to_string());
            self.line(format!("Sample Results: {}", json));
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

pub struct Explorer {
    tools: DataTools,
    analyzer: QueryAnalyzer,
}

impl Explorer {
    pub fn new(tools: DataTools) -> Self {
        Self {
            tools,
            analyzer: QueryAnalyzer::new(),
        }
    }

    pub fn tools(&self) -> &DataTools {
        &self.tools
    }

    /// Explore on behalf of the latest message in a conversation.
    pub async fn explore_conversation(&self, messages: &[ChatMessage]) -> String {
        match messages.last() {
            Some(last) => self.explore(&last.content).await,
            None => String::new(),
        }
    }

    /// Build the evidence transcript for one message. Empty when the message
    /// is not a data question.
    pub async fn explore(&self, message: &str) -> String {
        if !is_data_query(message) {
            debug!("Message is conversational, skipping warehouse exploration");
            return String::new();
        }
        info!("🔍 Data question detected, exploring warehouse");

        let mut transcript = EvidenceTranscript::new();

        let listing = self.tools.list_views().await;
        if !listing.success {
            warn!("Continuing without a view catalog");
            transcript.line(format!(
                "Catalog unavailable: {}",
                listing.error.as_deref().unwrap_or("unknown error")
            ));
        }
        let catalog = listing.views;

        let analysis = self.analyzer.analyze(message, &catalog);
        info!(
            "🧠 Query analysis: intents={:?} views={:?}",
            analysis.intents, analysis.referenced_views
        );
        transcript.record_analysis(message, &analysis);
        if listing.success {
            transcript.record_catalog(&catalog);
        }

        for view in views_to_probe(&analysis, &catalog) {
            let schema = self.tools.describe_view(&view).await;
            transcript.record_schema(&schema);
        }

        if let Some(candidate) = CandidateQuery::infer(&analysis) {
            transcript.section("EXECUTING SUGGESTED QUERY:");
            transcript.line(&candidate.sql);
            match guard(&candidate.sql) {
                Ok(()) => {
                    let result = self.tools.run_query(&candidate.sql).await;
                    transcript.record_execution(&result);
                }
                Err(e) => {
                    warn!("Suggested query rejected: {}", e);
                    transcript.line(format!("Query rejected: {}", e));
                }
            }
        }

        transcript.into_string()
    }
}
