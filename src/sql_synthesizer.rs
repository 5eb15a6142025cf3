//! SQL Synthesizer
//!
//! Builds a single candidate statement from a completed analysis. Only
//! COUNT, SELECT and TOP have a rule; the other intents are left to the
//! language model to answer narratively.

use crate::analyzer::{QueryAnalysis, QueryIntent};
use serde::{Deserialize, Serialize};

/// Intents with a synthesis rule, in priority order
pub const SYNTHESIS_PRIORITY: [QueryIntent; 3] =
    [QueryIntent::Count, QueryIntent::Select, QueryIntent::Top];

/// A heuristically synthesized statement awaiting the read-only guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub view: String,
    pub intent: QueryIntent,
    pub sql: String,
}

impl CandidateQuery {
    /// Candidate for the primary view using the highest-priority intent.
    /// `None` unless the analysis has both a view and a synthesizable intent.
    pub fn infer(analysis: &QueryAnalysis) -> Option<Self> {
        let view = analysis.primary_view()?;
        let intent = SYNTHESIS_PRIORITY
            .iter()
            .copied()
            .find(|intent| analysis.has_intent(*intent))?;
        let sql = synthesize(view, intent)?;
        Some(Self {
            view: view.to_string(),
            intent,
            sql,
        })
    }
}

/// The view name is interpolated verbatim. It must come from the catalog,
/// never from raw user text.
pub fn synthesize(view: &str, intent: QueryIntent) -> Option<String> {
    match intent {
        QueryIntent::Count => Some(format!("SELECT COUNT(*) AS Total_Count FROM {}", view)),
        QueryIntent::Select => Some(format!("SELECT * FROM {}", view)),
        QueryIntent::Top => Some(format!("SELECT TOP 10 * FROM {}", view)),
        QueryIntent::Sum | QueryIntent::Average | QueryIntent::Recent => None,
    }
}
