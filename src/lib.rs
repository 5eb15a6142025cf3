pub mod agent_prompts;
pub mod analyzer;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod explorer;
pub mod fuzzy_matcher;
pub mod llm;
pub mod query_guard;
pub mod sql_synthesizer;
pub mod tools;

pub use analyzer::{analyze, QueryAnalysis, QueryIntent, TopicFlags};
pub use error::{AgentError, Result};
pub use explorer::{is_data_query, Explorer};
pub use fuzzy_matcher::find_similar_names;
pub use query_guard::guard;
pub use sql_synthesizer::{synthesize, CandidateQuery};
