//! Query Analyzer
//!
//! Turns a free-text chat message plus the live view catalog into a
//! [`QueryAnalysis`]: which views the message is probably about, what kind of
//! aggregation or selection it asks for, and which business topics it touches.
//!
//! Intent and topic detection are fixed tables of (pattern, tag) pairs
//! evaluated in order. Adding a rule means adding a row, not touching the
//! control flow.

use crate::fuzzy_matcher::{FuzzyMatcher, TOKEN_THRESHOLD};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Tokens this short or shorter never take part in fuzzy matching
const MIN_TOKEN_LEN: usize = 3;
/// Fuzzy matches kept per message token
const MATCHES_PER_TOKEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryIntent {
    Count,
    Sum,
    Average,
    Select,
    Top,
    Recent,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Count => "COUNT",
            QueryIntent::Sum => "SUM",
            QueryIntent::Average => "AVERAGE",
            QueryIntent::Select => "SELECT",
            QueryIntent::Top => "TOP",
            QueryIntent::Recent => "RECENT",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Customer,
    Product,
    Sales,
    Time,
}

/// Topical keyword flags, used only to steer fallback view selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFlags {
    pub customer: bool,
    pub product: bool,
    pub sales: bool,
    pub time: bool,
}

impl TopicFlags {
    fn set(&mut self, topic: Topic) {
        match topic {
            Topic::Customer => self.customer = true,
            Topic::Product => self.product = true,
            Topic::Sales => self.sales = true,
            Topic::Time => self.time = true,
        }
    }

    /// Human-readable labels for the flags that are set
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.customer {
            labels.push("Customer data");
        }
        if self.product {
            labels.push("Product data");
        }
        if self.sales {
            labels.push("Sales data");
        }
        if self.time {
            labels.push("Time-based analysis");
        }
        labels
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Views believed relevant, deduplicated, always drawn from the catalog
    pub referenced_views: Vec<String>,
    /// Detected intents in table order, duplicate-free
    pub intents: Vec<QueryIntent>,
    pub topics: TopicFlags,
    /// Whether the referenced views came from the fuzzy fallback
    #[serde(skip)]
    pub used_fuzzy_fallback: bool,
}

impl QueryAnalysis {
    pub fn primary_view(&self) -> Option<&str> {
        self.referenced_views.first().map(String::as_str)
    }

    pub fn has_intent(&self, intent: QueryIntent) -> bool {
        self.intents.contains(&intent)
    }
}

lazy_static! {
    static ref INTENT_PATTERNS: Vec<(Regex, QueryIntent)> = vec![
        (word_pattern(r"how many|count|total number|number of"), QueryIntent::Count),
        (word_pattern(r"sum|total|add up"), QueryIntent::Sum),
        (word_pattern(r"average|avg|mean"), QueryIntent::Average),
        (word_pattern(r"show|list|display|get|find|do it|execute|run"), QueryIntent::Select),
        (word_pattern(r"top|first|best|highest|largest"), QueryIntent::Top),
        (word_pattern(r"recent|latest|newest|last"), QueryIntent::Recent),
    ];

    static ref TOPIC_PATTERNS: Vec<(Regex, Topic)> = vec![
        (word_pattern(r"customers?|clients?|buyers?|users?"), Topic::Customer),
        (word_pattern(r"products?|items?|goods|inventory|inventories"), Topic::Product),
        (word_pattern(r"sales|revenues?|orders?|purchases?|transactions?"), Topic::Sales),
        (word_pattern(r"today|yesterday|weeks?|months?|years?|daily|monthly|yearly"), Topic::Time),
    ];

    static ref NON_WORD: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// Case-insensitive, word-bounded alternation.
pub(crate) fn word_pattern(alternatives: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).unwrap()
}

pub struct QueryAnalyzer {
    matcher: FuzzyMatcher,
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self {
            matcher: FuzzyMatcher::new(TOKEN_THRESHOLD),
        }
    }
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, message: &str, catalog: &[String]) -> QueryAnalysis {
        let lower = message.to_lowercase();

        let mut views = literal_matches(&lower, catalog);
        let used_fuzzy_fallback = views.is_empty();
        if used_fuzzy_fallback {
            views = self.fuzzy_matches(&lower, catalog);
        }

        let referenced_views: Vec<String> = views.into_iter().unique().map(str::to_string).collect();
        let intents = detect_intents(message);
        let topics = detect_topics(message);

        debug!(
            "Query analysis: views={:?} intents={:?} topics={:?} fuzzy={}",
            referenced_views, intents, topics, used_fuzzy_fallback
        );

        QueryAnalysis {
            referenced_views,
            intents,
            topics,
            used_fuzzy_fallback,
        }
    }

    fn fuzzy_matches<'a>(&self, lower_message: &str, catalog: &'a [String]) -> Vec<&'a str> {
        let mut found = Vec::new();
        for token in lower_message.split_whitespace() {
            let clean = clean_token(token);
            if clean.chars().count() <= MIN_TOKEN_LEN {
                continue;
            }
            found.extend(
                self.matcher
                    .find_similar(&clean, catalog)
                    .into_iter()
                    .take(MATCHES_PER_TOKEN),
            );
        }
        found
    }
}

/// Analyze with the default matcher.
pub fn analyze(message: &str, catalog: &[String]) -> QueryAnalysis {
    QueryAnalyzer::new().analyze(message, catalog)
}

/// Catalog entries whose name appears anywhere in the message.
/// No word-boundary check: short names can hit inside unrelated words.
fn literal_matches<'a>(lower_message: &str, catalog: &'a [String]) -> Vec<&'a str> {
    catalog
        .iter()
        .filter(|view| !view.is_empty() && lower_message.contains(&view.to_lowercase()))
        .map(String::as_str)
        .collect()
}

fn clean_token(token: &str) -> String {
    NON_WORD.replace_all(token, "").into_owned()
}

pub fn detect_intents(message: &str) -> Vec<QueryIntent> {
    INTENT_PATTERNS
        .iter()
        .filter(|(pattern, _)| pattern.is_match(message))
        .map(|(_, intent)| *intent)
        .collect()
}

pub fn detect_topics(message: &str) -> TopicFlags {
    let mut flags = TopicFlags::default();
    for (pattern, topic) in TOPIC_PATTERNS.iter() {
        if pattern.is_match(message) {
            flags.set(*topic);
        }
    }
    flags
}
