use std::cmp::Ordering;
use strsim::normalized_levenshtein;

/// Threshold used when disambiguating an explicit mention
pub const STRICT_THRESHOLD: f64 = 0.4;
/// Threshold used when guessing a view from a topic keyword
pub const TOPIC_THRESHOLD: f64 = 0.5;
/// Threshold used for per-token fallback matching
pub const TOKEN_THRESHOLD: f64 = 0.6;

/// Fuzzy matcher for view names
///
/// Scores whole strings with normalized Levenshtein distance. The threshold
/// is a distance cutoff in [0, 1]: smaller values are stricter.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    pub threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            threshold: STRICT_THRESHOLD,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Edit distance between two names, case-insensitive, normalized by the
    /// longer name. 0.0 = identical, 1.0 = nothing in common.
    pub fn distance(&self, a: &str, b: &str) -> f64 {
        1.0 - normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
    }

    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.distance(a, b) <= self.threshold
    }

    /// Catalog entries that clear the threshold, best match first.
    /// Ties keep catalog order.
    pub fn find_similar<'a>(&self, term: &str, catalog: &'a [String]) -> Vec<&'a str> {
        if term.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(&str, f64)> = catalog
            .iter()
            .map(|name| (name.as_str(), self.distance(term, name)))
            .filter(|(_, distance)| *distance <= self.threshold)
            .collect();

        // stable sort keeps catalog order among equal distances
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.into_iter().map(|(name, _)| name).collect()
    }
}

/// Convenience wrapper: ranked view names similar to `term`.
pub fn find_similar_names(term: &str, catalog: &[String], threshold: f64) -> Vec<String> {
    FuzzyMatcher::new(threshold)
        .find_similar(term, catalog)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        vec!["CustomerSummary".to_string(), "SalesByMonth".to_string()]
    }

    #[test]
    fn test_plural_token_matches_view() {
        let matches = find_similar_names("customers", &catalog(), TOKEN_THRESHOLD);
        assert_eq!(matches, vec!["CustomerSummary"]);
    }

    #[test]
    fn test_topic_keyword_matches_view() {
        let matches = find_similar_names("customer", &catalog(), TOPIC_THRESHOLD);
        assert_eq!(matches, vec!["CustomerSummary"]);
    }

    #[test]
    fn test_unrelated_word_no_match() {
        assert!(find_similar_names("many", &catalog(), TOKEN_THRESHOLD).is_empty());
        assert!(find_similar_names("have", &catalog(), TOKEN_THRESHOLD).is_empty());
    }

    #[test]
    fn test_stricter_threshold_excludes_more() {
        // distance 0.4 between "customers" and "customersummary"
        assert!(find_similar_names("customers", &catalog(), 0.3).is_empty());
        assert_eq!(find_similar_names("customers", &catalog(), 0.4), vec!["CustomerSummary"]);
    }

    #[test]
    fn test_ranked_best_first() {
        let views = vec![
            "OrderLines".to_string(),
            "Orders".to_string(),
            "OrdersArchive".to_string(),
        ];
        let matches = find_similar_names("orders", &views, 0.6);
        assert_eq!(matches[0], "Orders");
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = FuzzyMatcher::default();
        assert_eq!(matcher.distance("SALESBYMONTH", "salesbymonth"), 0.0);
        assert!(matcher.is_match("SalesByMonth", "salesbymonth"));
    }

    #[test]
    fn test_distance_normalized_by_longer_name() {
        let matcher = FuzzyMatcher::default();
        // six edits over fifteen characters
        assert_eq!(matcher.distance("customers", "CustomerSummary"), 0.4);
        assert_eq!(matcher.distance("", ""), 0.0);
        assert_eq!(matcher.distance("abc", ""), 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(find_similar_names("", &catalog(), 1.0).is_empty());
        assert!(find_similar_names("customers", &[], 1.0).is_empty());
    }
}
