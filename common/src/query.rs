use serde::Serialize;

pub const DEFAULT_TERM: &str = "python";
pub const DEFAULT_LOCATION: &str = "UK";
pub const DEFAULT_MAX_RESULTS: usize = 50;
pub const MIN_MAX_RESULTS: usize = 1;
pub const MAX_MAX_RESULTS: usize = 500;

/// A validated search request. Construction never fails: blank inputs fall
/// back to the defaults and `max_results` is clamped into `[1, 500]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    term: String,
    location: String,
    max_results: usize,
}

impl SearchQuery {
    pub fn build(term: Option<&str>, location: Option<&str>, max_results: Option<i64>) -> Self {
        Self {
            term: non_blank(term).unwrap_or(DEFAULT_TERM).to_string(),
            location: non_blank(location).unwrap_or(DEFAULT_LOCATION).to_string(),
            max_results: max_results.map_or(DEFAULT_MAX_RESULTS, clamp_max_results),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::build(None, None, None)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn clamp_max_results(requested: i64) -> usize {
    requested.clamp(MIN_MAX_RESULTS as i64, MAX_MAX_RESULTS as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_inputs_uses_defaults() {
        let query = SearchQuery::build(None, None, None);
        assert_eq!(query.term(), "python");
        assert_eq!(query.location(), "UK");
        assert_eq!(query.max_results(), 50);
        assert_eq!(query, SearchQuery::default());
    }

    #[test]
    fn test_build_replaces_blank_strings() {
        let query = SearchQuery::build(Some(""), Some("   "), Some(20));
        assert_eq!(query.term(), "python");
        assert_eq!(query.location(), "UK");
        assert_eq!(query.max_results(), 20);
    }

    #[test]
    fn test_build_trims_inputs() {
        let query = SearchQuery::build(Some("  rust "), Some(" London"), None);
        assert_eq!(query.term(), "rust");
        assert_eq!(query.location(), "London");
    }

    #[test]
    fn test_build_clamps_max_results() {
        assert_eq!(SearchQuery::build(None, None, Some(0)).max_results(), 1);
        assert_eq!(SearchQuery::build(None, None, Some(-7)).max_results(), 1);
        assert_eq!(SearchQuery::build(None, None, Some(501)).max_results(), 500);
        assert_eq!(SearchQuery::build(None, None, Some(i64::MAX)).max_results(), 500);
        assert_eq!(SearchQuery::build(None, None, Some(500)).max_results(), 500);
        assert_eq!(SearchQuery::build(None, None, Some(1)).max_results(), 1);
    }
}
