//! Shared data model for the job search pipeline.
//!
//! `JobRecord` is the canonical, fully-defaulted listing every other crate
//! works with; `SearchQuery` is the validated request it was fetched for.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod query;

pub use query::SearchQuery;

/// Placeholder shown for any text field the provider left out.
pub const NOT_AVAILABLE: &str = "N/A";

/// One job listing after normalization. Value object: two records are the
/// same job exactly when every field matches.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub posted_date: NaiveDate,
    pub title: String,
    pub company: String,
    pub location: String,
    pub contract_type: String,
    pub salary_display: String,
    /// Empty, or an absolute http(s) URL.
    pub url: String,
}

impl JobRecord {
    /// The listing link, parsed and checked for an "open in browser" action.
    /// Returns `None` for empty or non-http(s) values.
    pub fn link(&self) -> Option<Url> {
        parse_http_url(&self.url)
    }
}

/// Parses `raw` as an absolute URL with an `http` or `https` scheme.
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Some(url),
        _ => None,
    }
}
