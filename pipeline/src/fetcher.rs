//! Provider search calls.
//!
//! One blocking `GET {base}/{country}/search/1` per invocation. Only the
//! first page is ever requested and nothing is retried.

use crate::config::{Credentials, FetcherConfig};
use common::SearchQuery;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

/// Provider-shaped listing, consumed by the normalizer.
pub type RawJobPayload = Value;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid provider endpoint {url:?}: {source}")]
    Endpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request URL carries the API key, so it is stripped before wrapping.
    #[error("request to provider failed: {0}")]
    Transport(reqwest::Error),

    #[error("provider responded with HTTP {0}")]
    Status(StatusCode),

    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Response body of the search endpoint. Anything else the provider sends is ignored.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    results: Vec<RawJobPayload>,
}

pub struct Fetcher {
    client: Client,
    endpoint: Url,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.without_url())
    }
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let raw = format!(
            "{}/{}/search/1",
            config.base_url.trim_end_matches('/'),
            config.country
        );
        let endpoint = Url::parse(&raw).map_err(|source| FetchError::Endpoint {
            url: raw.clone(),
            source,
        })?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Listings on the first result page. An empty `results` array (or none
    /// at all) is a successful, empty fetch.
    pub fn fetch(
        &self,
        credentials: &Credentials,
        query: &SearchQuery,
    ) -> Result<Vec<RawJobPayload>, FetchError> {
        let response = self.search(credentials, query)?;
        info!(
            received = response.results.len(),
            term = query.term(),
            location = query.location(),
            "fetched job listings"
        );
        Ok(response.results)
    }

    /// Total number of matches the provider reports; a missing `count` reads as zero.
    pub fn fetch_count(
        &self,
        credentials: &Credentials,
        query: &SearchQuery,
    ) -> Result<u64, FetchError> {
        let count = self.search(credentials, query)?.count.unwrap_or(0);
        info!(count, term = query.term(), location = query.location(), "fetched match count");
        Ok(count)
    }

    fn search(
        &self,
        credentials: &Credentials,
        query: &SearchQuery,
    ) -> Result<SearchResponse, FetchError> {
        info!(
            endpoint = %self.endpoint,
            term = query.term(),
            location = query.location(),
            "querying provider"
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("app_id", credentials.app_id.as_str()),
                ("app_key", credentials.api_key.as_str()),
                ("what", query.term()),
                ("where", query.location()),
            ])
            .send()
            .map_err(FetchError::from)
            .inspect_err(|e| warn!(error = %e, "provider request failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "provider returned an error status");
            return Err(FetchError::Status(status));
        }

        let body = response
            .text()
            .map_err(FetchError::from)
            .inspect_err(|e| warn!(error = %e, "failed to read provider response body"))?;

        serde_json::from_str(&body)
            .inspect_err(|e| warn!(error = %e, "provider response is not valid search JSON"))
            .map_err(FetchError::from)
    }
}
