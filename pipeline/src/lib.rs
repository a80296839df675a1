//! Fetch → normalize → aggregate → export pipeline for provider job listings.
//!
//! The pieces are usable on their own; [`JobSource`] wires the fetcher to a
//! normalizer matching the provider country.

pub mod aggregator;
pub mod config;
pub mod exporter;
pub mod fetcher;
pub mod normalizer;
pub mod telemetry;

pub use aggregator::{matching, within_dates, Aggregator, Column, Direction, MergePolicy, ResultSet, UnknownColumn};
pub use common::query::MAX_MAX_RESULTS;
pub use common::{JobRecord, SearchQuery};
pub use config::{ConfigurationError, Credentials, FetcherConfig};
pub use exporter::{export, export_csv, export_json, import_json, ExportError, ExportFormat};
pub use fetcher::{FetchError, Fetcher, RawJobPayload};
pub use normalizer::Normalizer;

/// A fetcher paired with the normalizer for its country.
pub struct JobSource {
    fetcher: Fetcher,
    normalizer: Normalizer,
}

impl JobSource {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            normalizer: Normalizer::for_country(&config.country),
        })
    }

    /// Normalized listings from the first result page, in provider order and
    /// not yet capped; the aggregator applies `max_results`.
    pub fn search(&self, credentials: &Credentials, query: &SearchQuery) -> Result<Vec<JobRecord>, FetchError> {
        let raw = self.fetcher.fetch(credentials, query)?;
        Ok(self.normalizer.normalize_all(&raw))
    }

    pub fn count(&self, credentials: &Credentials, query: &SearchQuery) -> Result<u64, FetchError> {
        self.fetcher.fetch_count(credentials, query)
    }
}
