use crate::config::ServerConfig;
use parking_lot::RwLock;
use pipeline::{Aggregator, Credentials, FetcherConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
pub struct AppState {
    /// Single writer: only fetch, sort, clear and import take the write lock.
    pub aggregator: RwLock<Aggregator>,
    /// Owned by the blocking provider call itself, so at most one is in flight
    /// even when the request that started it has gone away.
    pub fetch_gate: Arc<Mutex<()>>,
    pub fetcher: FetcherConfig,
    pub credentials: Option<Credentials>,
    pub data_dir: PathBuf,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ServerConfig) -> SharedState {
        Arc::new(Self {
            aggregator: RwLock::new(Aggregator::with_policy(config.merge_policy)),
            fetch_gate: Arc::new(Mutex::new(())),
            fetcher: config.fetcher,
            credentials: config.credentials,
            data_dir: config.data_dir,
        })
    }
}
