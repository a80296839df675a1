use anyhow::{Context, Result};
use pipeline::{Credentials, FetcherConfig, MergePolicy};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Exports and imports are confined to this directory.
    pub data_dir: PathBuf,
    pub merge_policy: MergePolicy,
    pub fetcher: FetcherConfig,
    /// `None` when the environment lacks them; fetches are refused until set.
    pub credentials: Option<Credentials>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let bind = env::var("JOBS_BIND")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("invalid JOBS_BIND address")?;

        let data_dir = env::var("JOBS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let merge_policy = match env::var("JOBS_MERGE_POLICY") {
            Ok(raw) => raw
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid JOBS_MERGE_POLICY")?,
            Err(_) => MergePolicy::default(),
        };

        let fetcher = FetcherConfig::from_env()?;

        let credentials = match Credentials::from_env() {
            Ok(credentials) => {
                info!("API credentials found");
                Some(credentials)
            }
            Err(e) => {
                warn!(error = %e, "API credentials missing; /fetch and /count will be refused");
                None
            }
        };

        Ok(Self {
            bind,
            data_dir,
            merge_policy,
            fetcher,
            credentials,
        })
    }
}
