//! REST front end over a single job aggregate.
//!
//! Fetches run on the blocking pool and land in the aggregate through one
//! write lock; everything else reads snapshots.

pub mod api;
pub mod config;
pub mod state;

pub use api::build_router;
pub use config::ServerConfig;
pub use state::{AppState, SharedState};
