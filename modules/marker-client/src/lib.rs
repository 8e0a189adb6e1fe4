//! Client side of the markers app: one facade over either the local
//! marker-service or the hosted store, plus the flat-file migration.

pub mod backend;
pub mod config;
pub mod error;
pub mod file_api;
pub mod hosted;
pub mod migrate;
pub mod sync;

#[cfg(test)]
mod testing;

pub use backend::MarkerBackend;
pub use config::{BackendConfig, HostedConfig};
pub use error::SyncError;
pub use sync::MarkerSync;
