//! UQE-API: read-only query API over manufacturing quality-control records
//!
//! Serves lot, shift-range and article-number lookups over a single records
//! table stored either in a MySQL-compatible database or in Supabase, plus a
//! proxy that asks Render to restart the deployed service.

pub mod autocomplete;
pub mod cache;
pub mod config;
pub mod error;
pub mod network;
pub mod query;
pub mod restart;
pub mod store;
pub mod web;

pub use config::Settings;
pub use error::ApiError;
pub use store::{Record, RecordStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
