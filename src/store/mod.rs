//! Record stores
//!
//! One read-only trait over the quality records table, implemented by a
//! MySQL-compatible pool and by Supabase's REST API.

#[cfg(test)]
pub(crate) mod fixture;
mod mysql;
mod supabase;
mod traits;

pub use mysql::MySqlStore;
pub use supabase::SupabaseStore;
pub use traits::{Record, RecordStore, StoreError};

use crate::config::{Backend, Settings};
use crate::network::HttpClient;
use std::sync::Arc;
use tracing::info;

/// Create the store selected by `settings.database.backend`
pub fn build_store(settings: &Settings, client: HttpClient) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match settings.database.backend {
        Backend::MySql => Arc::new(MySqlStore::connect_lazy(&settings.database)?),
        Backend::Supabase => Arc::new(SupabaseStore::new(client, &settings.database)),
    };

    info!(
        "Record store: {} (table {})",
        store.name(),
        settings.database.table
    );
    Ok(store)
}
