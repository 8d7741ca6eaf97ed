pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::error::AppError;
use crate::store::{JsonFileStore, RegistrationStore, SqliteStore};

/// Opens the configured backend and seeds the course catalogue.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn RegistrationStore>, AppError> {
    let store: Arc<dyn RegistrationStore> = match config.storage {
        StorageBackend::Sqlite => {
            let pool = db::connect(&config.database_url).await?;
            Arc::new(SqliteStore::new(pool))
        }
        StorageBackend::File => Arc::new(JsonFileStore::open(&config.data_dir).await?),
    };
    store.seed_courses().await?;
    Ok(store)
}
