//! Client construction and process-wide state for the hospital API.

pub mod config;
pub mod image_store;

use aws_sdk_dynamodb::Client as DynamoClient;
use hospital_atoms::documents::DynamoDocumentStore;
use records_block::RecordManager;
use std::sync::Arc;

pub use config::{AppConfig, ConfigError, ImageServiceConfig};
pub use image_store::HttpImageStore;

/// Everything a request handler needs, built once per Lambda container.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub records: RecordManager,
}

impl AppState {
    pub fn new(config: AppConfig, records: RecordManager) -> Self {
        Self { config, records }
    }

    /// Wire DynamoDB and the image service from the environment.
    pub async fn from_env() -> Result<Self, ConfigError> {
        let config = AppConfig::from_env()?;
        let aws = aws_config::load_from_env().await;

        let documents = DynamoDocumentStore::new(DynamoClient::new(&aws), config.table_name.clone());
        let images = HttpImageStore::new(reqwest::Client::new(), config.image.clone());
        let records = RecordManager::new(Arc::new(documents), Arc::new(images));

        tracing::info!(
            "state ready: table={} cloud={}",
            config.table_name,
            config.image.cloud_name
        );
        Ok(Self::new(config, records))
    }
}
