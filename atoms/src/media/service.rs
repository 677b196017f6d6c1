use async_trait::async_trait;

use super::model::{UploadFile, UploadedAsset};
use crate::error::ImageStoreError;

/// Remote image hosting: upload returns the delivery URL plus the public id,
/// delete takes the public id and is authorised by a signed request.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<UploadedAsset, ImageStoreError>;

    async fn delete(&self, remote_id: &str) -> Result<(), ImageStoreError>;
}
