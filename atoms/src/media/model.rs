use serde::{Deserialize, Serialize};

use super::public_id::derive_public_id;

/// Raw file handed to the image store for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// What a successful upload returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub remote_id: String,
}

/// Reference to an asset owned by a record.
///
/// Older documents persisted only the URL, so `remote_id` may be missing and
/// has to be re-derived from the URL before the asset can be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub url: String,
    pub remote_id: Option<String>,
}

impl MediaAsset {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            remote_id: None,
        }
    }

    pub fn resolve_remote_id(&self) -> Option<String> {
        self.remote_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| derive_public_id(&self.url))
    }

    /// True when this asset resolves to `remote_id`, i.e. deleting it would
    /// delete that remote asset.
    pub fn is_same_asset(&self, remote_id: &str) -> bool {
        self.resolve_remote_id().as_deref() == Some(remote_id)
    }
}

impl From<UploadedAsset> for MediaAsset {
    fn from(asset: UploadedAsset) -> Self {
        Self {
            url: asset.url,
            remote_id: Some(asset.remote_id),
        }
    }
}
