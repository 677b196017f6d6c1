use hospital_atoms::documents::{Document, DocumentStore, StoredDocument};
use hospital_atoms::media::{ImageStore, MediaAsset, UploadFile, UploadedAsset};
use hospital_atoms::records::{decode, AssetShape, RecordKind, IMAGE_ID_FIELD, IMAGE_URL_FIELD};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ManagerError;
use crate::gallery::GalleryUpload;
use crate::outcome::{Degraded, Outcome};

/// Coordinates the document store and the image store for asset-owning records.
///
/// Ordering rules:
/// - uploads run one at a time and any failure aborts before a document write
/// - an old image is only deleted once its replacement is uploaded
/// - image deletes are best effort and never block the document change
///
/// Cancellation is honoured before each upload and before a delete sequence
/// starts. Once an old image has been released the document write always
/// follows, so a cancel never leaves a record pointing at a deleted image.
#[derive(Clone)]
pub struct RecordManager {
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) images: Arc<dyn ImageStore>,
}

impl std::fmt::Debug for RecordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordManager").finish_non_exhaustive()
    }
}

impl RecordManager {
    pub fn new(documents: Arc<dyn DocumentStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { documents, images }
    }

    /// Fetch one record or fail with `NotFound`.
    pub async fn get(&self, kind: RecordKind, id: &str) -> Result<StoredDocument, ManagerError> {
        self.documents
            .get(kind.collection(), id)
            .await?
            .ok_or_else(|| ManagerError::not_found(kind, id))
    }

    pub async fn get_as<T: DeserializeOwned>(&self, kind: RecordKind, id: &str) -> Result<T, ManagerError> {
        let doc = self.get(kind, id).await?;
        Ok(decode(kind.collection(), doc)?)
    }

    /// All records of a kind in the order the public pages show them.
    pub async fn list(&self, kind: RecordKind) -> Result<Vec<StoredDocument>, ManagerError> {
        Ok(self.documents.list(kind.collection(), &kind.default_query()).await?)
    }

    /// Upload `files` in order, then write one new record referencing them.
    ///
    /// If any upload fails nothing is written and the assets uploaded so far
    /// are reported as orphaned in the error.
    pub async fn create(
        &self,
        kind: RecordKind,
        fields: Document,
        files: Vec<UploadFile>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        match kind.asset_shape() {
            AssetShape::Gallery => {
                let uploads = files.into_iter().map(GalleryUpload::from).collect();
                return self.create_gallery(fields, uploads, cancel).await;
            }
            AssetShape::None if !files.is_empty() => {
                return Err(ManagerError::Invalid(format!("{} do not take images", kind)));
            }
            AssetShape::Single if files.len() > 1 => {
                return Err(ManagerError::Invalid(format!("{} take a single image", kind)));
            }
            _ => {}
        }
        kind.validate_new(&fields).map_err(ManagerError::Invalid)?;

        tracing::info!("📥 create {}: {} file(s)", kind, files.len());

        let uploaded = self.upload_sequentially(&files, cancel).await?;
        let orphaned = remote_ids(&uploaded);

        let mut doc = fields;
        doc.insert("createdAt".to_string(), Value::String(now()));
        if let Some(asset) = uploaded.into_iter().next() {
            doc.insert(IMAGE_URL_FIELD.to_string(), Value::String(asset.url));
            doc.insert(IMAGE_ID_FIELD.to_string(), Value::String(asset.remote_id));
        }

        let id = self
            .documents
            .create(kind.collection(), doc.clone())
            .await
            .map_err(|e| {
                tracing::error!("❌ create {} failed after upload, orphaned={:?}: {}", kind, orphaned, e);
                ManagerError::with_orphans(e, orphaned)
            })?;

        tracing::info!("✅ created {} {}", kind, id);
        Ok(Outcome::clean(StoredDocument::new(id, doc)))
    }

    /// Edit a record's fields and optionally swap its image.
    ///
    /// With a replacement the new file is uploaded first; a failed upload
    /// leaves the record and its old image untouched. The old image is then
    /// deleted best effort and the document is written either way.
    pub async fn update(
        &self,
        kind: RecordKind,
        id: &str,
        fields: Document,
        replacement: Option<UploadFile>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        match kind.asset_shape() {
            AssetShape::Gallery => {
                let uploads = replacement.into_iter().map(GalleryUpload::from).collect();
                return self.update_gallery(id, fields, uploads, Vec::new(), cancel).await;
            }
            AssetShape::None if replacement.is_some() => {
                return Err(ManagerError::Invalid(format!("{} do not take images", kind)));
            }
            _ => {}
        }
        kind.validate_update(&fields).map_err(ManagerError::Invalid)?;

        let existing = self.get(kind, id).await?;
        let mut warnings = Vec::new();
        let mut orphaned = Vec::new();
        let mut changes = fields;

        if let Some(file) = replacement {
            let uploaded = self
                .upload_sequentially(std::slice::from_ref(&file), cancel)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ManagerError::Invalid("upload returned no asset".to_string()))?;

            // An overwrite upload can hand back the old public id; that asset is now the new one.
            if let Some(old) = single_asset(&existing).filter(|old| !old.is_same_asset(&uploaded.remote_id)) {
                self.release_asset(&old, &mut warnings).await;
            }

            orphaned.push(uploaded.remote_id.clone());
            changes.insert(IMAGE_URL_FIELD.to_string(), Value::String(uploaded.url));
            changes.insert(IMAGE_ID_FIELD.to_string(), Value::String(uploaded.remote_id));
        }

        changes.insert("updatedAt".to_string(), Value::String(now()));
        self.documents
            .set(kind.collection(), id, changes.clone(), true)
            .await
            .map_err(|e| {
                tracing::error!("❌ update {} {} failed, orphaned={:?}: {}", kind, id, orphaned, e);
                ManagerError::with_orphans(e, orphaned)
            })?;

        let mut merged = existing.data;
        merged.extend(changes);
        tracing::info!("✅ updated {} {} ({} warning(s))", kind, id, warnings.len());
        Ok(Outcome::new(StoredDocument::new(id, merged), warnings))
    }

    /// Delete one image from a record: the remote asset first (best effort),
    /// then the reference in the document.
    pub async fn remove_asset(
        &self,
        kind: RecordKind,
        id: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        match kind.asset_shape() {
            AssetShape::Gallery => return self.remove_gallery_image(id, url, cancel).await,
            AssetShape::None => {
                return Err(ManagerError::Invalid(format!("{} do not take images", kind)));
            }
            AssetShape::Single => {}
        }

        let existing = self.get(kind, id).await?;
        let asset = single_asset(&existing)
            .filter(|asset| asset.url == url)
            .ok_or_else(|| ManagerError::not_found("image", url))?;

        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled { orphaned: Vec::new() });
        }

        let mut warnings = Vec::new();
        self.release_asset(&asset, &mut warnings).await;

        let mut changes = Document::new();
        changes.insert(IMAGE_URL_FIELD.to_string(), Value::Null);
        changes.insert(IMAGE_ID_FIELD.to_string(), Value::Null);
        changes.insert("updatedAt".to_string(), Value::String(now()));
        self.documents.set(kind.collection(), id, changes.clone(), true).await?;

        let mut merged = existing.data;
        merged.extend(changes);
        Ok(Outcome::new(StoredDocument::new(id, merged), warnings))
    }

    /// Delete every image a record owns (best effort), then the record.
    ///
    /// There is no rollback: if the document delete fails after the images
    /// are gone, the record is left pointing at deleted images.
    pub async fn delete(
        &self,
        kind: RecordKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>, ManagerError> {
        let existing = self.get(kind, id).await?;
        let assets = self.owned_assets(kind, &existing)?;

        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled { orphaned: Vec::new() });
        }

        let mut warnings = Vec::new();
        for asset in &assets {
            self.release_asset(asset, &mut warnings).await;
        }

        self.documents.delete(kind.collection(), id).await.map_err(|e| {
            tracing::error!("❌ delete {} {} failed after releasing {} image(s): {}", kind, id, assets.len(), e);
            ManagerError::from(e)
        })?;

        tracing::info!("🗑️ deleted {} {} ({} image(s), {} warning(s))", kind, id, assets.len(), warnings.len());
        Ok(Outcome::new((), warnings))
    }

    fn owned_assets(&self, kind: RecordKind, doc: &StoredDocument) -> Result<Vec<MediaAsset>, ManagerError> {
        Ok(match kind.asset_shape() {
            AssetShape::None => Vec::new(),
            AssetShape::Single => single_asset(doc).into_iter().collect(),
            AssetShape::Gallery => crate::gallery::gallery_images(doc)?
                .iter()
                .map(|image| image.asset())
                .collect(),
        })
    }

    /// Upload one file at a time, stopping at the first failure.
    pub(crate) async fn upload_sequentially(
        &self,
        files: &[UploadFile],
        cancel: &CancellationToken,
    ) -> Result<Vec<UploadedAsset>, ManagerError> {
        let mut uploaded: Vec<UploadedAsset> = Vec::with_capacity(files.len());

        for file in files {
            if cancel.is_cancelled() {
                tracing::warn!("⚠️ upload sequence cancelled before {}", file.file_name);
                return Err(ManagerError::Cancelled {
                    orphaned: remote_ids(&uploaded),
                });
            }

            match self.images.upload(file).await {
                Ok(asset) => {
                    tracing::info!("📤 uploaded {} as {}", file.file_name, asset.remote_id);
                    uploaded.push(asset);
                }
                Err(source) => {
                    let orphaned = remote_ids(&uploaded);
                    tracing::error!(
                        "❌ upload of {} failed, orphaned={:?}: {}",
                        file.file_name,
                        orphaned,
                        source
                    );
                    return Err(ManagerError::Upload {
                        file_name: file.file_name.clone(),
                        source,
                        orphaned,
                    });
                }
            }
        }

        Ok(uploaded)
    }

    /// Best-effort remote delete. Failures become warnings, never errors.
    pub(crate) async fn release_asset(&self, asset: &MediaAsset, warnings: &mut Vec<Degraded>) {
        let Some(remote_id) = asset.resolve_remote_id() else {
            tracing::warn!("⚠️ no public id in {}, skipping remote delete", asset.url);
            warnings.push(Degraded::PublicIdUnavailable {
                url: asset.url.clone(),
            });
            return;
        };

        match self.images.delete(&remote_id).await {
            Ok(()) => tracing::info!("🗑️ deleted image {}", remote_id),
            Err(e) => {
                tracing::warn!("⚠️ could not delete image {}, leaving it orphaned: {}", remote_id, e);
                warnings.push(Degraded::AssetDeleteFailed {
                    remote_id,
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn single_asset(doc: &StoredDocument) -> Option<MediaAsset> {
    let url = doc.str_field(IMAGE_URL_FIELD).filter(|url| !url.is_empty())?;
    Some(MediaAsset {
        url: url.to_string(),
        remote_id: doc.str_field(IMAGE_ID_FIELD).map(str::to_string),
    })
}

pub(crate) fn remote_ids(assets: &[UploadedAsset]) -> Vec<String> {
    assets.iter().map(|a| a.remote_id.clone()).collect()
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
