use hospital_atoms::documents::{Document, StoredDocument};
use hospital_atoms::media::UploadFile;
use hospital_atoms::records::{GalleryImage, RecordKind, IMAGES_FIELD};
use hospital_atoms::StoreError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ManagerError;
use crate::manager::{now, remote_ids, RecordManager};
use crate::outcome::Outcome;

/// A file headed for a gallery, with its optional caption.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryUpload {
    pub file: UploadFile,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<UploadFile> for GalleryUpload {
    fn from(file: UploadFile) -> Self {
        Self {
            file,
            name: None,
            description: None,
        }
    }
}

pub(crate) fn gallery_images(doc: &StoredDocument) -> Result<Vec<GalleryImage>, ManagerError> {
    match doc.data.get(IMAGES_FIELD) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            ManagerError::from(StoreError::Malformed {
                collection: RecordKind::Gallery.collection().to_string(),
                id: doc.id.clone(),
                reason: e.to_string(),
            })
        }),
    }
}

fn images_value(images: &[GalleryImage]) -> Result<Value, ManagerError> {
    serde_json::to_value(images).map_err(|e| ManagerError::Invalid(format!("unserialisable gallery: {}", e)))
}

impl RecordManager {
    /// New gallery whose images appear in upload order.
    pub async fn create_gallery(
        &self,
        fields: Document,
        uploads: Vec<GalleryUpload>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        let kind = RecordKind::Gallery;
        kind.validate_new(&fields).map_err(ManagerError::Invalid)?;
        tracing::info!("📥 create gallery: {} file(s)", uploads.len());

        let (images, orphaned) = self.upload_gallery_images(&uploads, cancel).await?;

        let stamp = now();
        let mut doc = fields;
        doc.insert(IMAGES_FIELD.to_string(), images_value(&images)?);
        doc.insert("createdAt".to_string(), Value::String(stamp));

        let id = self
            .documents
            .create(kind.collection(), doc.clone())
            .await
            .map_err(|e| {
                tracing::error!("❌ create gallery failed after upload, orphaned={:?}: {}", orphaned, e);
                ManagerError::with_orphans(e, orphaned)
            })?;

        tracing::info!("✅ created gallery {} with {} image(s)", id, images.len());
        Ok(Outcome::clean(StoredDocument::new(id, doc)))
    }

    /// Edit a gallery: append `uploads` after the existing images and drop
    /// the images listed in `removed` (their remote assets are deleted best
    /// effort). Remaining images keep their relative order.
    pub async fn update_gallery(
        &self,
        id: &str,
        fields: Document,
        uploads: Vec<GalleryUpload>,
        removed: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        let kind = RecordKind::Gallery;
        kind.validate_update(&fields).map_err(ManagerError::Invalid)?;

        let existing = self.get(kind, id).await?;
        let current = gallery_images(&existing)?;

        if let Some(missing) = removed.iter().find(|url| !current.iter().any(|img| &img.url == *url)) {
            return Err(ManagerError::not_found("image", missing.clone()));
        }
        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled { orphaned: Vec::new() });
        }

        let (added, orphaned) = self.upload_gallery_images(&uploads, cancel).await?;

        let mut warnings = Vec::new();
        let (dropped, mut images): (Vec<GalleryImage>, Vec<GalleryImage>) =
            current.into_iter().partition(|img| removed.contains(&img.url));
        for image in &dropped {
            self.release_asset(&image.asset(), &mut warnings).await;
        }
        images.extend(added);

        let mut changes = fields;
        changes.insert(IMAGES_FIELD.to_string(), images_value(&images)?);
        changes.insert("updatedAt".to_string(), Value::String(now()));

        self.documents
            .set(kind.collection(), id, changes.clone(), true)
            .await
            .map_err(|e| {
                tracing::error!("❌ update gallery {} failed, orphaned={:?}: {}", id, orphaned, e);
                ManagerError::with_orphans(e, orphaned)
            })?;

        let mut merged = existing.data;
        merged.extend(changes);
        tracing::info!(
            "✅ updated gallery {}: +{} -{} ({} warning(s))",
            id,
            uploads.len(),
            dropped.len(),
            warnings.len()
        );
        Ok(Outcome::new(StoredDocument::new(id, merged), warnings))
    }

    /// Append images to the end of a gallery.
    pub async fn append_gallery_images(
        &self,
        id: &str,
        uploads: Vec<GalleryUpload>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        self.update_gallery(id, Document::new(), uploads, Vec::new(), cancel).await
    }

    /// Delete one gallery image from the image store and from the list.
    pub async fn remove_gallery_image(
        &self,
        id: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        self.update_gallery(id, Document::new(), Vec::new(), vec![url.to_string()], cancel).await
    }

    /// Change the caption of one gallery image. The image store is not touched.
    pub async fn update_gallery_image_meta(
        &self,
        id: &str,
        url: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Outcome<StoredDocument>, ManagerError> {
        let kind = RecordKind::Gallery;
        let existing = self.get(kind, id).await?;
        let mut images = gallery_images(&existing)?;

        let image = images
            .iter_mut()
            .find(|img| img.url == url)
            .ok_or_else(|| ManagerError::not_found("image", url))?;
        if name.is_some() {
            image.name = name;
        }
        if description.is_some() {
            image.description = description;
        }

        let mut changes = Document::new();
        changes.insert(IMAGES_FIELD.to_string(), images_value(&images)?);
        changes.insert("updatedAt".to_string(), Value::String(now()));
        self.documents.set(kind.collection(), id, changes.clone(), true).await?;

        let mut merged = existing.data;
        merged.extend(changes);
        Ok(Outcome::clean(StoredDocument::new(id, merged)))
    }

    async fn upload_gallery_images(
        &self,
        uploads: &[GalleryUpload],
        cancel: &CancellationToken,
    ) -> Result<(Vec<GalleryImage>, Vec<String>), ManagerError> {
        let files: Vec<UploadFile> = uploads.iter().map(|u| u.file.clone()).collect();
        let uploaded = self.upload_sequentially(&files, cancel).await?;
        let orphaned = remote_ids(&uploaded);

        let stamp = now();
        let images = uploads
            .iter()
            .zip(uploaded)
            .map(|(upload, asset)| GalleryImage {
                url: asset.url,
                public_id: Some(asset.remote_id),
                name: upload.name.clone(),
                description: upload.description.clone(),
                uploaded_at: stamp.clone(),
            })
            .collect();

        Ok((images, orphaned))
    }
}
