use hospital_atoms::documents::Document;
use hospital_atoms::media::{MediaAsset, UploadFile};
use hospital_atoms::records::{HeroConfig, HERO_COLLECTION, HERO_DOC_ID, IMAGES_FIELD};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ManagerError;
use crate::manager::{now, remote_ids, RecordManager};
use crate::outcome::Outcome;

// The hero banner only stores URLs, so every delete goes through public id derivation.
impl RecordManager {
    /// Current banner; an absent document is an empty banner.
    pub async fn hero(&self) -> Result<HeroConfig, ManagerError> {
        match self.documents.get(HERO_COLLECTION, HERO_DOC_ID).await? {
            Some(doc) => {
                let mut data = doc.data;
                data.remove("id");
                Ok(serde_json::from_value(Value::Object(data)).map_err(|e| {
                    hospital_atoms::StoreError::Malformed {
                        collection: HERO_COLLECTION.to_string(),
                        id: HERO_DOC_ID.to_string(),
                        reason: e.to_string(),
                    }
                })?)
            }
            None => Ok(HeroConfig::default()),
        }
    }

    /// Upload `files` in order and append them to the banner.
    pub async fn add_hero_images(
        &self,
        files: Vec<UploadFile>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<HeroConfig>, ManagerError> {
        if files.is_empty() {
            return Err(ManagerError::Invalid("no images supplied".to_string()));
        }

        let mut hero = self.hero().await?;
        let uploaded = self.upload_sequentially(&files, cancel).await?;
        let orphaned = remote_ids(&uploaded);

        hero.images.extend(uploaded.into_iter().map(|asset| asset.url));
        let hero = self.save_hero(hero.images, orphaned).await?;
        tracing::info!("✅ hero banner now has {} image(s)", hero.images.len());
        Ok(Outcome::clean(hero))
    }

    /// Swap the banner image at `index`, keeping its position.
    pub async fn replace_hero_image(
        &self,
        index: usize,
        file: UploadFile,
        cancel: &CancellationToken,
    ) -> Result<Outcome<HeroConfig>, ManagerError> {
        let mut hero = self.hero().await?;
        if index >= hero.images.len() {
            return Err(ManagerError::Invalid(format!(
                "hero image {} out of range ({} image(s))",
                index,
                hero.images.len()
            )));
        }

        let uploaded = self
            .upload_sequentially(std::slice::from_ref(&file), cancel)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ManagerError::Invalid("upload returned no asset".to_string()))?;

        let mut warnings = Vec::new();
        let old = MediaAsset::from_url(std::mem::replace(&mut hero.images[index], uploaded.url));
        if !old.is_same_asset(&uploaded.remote_id) {
            self.release_asset(&old, &mut warnings).await;
        }

        let hero = self.save_hero(hero.images, vec![uploaded.remote_id]).await?;
        Ok(Outcome::new(hero, warnings))
    }

    /// Delete a banner image remotely (best effort) and drop it from the list.
    pub async fn remove_hero_image(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome<HeroConfig>, ManagerError> {
        let mut hero = self.hero().await?;
        let position = hero
            .images
            .iter()
            .position(|image| image == url)
            .ok_or_else(|| ManagerError::not_found("hero image", url))?;

        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled { orphaned: Vec::new() });
        }

        let mut warnings = Vec::new();
        let removed = hero.images.remove(position);
        self.release_asset(&MediaAsset::from_url(removed), &mut warnings).await;

        let hero = self.save_hero(hero.images, Vec::new()).await?;
        Ok(Outcome::new(hero, warnings))
    }

    async fn save_hero(&self, images: Vec<String>, orphaned: Vec<String>) -> Result<HeroConfig, ManagerError> {
        let updated_at = now();
        let mut doc = Document::new();
        doc.insert(
            IMAGES_FIELD.to_string(),
            Value::Array(images.iter().cloned().map(Value::String).collect()),
        );
        doc.insert("updatedAt".to_string(), Value::String(updated_at.clone()));

        self.documents
            .set(HERO_COLLECTION, HERO_DOC_ID, doc, true)
            .await
            .map_err(|e| {
                tracing::error!("❌ saving hero banner failed, orphaned={:?}: {}", orphaned, e);
                ManagerError::with_orphans(e, orphaned)
            })?;

        Ok(HeroConfig {
            images,
            updated_at: Some(updated_at),
        })
    }
}
