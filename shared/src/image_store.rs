use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hospital_atoms::media::signing::{sign_params, SignedDestroy};
use hospital_atoms::media::{ImageStore, UploadFile, UploadedAsset};
use hospital_atoms::ImageStoreError;
use serde::Deserialize;

use crate::config::ImageServiceConfig;

/// Image service client speaking the `/v1_1/{cloud}/image/{upload,destroy}` API.
#[derive(Debug, Clone)]
pub struct HttpImageStore {
    http: reqwest::Client,
    config: ImageServiceConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl HttpImageStore {
    pub fn new(http: reqwest::Client, config: ImageServiceConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.config.api_base, self.config.cloud_name, action)
    }

    fn upload_form(&self, file: &UploadFile, timestamp: i64) -> Vec<(&'static str, String)> {
        let data_uri = format!("data:{};base64,{}", file.content_type, STANDARD.encode(&file.bytes));
        let mut form = vec![("file", data_uri), ("folder", self.config.folder.clone())];

        match &self.config.upload_preset {
            Some(preset) => form.push(("upload_preset", preset.clone())),
            None => {
                let signed = [
                    ("folder", self.config.folder.clone()),
                    ("timestamp", timestamp.to_string()),
                ];
                form.push(("timestamp", timestamp.to_string()));
                form.push(("api_key", self.config.api_key.clone()));
                form.push(("signature", sign_params(&signed, &self.config.api_secret)));
            }
        }
        form
    }

    async fn post(&self, action: &str, form: &[(&'static str, String)]) -> Result<String, ImageStoreError> {
        let response = self
            .http
            .post(self.endpoint(action))
            .form(form)
            .send()
            .await
            .map_err(|e| ImageStoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ImageStoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(ImageStoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, file: &UploadFile) -> Result<UploadedAsset, ImageStoreError> {
        let timestamp = chrono::Utc::now().timestamp();
        let body = self.post("upload", &self.upload_form(file, timestamp)).await?;
        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| ImageStoreError::InvalidResponse(e.to_string()))?;

        tracing::info!("📤 {} stored as {}", file.file_name, parsed.public_id);
        Ok(UploadedAsset {
            url: parsed.secure_url,
            remote_id: parsed.public_id,
        })
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ImageStoreError> {
        let timestamp = chrono::Utc::now().timestamp();
        let request = SignedDestroy::new(remote_id, timestamp, &self.config.api_key, &self.config.api_secret);
        let body = self.post("destroy", &request.form()).await?;
        let parsed: DestroyResponse =
            serde_json::from_str(&body).map_err(|e| ImageStoreError::InvalidResponse(e.to_string()))?;

        match parsed.result.as_str() {
            "ok" => Ok(()),
            // already gone: nothing left to orphan
            "not found" => {
                tracing::info!("image {} was already deleted", remote_id);
                Ok(())
            }
            other => Err(ImageStoreError::Rejected {
                status: 200,
                message: format!("destroy returned {}", other),
            }),
        }
    }
}
