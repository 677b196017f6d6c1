use base64::{engine::general_purpose::STANDARD, Engine as _};
use hospital_atoms::documents::{Document, StoredDocument};
use hospital_atoms::media::UploadFile;
use hospital_atoms::records::{HeroConfig, RecordKind};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ManagerError;
use crate::gallery::GalleryUpload;
use crate::manager::RecordManager;
use crate::outcome::Outcome;

/// File as sent by the admin forms: base64 bytes, optionally as a data URI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub data: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FilePayload {
    fn decode(self) -> Result<GalleryUpload, ManagerError> {
        let (content_type, encoded) = match self.data.strip_prefix("data:") {
            Some(rest) => {
                let (meta, encoded) = rest
                    .split_once(',')
                    .ok_or_else(|| ManagerError::Invalid(format!("{}: malformed data URI", self.file_name)))?;
                (meta.strip_suffix(";base64").map(str::to_string), encoded)
            }
            None => (None, self.data.as_str()),
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ManagerError::Invalid(format!("{}: invalid base64: {}", self.file_name, e)))?;
        if bytes.is_empty() {
            return Err(ManagerError::Invalid(format!("{} is empty", self.file_name)));
        }

        let content_type = self
            .content_type
            .clone()
            .or(content_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(GalleryUpload {
            file: UploadFile::new(self.file_name, content_type, bytes),
            name: self.name,
            description: self.description,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    #[serde(default)]
    pub fields: Document,
    #[serde(default)]
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub fields: Document,
    /// Replacement for single-image records
    #[serde(default)]
    pub file: Option<FilePayload>,
    /// Additions for galleries
    #[serde(default)]
    pub files: Vec<FilePayload>,
    /// Gallery image URLs to drop
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRefRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageMetaRequest {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HeroImagesRequest {
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceHeroRequest {
    pub file: FilePayload,
}

fn decode_all(files: Vec<FilePayload>) -> Result<Vec<GalleryUpload>, ManagerError> {
    files.into_iter().map(FilePayload::decode).collect()
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ManagerError> {
    serde_json::from_slice(body).map_err(|e| ManagerError::Invalid(format!("invalid request body: {}", e)))
}

fn json_response(status: StatusCode, body: Value) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

pub fn status_for(err: &ManagerError) -> StatusCode {
    match err {
        ManagerError::Invalid(_) => StatusCode::BAD_REQUEST,
        ManagerError::NotFound { .. } => StatusCode::NOT_FOUND,
        ManagerError::Cancelled { .. } => StatusCode::CONFLICT,
        ManagerError::Upload { .. } | ManagerError::Document { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// Single success/failure envelope the admin screens turn into a notification.
/// Degraded steps still count as success; they ride along as `warnings`.
fn respond<T>(
    result: Result<Outcome<T>, ManagerError>,
    status: StatusCode,
    to_json: impl FnOnce(T) -> Value,
) -> Result<Response<Body>, Error> {
    match result {
        Ok(outcome) => {
            let warnings: Vec<String> = outcome.warnings.iter().map(ToString::to_string).collect();
            json_response(
                status,
                json!({"success": true, "data": to_json(outcome.value), "warnings": warnings}),
            )
        }
        Err(e) => {
            tracing::error!("❌ request failed: {}", e);
            json_response(status_for(&e), json!({"success": false, "error": e.to_string()}))
        }
    }
}

fn doc_json(doc: StoredDocument) -> Value {
    doc.into_json()
}

/// GET /{kind}
pub async fn list_records_handler(manager: &RecordManager, kind: RecordKind) -> Result<Response<Body>, Error> {
    let result = manager
        .list(kind)
        .await
        .map(|docs| Outcome::clean(Value::Array(docs.into_iter().map(doc_json).collect())));
    respond(result, StatusCode::OK, |v| v)
}

/// GET /{kind}/{id}
pub async fn get_record_handler(manager: &RecordManager, kind: RecordKind, id: &str) -> Result<Response<Body>, Error> {
    let result = manager.get(kind, id).await.map(Outcome::clean);
    respond(result, StatusCode::OK, doc_json)
}

/// POST /{kind}
pub async fn create_record_handler(
    manager: &RecordManager,
    kind: RecordKind,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<StoredDocument>, ManagerError> = async {
        let req: CreateRecordRequest = parse_body(body)?;
        let uploads = decode_all(req.files)?;
        match kind {
            RecordKind::Gallery => manager.create_gallery(req.fields, uploads, cancel).await,
            _ => {
                let files = uploads.into_iter().map(|u| u.file).collect();
                manager.create(kind, req.fields, files, cancel).await
            }
        }
    }
    .await;
    respond(result, StatusCode::CREATED, doc_json)
}

/// PATCH /{kind}/{id}
pub async fn update_record_handler(
    manager: &RecordManager,
    kind: RecordKind,
    id: &str,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<StoredDocument>, ManagerError> = async {
        let req: UpdateRecordRequest = parse_body(body)?;
        match kind {
            RecordKind::Gallery => {
                let mut files = req.files;
                files.extend(req.file);
                let uploads = decode_all(files)?;
                manager.update_gallery(id, req.fields, uploads, req.removed, cancel).await
            }
            _ => {
                if !req.files.is_empty() || !req.removed.is_empty() {
                    return Err(ManagerError::Invalid(format!("{} take a single image", kind)));
                }
                let replacement = req.file.map(FilePayload::decode).transpose()?.map(|u| u.file);
                manager.update(kind, id, req.fields, replacement, cancel).await
            }
        }
    }
    .await;
    respond(result, StatusCode::OK, doc_json)
}

/// DELETE /{kind}/{id}
pub async fn delete_record_handler(
    manager: &RecordManager,
    kind: RecordKind,
    id: &str,
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result = manager.delete(kind, id, cancel).await;
    respond(result, StatusCode::OK, |_| json!({"id": id}))
}

/// DELETE /{kind}/{id}/images
pub async fn remove_image_handler(
    manager: &RecordManager,
    kind: RecordKind,
    id: &str,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<StoredDocument>, ManagerError> = async {
        let req: ImageRefRequest = parse_body(body)?;
        manager.remove_asset(kind, id, &req.url, cancel).await
    }
    .await;
    respond(result, StatusCode::OK, doc_json)
}

/// PATCH /galleries/{id}/images
pub async fn gallery_image_meta_handler(manager: &RecordManager, id: &str, body: &[u8]) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<StoredDocument>, ManagerError> = async {
        let req: ImageMetaRequest = parse_body(body)?;
        manager
            .update_gallery_image_meta(id, &req.url, req.name, req.description)
            .await
    }
    .await;
    respond(result, StatusCode::OK, doc_json)
}

fn hero_json(hero: HeroConfig) -> Value {
    serde_json::to_value(hero).unwrap_or(Value::Null)
}

/// GET /hero
pub async fn get_hero_handler(manager: &RecordManager) -> Result<Response<Body>, Error> {
    let result = manager.hero().await.map(Outcome::clean);
    respond(result, StatusCode::OK, hero_json)
}

/// POST /hero
pub async fn add_hero_images_handler(
    manager: &RecordManager,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<HeroConfig>, ManagerError> = async {
        let req: HeroImagesRequest = parse_body(body)?;
        let files = decode_all(req.files)?.into_iter().map(|u| u.file).collect();
        manager.add_hero_images(files, cancel).await
    }
    .await;
    respond(result, StatusCode::OK, hero_json)
}

/// PUT /hero/{index}
pub async fn replace_hero_image_handler(
    manager: &RecordManager,
    index: &str,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<HeroConfig>, ManagerError> = async {
        let index: usize = index
            .parse()
            .map_err(|_| ManagerError::Invalid(format!("invalid hero index {}", index)))?;
        let req: ReplaceHeroRequest = parse_body(body)?;
        let file = req.file.decode()?.file;
        manager.replace_hero_image(index, file, cancel).await
    }
    .await;
    respond(result, StatusCode::OK, hero_json)
}

/// DELETE /hero
pub async fn remove_hero_image_handler(
    manager: &RecordManager,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response<Body>, Error> {
    let result: Result<Outcome<HeroConfig>, ManagerError> = async {
        let req: ImageRefRequest = parse_body(body)?;
        manager.remove_hero_image(&req.url, cancel).await
    }
    .await;
    respond(result, StatusCode::OK, hero_json)
}
