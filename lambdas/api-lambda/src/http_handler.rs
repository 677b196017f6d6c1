use hospital_atoms::records::RecordKind;
use hospital_shared::AppState;
use lambda_http::http::header::{HeaderValue, VARY};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use records_block::http as records;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Stop starting new remote calls this long before the Lambda deadline.
const DEADLINE_MARGIN_MS: i64 = 2_000;

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));
    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

/// Token that fires shortly before the invocation deadline. The guard
/// cancels it (and stops the timer task) when the request finishes.
fn deadline_token(event: &Request) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();

    if let Some(ctx) = event.lambda_context_ref() {
        let remaining = ctx.deadline as i64 - chrono::Utc::now().timestamp_millis() - DEADLINE_MARGIN_MS;
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(remaining.max(0) as u64)) => {
                    tracing::warn!("⏱️ invocation deadline close, cancelling pending remote calls");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
    }

    (token, guard)
}

/// Main Lambda handler - routes public reads and admin CRUD
pub(crate) async fn function_handler(event: Request, state: Arc<AppState>) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    tracing::info!("🚀 API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let (cancel, _guard) = deadline_token(&event);
    let body: &[u8] = event.body();
    let manager = &state.records;
    let parts: Vec<&str> = path.trim_matches('/').split('/').filter(|p| !p.is_empty()).collect();

    let resp = match (&method, parts.as_slice()) {
        (&Method::GET, ["hero"]) => records::get_hero_handler(manager).await,
        (&Method::POST, ["hero"]) => records::add_hero_images_handler(manager, body, &cancel).await,
        (&Method::DELETE, ["hero"]) => records::remove_hero_image_handler(manager, body, &cancel).await,
        (&Method::PUT, ["hero", index]) => records::replace_hero_image_handler(manager, index, body, &cancel).await,

        (_, [collection, rest @ ..]) => match RecordKind::from_collection(collection) {
            Some(kind) => match (&method, rest) {
                (&Method::GET, []) => records::list_records_handler(manager, kind).await,
                (&Method::POST, []) => records::create_record_handler(manager, kind, body, &cancel).await,
                (&Method::GET, [id]) => records::get_record_handler(manager, kind, id).await,
                (&Method::PATCH, [id]) => records::update_record_handler(manager, kind, id, body, &cancel).await,
                (&Method::DELETE, [id]) => records::delete_record_handler(manager, kind, id, &cancel).await,
                (&Method::DELETE, [id, "images"]) => {
                    records::remove_image_handler(manager, kind, id, body, &cancel).await
                }
                (&Method::PATCH, [id, "images"]) if kind == RecordKind::Gallery => {
                    records::gallery_image_meta_handler(manager, id, body).await
                }
                _ => method_not_allowed(),
            },
            None => not_found(),
        },

        _ => not_found(),
    };

    finalize_response(resp)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": false, "error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    tracing::warn!("⚠️ No route matched");
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": false, "error": "Not found"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hospital_atoms::documents::MemoryDocumentStore;
    use hospital_atoms::media::{ImageStore, UploadFile, UploadedAsset};
    use hospital_atoms::ImageStoreError;
    use hospital_shared::{AppConfig, ImageServiceConfig};
    use records_block::RecordManager;
    use serde_json::{json, Value};

    struct StubImages;

    #[async_trait]
    impl ImageStore for StubImages {
        async fn upload(&self, file: &UploadFile) -> Result<UploadedAsset, ImageStoreError> {
            Ok(UploadedAsset {
                url: format!("https://res.cloudinary.com/demo/image/upload/v1/hospital/{}", file.file_name),
                remote_id: format!("hospital/{}", file.file_name),
            })
        }

        async fn delete(&self, _remote_id: &str) -> Result<(), ImageStoreError> {
            Ok(())
        }
    }

    fn state() -> Arc<AppState> {
        let config = AppConfig {
            table_name: "test".to_string(),
            image: ImageServiceConfig {
                api_base: "http://localhost".to_string(),
                cloud_name: "demo".to_string(),
                api_key: "k".to_string(),
                api_secret: "s".to_string(),
                upload_preset: None,
                folder: "hospital".to_string(),
            },
        };
        let records = RecordManager::new(Arc::new(MemoryDocumentStore::new()), Arc::new(StubImages));
        Arc::new(AppState::new(config, records))
    }

    fn request(method: &str, uri: &str, body: Value) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(state: &Arc<AppState>, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let resp = function_handler(request(method, uri, body), state.clone()).await.unwrap();
        let status = resp.status();
        let json = serde_json::from_slice(resp.body()).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn create_then_list_departments() {
        let state = state();
        let (status, created) = call(
            &state,
            "POST",
            "/departments",
            json!({
                "fields": {"name": "Cardiology"},
                "files": [{"fileName": "cardio.jpg", "data": "data:image/jpeg;base64,/9j/4AAQ"}]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["imagePublicId"], "hospital/cardio.jpg");

        let (status, listed) = call(&state, "GET", "/departments", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn invalid_create_is_bad_request() {
        let state = state();
        let (status, body) = call(&state, "POST", "/doctors", json!({"fields": {"name": "Dr. X"}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let state = state();
        let (status, _) = call(&state, "GET", "/patients", Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, "PUT", "/doctors", Value::Null).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let (status, _) = call(&state, "GET", "/doctors/missing", Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers() {
        let state = state();
        let resp = function_handler(request("OPTIONS", "/doctors", Value::Null), state).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
    }

    #[tokio::test]
    async fn hero_routes() {
        let state = state();
        let (status, body) = call(
            &state,
            "POST",
            "/hero",
            json!({"files": [{"fileName": "banner.jpg", "contentType": "image/jpeg", "data": "aGVsbG8="}]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["images"].as_array().map(Vec::len), Some(1));

        let (status, _) = call(
            &state,
            "PUT",
            "/hero/5",
            json!({"file": {"fileName": "b.jpg", "data": "aGVsbG8="}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
