use async_trait::async_trait;
use hospital_atoms::documents::{Document, DocumentStore, ListQuery, MemoryDocumentStore, StoredDocument};
use hospital_atoms::media::{ImageStore, UploadFile, UploadedAsset};
use hospital_atoms::records::{Department, Doctor, Gallery, RecordKind};
use hospital_atoms::{ImageStoreError, StoreError};
use records_block::gallery::GalleryUpload;
use records_block::{Degraded, ManagerError, RecordManager};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Upload(String),
    Delete(String),
}

/// Image store double that records every call in order.
#[derive(Default)]
struct FakeImages {
    calls: Mutex<Vec<Call>>,
    failing_uploads: Mutex<HashSet<String>>,
    fail_deletes: AtomicBool,
}

impl FakeImages {
    fn fail_upload_of(&self, file_name: &str) {
        self.failing_uploads.lock().unwrap().insert(file_name.to_string());
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(&self, file: &UploadFile) -> Result<UploadedAsset, ImageStoreError> {
        self.calls.lock().unwrap().push(Call::Upload(file.file_name.clone()));
        if self.failing_uploads.lock().unwrap().contains(&file.file_name) {
            return Err(ImageStoreError::Rejected {
                status: 400,
                message: "Invalid image file".to_string(),
            });
        }
        let stem = file.file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&file.file_name);
        Ok(UploadedAsset {
            url: format!("https://res.cloudinary.com/demo/image/upload/v1700000000/hospital/{}.jpg", stem),
            remote_id: format!("hospital/{}", stem),
        })
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ImageStoreError> {
        self.calls.lock().unwrap().push(Call::Delete(remote_id.to_string()));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ImageStoreError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyDocuments {
    inner: MemoryDocumentStore,
    fail_writes: AtomicBool,
}

impl FlakyDocuments {
    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Write("quota exceeded".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.list(collection, query).await
    }

    async fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        self.check()?;
        self.inner.create(collection, doc).await
    }

    async fn set(&self, collection: &str, id: &str, doc: Document, merge: bool) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set(collection, id, doc, merge).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(collection, id).await
    }
}

struct Harness {
    docs: Arc<FlakyDocuments>,
    images: Arc<FakeImages>,
    manager: RecordManager,
    cancel: CancellationToken,
}

fn harness() -> Harness {
    let docs = Arc::new(FlakyDocuments::default());
    let images = Arc::new(FakeImages::default());
    let manager = RecordManager::new(docs.clone(), images.clone());
    Harness {
        docs,
        images,
        manager,
        cancel: CancellationToken::new(),
    }
}

fn fields(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

fn jpeg(name: &str, size: usize) -> UploadFile {
    UploadFile::new(name, "image/jpeg", vec![0xff; size])
}

async fn seed(h: &Harness, collection: &str, id: &str, value: Value) {
    h.docs.inner.set(collection, id, fields(value), false).await.unwrap();
}

#[tokio::test]
async fn create_doctor_with_one_jpeg() {
    let h = harness();
    let outcome = h
        .manager
        .create(
            RecordKind::Doctor,
            fields(json!({"name": "Dr. Meera Rao", "specialization": "Cardiology"})),
            vec![jpeg("meera.jpg", 2 * 1024 * 1024)],
            &h.cancel,
        )
        .await
        .unwrap();

    assert!(!outcome.is_degraded());
    assert_eq!(h.docs.inner.count("doctors").await, 1);

    let doctor: Doctor = h.manager.get_as(RecordKind::Doctor, &outcome.value.id).await.unwrap();
    assert_eq!(
        doctor.image_url.as_deref(),
        Some("https://res.cloudinary.com/demo/image/upload/v1700000000/hospital/meera.jpg")
    );
    assert_eq!(doctor.image_public_id.as_deref(), Some("hospital/meera"));
    assert!(doctor.created_at.is_some());
}

#[tokio::test]
async fn failed_upload_writes_nothing_and_names_the_file() {
    let h = harness();
    h.images.fail_upload_of("second.jpg");

    let err = h
        .manager
        .create(
            RecordKind::Gallery,
            fields(json!({"title": "Inauguration"})),
            vec![jpeg("first.jpg", 10), jpeg("second.jpg", 10), jpeg("third.jpg", 10)],
            &h.cancel,
        )
        .await
        .unwrap_err();

    match &err {
        ManagerError::Upload { file_name, .. } => assert_eq!(file_name, "second.jpg"),
        other => panic!("expected upload failure, got {other:?}"),
    }
    assert!(err.to_string().contains("second.jpg"));
    assert_eq!(err.orphaned(), ["hospital/first".to_string()]);
    assert_eq!(h.docs.inner.count("galleries").await, 0);
    // third file never attempted, nothing deleted
    assert_eq!(
        h.images.calls(),
        vec![Call::Upload("first.jpg".into()), Call::Upload("second.jpg".into())]
    );
}

#[tokio::test]
async fn replacement_upload_failure_leaves_old_image_alone() {
    let h = harness();
    seed(
        &h,
        "departments",
        "cardio",
        json!({
            "name": "Cardiology",
            "imageUrl": "https://res.cloudinary.com/demo/image/upload/v1/hospital/old.jpg",
            "imagePublicId": "hospital/old"
        }),
    )
    .await;
    h.images.fail_upload_of("new.jpg");

    let err = h
        .manager
        .update(
            RecordKind::Department,
            "cardio",
            fields(json!({"description": "Heart care"})),
            Some(jpeg("new.jpg", 10)),
            &h.cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Upload { .. }));
    assert!(h.images.deletes().is_empty());
    let dept: Department = h.manager.get_as(RecordKind::Department, "cardio").await.unwrap();
    assert_eq!(dept.image_public_id.as_deref(), Some("hospital/old"));
    assert_eq!(dept.description, None);
}

#[tokio::test]
async fn replacement_deletes_old_image_only_after_upload() {
    let h = harness();
    seed(
        &h,
        "doctors",
        "d1",
        json!({
            "name": "Dr. Iyer",
            "specialization": "Neurology",
            "imageUrl": "https://res.cloudinary.com/demo/image/upload/v1/hospital/iyer-old.jpg"
        }),
    )
    .await;

    let outcome = h
        .manager
        .update(RecordKind::Doctor, "d1", Document::new(), Some(jpeg("iyer.jpg", 10)), &h.cancel)
        .await
        .unwrap();

    // legacy document had no stored public id; it is derived from the URL
    assert_eq!(
        h.images.calls(),
        vec![Call::Upload("iyer.jpg".into()), Call::Delete("hospital/iyer-old".into())]
    );
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.value.str_field("imagePublicId"), Some("hospital/iyer"));
}

#[tokio::test]
async fn failed_old_image_delete_still_updates_department() {
    let h = harness();
    seed(
        &h,
        "departments",
        "ortho",
        json!({
            "name": "Orthopaedics",
            "imageUrl": "https://res.cloudinary.com/demo/image/upload/v1/hospital/ortho-old.jpg",
            "imagePublicId": "hospital/ortho-old"
        }),
    )
    .await;
    h.images.fail_deletes.store(true, Ordering::SeqCst);

    let outcome = h
        .manager
        .update(RecordKind::Department, "ortho", Document::new(), Some(jpeg("ortho.jpg", 10)), &h.cancel)
        .await
        .unwrap();

    assert_eq!(
        outcome.warnings,
        vec![Degraded::AssetDeleteFailed {
            remote_id: "hospital/ortho-old".to_string(),
            reason: "image store unreachable: connection reset".to_string(),
        }]
    );
    let dept: Department = h.manager.get_as(RecordKind::Department, "ortho").await.unwrap();
    assert_eq!(dept.image_public_id.as_deref(), Some("hospital/ortho"));
    assert!(dept.updated_at.is_some());
}

#[tokio::test]
async fn document_write_failure_reports_new_upload_as_orphan() {
    let h = harness();
    h.docs.fail_writes.store(true, Ordering::SeqCst);

    let err = h
        .manager
        .create(
            RecordKind::Empanelment,
            fields(json!({"name": "Star Health", "category": "Insurance"})),
            vec![jpeg("star.png", 10)],
            &h.cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Document { .. }));
    assert_eq!(err.orphaned(), ["hospital/star".to_string()]);
}

#[tokio::test]
async fn delete_is_not_blocked_by_image_store_errors() {
    let h = harness();
    seed(
        &h,
        "galleries",
        "g1",
        json!({
            "title": "Camp",
            "images": [
                {"url": "https://res.cloudinary.com/demo/image/upload/v1/hospital/a.jpg", "publicId": "hospital/a", "uploadedAt": "2024-01-01T00:00:00Z"},
                {"url": "https://res.cloudinary.com/demo/image/upload/v1/hospital/b.jpg", "uploadedAt": "2024-01-01T00:00:00Z"}
            ]
        }),
    )
    .await;
    h.images.fail_deletes.store(true, Ordering::SeqCst);

    let outcome = h.manager.delete(RecordKind::Gallery, "g1", &h.cancel).await.unwrap();

    assert_eq!(outcome.warnings.len(), 2);
    assert_eq!(h.images.deletes(), vec!["hospital/a".to_string(), "hospital/b".to_string()]);
    assert_eq!(h.docs.inner.count("galleries").await, 0);
}

#[tokio::test]
async fn deleting_empanelment_with_foreign_url_skips_remote_delete() {
    let h = harness();
    seed(
        &h,
        "empanelments",
        "e1",
        json!({"name": "CGHS", "category": "Government", "imageUrl": "https://cdn.example.org/logos/cghs.png"}),
    )
    .await;

    let outcome = h.manager.delete(RecordKind::Empanelment, "e1", &h.cancel).await.unwrap();

    assert!(h.images.calls().is_empty());
    assert_eq!(
        outcome.warnings,
        vec![Degraded::PublicIdUnavailable {
            url: "https://cdn.example.org/logos/cghs.png".to_string()
        }]
    );
    assert_eq!(h.docs.inner.count("empanelments").await, 0);
}

#[tokio::test]
async fn deleting_missing_record_is_not_found() {
    let h = harness();
    let err = h.manager.delete(RecordKind::Doctor, "ghost", &h.cancel).await.unwrap_err();
    assert!(matches!(err, ManagerError::NotFound { .. }));
}

#[tokio::test]
async fn gallery_appends_after_existing_images() {
    let h = harness();
    let created = h
        .manager
        .create_gallery(
            fields(json!({"title": "Wards"})),
            vec![jpeg("w1.jpg", 10).into(), jpeg("w2.jpg", 10).into()],
            &h.cancel,
        )
        .await
        .unwrap();
    let id = created.value.id;

    h.manager
        .append_gallery_images(
            &id,
            vec![
                GalleryUpload {
                    file: jpeg("w3.jpg", 10),
                    name: Some("Night ward".into()),
                    description: None,
                },
                jpeg("w4.jpg", 10).into(),
            ],
            &h.cancel,
        )
        .await
        .unwrap();

    let gallery: Gallery = h.manager.get_as(RecordKind::Gallery, &id).await.unwrap();
    let ids: Vec<_> = gallery.images.iter().filter_map(|i| i.public_id.clone()).collect();
    assert_eq!(ids, vec!["hospital/w1", "hospital/w2", "hospital/w3", "hospital/w4"]);
    assert_eq!(gallery.images[2].name.as_deref(), Some("Night ward"));
}

#[tokio::test]
async fn removing_gallery_image_deletes_remote_and_keeps_order() {
    let h = harness();
    let created = h
        .manager
        .create(
            RecordKind::Gallery,
            fields(json!({"title": "OPD"})),
            vec![jpeg("a.jpg", 10), jpeg("b.jpg", 10), jpeg("c.jpg", 10)],
            &h.cancel,
        )
        .await
        .unwrap();
    let id = created.value.id;
    let url_b = "https://res.cloudinary.com/demo/image/upload/v1700000000/hospital/b.jpg";

    let outcome = h
        .manager
        .remove_asset(RecordKind::Gallery, &id, url_b, &h.cancel)
        .await
        .unwrap();

    assert!(!outcome.is_degraded());
    assert_eq!(h.images.deletes(), vec!["hospital/b".to_string()]);
    let gallery: Gallery = h.manager.get_as(RecordKind::Gallery, &id).await.unwrap();
    let ids: Vec<_> = gallery.images.iter().filter_map(|i| i.public_id.clone()).collect();
    assert_eq!(ids, vec!["hospital/a", "hospital/c"]);
}

#[tokio::test]
async fn removing_unknown_gallery_image_changes_nothing() {
    let h = harness();
    seed(&h, "galleries", "g1", json!({"title": "Camp", "images": []})).await;

    let err = h
        .manager
        .remove_gallery_image("g1", "https://res.cloudinary.com/demo/image/upload/v1/x.jpg", &h.cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::NotFound { .. }));
    assert!(h.images.calls().is_empty());
}

#[tokio::test]
async fn gallery_captions_change_without_touching_images() {
    let h = harness();
    let created = h
        .manager
        .create_gallery(fields(json!({"title": "Lobby"})), vec![jpeg("lobby.jpg", 10).into()], &h.cancel)
        .await
        .unwrap();
    let url = "https://res.cloudinary.com/demo/image/upload/v1700000000/hospital/lobby.jpg";

    h.manager
        .update_gallery_image_meta(&created.value.id, url, Some("Main lobby".into()), Some("Renovated".into()))
        .await
        .unwrap();

    let gallery: Gallery = h.manager.get_as(RecordKind::Gallery, &created.value.id).await.unwrap();
    assert_eq!(gallery.images[0].name.as_deref(), Some("Main lobby"));
    assert_eq!(gallery.images[0].description.as_deref(), Some("Renovated"));
    assert_eq!(h.images.calls(), vec![Call::Upload("lobby.jpg".into())]);
}

#[tokio::test]
async fn single_image_can_be_cleared() {
    let h = harness();
    let url = "https://res.cloudinary.com/demo/image/upload/v1/hospital/logo.jpg";
    seed(&h, "empanelments", "e1", json!({"name": "ECHS", "category": "Government", "imageUrl": url})).await;

    h.manager
        .remove_asset(RecordKind::Empanelment, "e1", url, &h.cancel)
        .await
        .unwrap();

    let doc = h.manager.get(RecordKind::Empanelment, "e1").await.unwrap();
    assert_eq!(doc.data.get("imageUrl"), Some(&Value::Null));
    assert_eq!(h.images.deletes(), vec!["hospital/logo".to_string()]);
}

#[tokio::test]
async fn cancelled_create_uploads_nothing() {
    let h = harness();
    h.cancel.cancel();

    let err = h
        .manager
        .create(
            RecordKind::Doctor,
            fields(json!({"name": "Dr. Sen", "specialization": "ENT"})),
            vec![jpeg("sen.jpg", 10)],
            &h.cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Cancelled { .. }));
    assert!(h.images.calls().is_empty());
    assert_eq!(h.docs.inner.count("doctors").await, 0);
}

#[tokio::test]
async fn invalid_fields_are_rejected_before_upload() {
    let h = harness();
    let err = h
        .manager
        .create(
            RecordKind::Doctor,
            fields(json!({"name": "Dr. Sen"})),
            vec![jpeg("sen.jpg", 10)],
            &h.cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Invalid(_)));
    assert!(h.images.calls().is_empty());
}

#[tokio::test]
async fn appointments_are_asset_free_records() {
    let h = harness();
    let booking = fields(json!({
        "patientName": "Anil Kumar",
        "phone": "9876543210",
        "preferredDate": "2026-11-02"
    }));

    h.manager
        .create(RecordKind::Appointment, booking.clone(), Vec::new(), &h.cancel)
        .await
        .unwrap();
    let err = h
        .manager
        .create(RecordKind::Appointment, booking, vec![jpeg("x.jpg", 1)], &h.cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Invalid(_)));
    assert_eq!(h.manager.list(RecordKind::Appointment).await.unwrap().len(), 1);
}

#[tokio::test]
async fn hero_banner_lifecycle() {
    let h = harness();
    assert!(h.manager.hero().await.unwrap().images.is_empty());

    let hero = h
        .manager
        .add_hero_images(vec![jpeg("h1.jpg", 10), jpeg("h2.jpg", 10)], &h.cancel)
        .await
        .unwrap()
        .value;
    assert_eq!(hero.images.len(), 2);

    let hero = h
        .manager
        .replace_hero_image(0, jpeg("h3.jpg", 10), &h.cancel)
        .await
        .unwrap()
        .value;
    assert!(hero.images[0].ends_with("/hospital/h3.jpg"));
    assert!(hero.images[1].ends_with("/hospital/h2.jpg"));

    let second = hero.images[1].clone();
    let hero = h.manager.remove_hero_image(&second, &h.cancel).await.unwrap().value;
    assert_eq!(hero.images.len(), 1);

    assert_eq!(h.images.deletes(), vec!["hospital/h1".to_string(), "hospital/h2".to_string()]);
    assert_eq!(h.manager.hero().await.unwrap().images, hero.images);
}

#[tokio::test]
async fn hero_replace_out_of_range_uploads_nothing() {
    let h = harness();
    let err = h
        .manager
        .replace_hero_image(3, jpeg("h.jpg", 10), &h.cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Invalid(_)));
    assert!(h.images.calls().is_empty());
}

#[tokio::test]
async fn doctors_list_in_name_order() {
    let h = harness();
    for name in ["Dr. Zoya", "Dr. Arjun", "Dr. Maya"] {
        h.manager
            .create(
                RecordKind::Doctor,
                fields(json!({"name": name, "specialization": "General"})),
                Vec::new(),
                &h.cancel,
            )
            .await
            .unwrap();
    }

    let names: Vec<_> = h
        .manager
        .list(RecordKind::Doctor)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|d| d.str_field("name").map(str::to_string))
        .collect();
    assert_eq!(names, vec!["Dr. Arjun", "Dr. Maya", "Dr. Zoya"]);
}

#[tokio::test]
async fn reupload_under_same_public_id_keeps_the_asset() {
    let h = harness();
    seed(
        &h,
        "doctors",
        "d1",
        json!({
            "name": "Dr. Meera",
            "specialization": "Cardiology",
            "imageUrl": "https://res.cloudinary.com/demo/image/upload/v1600000000/hospital/meera.jpg",
            "imagePublicId": "hospital/meera"
        }),
    )
    .await;

    let outcome = h
        .manager
        .update(RecordKind::Doctor, "d1", Document::new(), Some(jpeg("meera.jpg", 20)), &h.cancel)
        .await
        .unwrap();

    assert!(!outcome.is_degraded());
    assert_eq!(h.images.calls(), vec![Call::Upload("meera.jpg".to_string())]);
    let doctor: Doctor = h.manager.get_as(RecordKind::Doctor, "d1").await.unwrap();
    assert_eq!(doctor.image_public_id.as_deref(), Some("hospital/meera"));
}

#[tokio::test]
async fn hero_reupload_under_same_public_id_keeps_the_asset() {
    let h = harness();
    h.manager
        .add_hero_images(vec![jpeg("h1.jpg", 10)], &h.cancel)
        .await
        .unwrap();

    let hero = h
        .manager
        .replace_hero_image(0, jpeg("h1.jpg", 12), &h.cancel)
        .await
        .unwrap()
        .value;

    assert!(h.images.deletes().is_empty());
    assert!(hero.images[0].ends_with("/hospital/h1.jpg"));
}

#[tokio::test]
async fn failed_gallery_append_leaves_gallery_unchanged() {
    let h = harness();
    let created = h
        .manager
        .create_gallery(fields(json!({"title": "Wards"})), vec![jpeg("w1.jpg", 10).into()], &h.cancel)
        .await
        .unwrap();
    let id = created.value.id;
    h.images.fail_upload_of("w3.jpg");

    let err = h
        .manager
        .append_gallery_images(
            &id,
            vec![jpeg("w2.jpg", 10).into(), jpeg("w3.jpg", 10).into(), jpeg("w4.jpg", 10).into()],
            &h.cancel,
        )
        .await
        .unwrap_err();

    match &err {
        ManagerError::Upload { file_name, .. } => assert_eq!(file_name, "w3.jpg"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.orphaned().to_vec(), vec!["hospital/w2".to_string()]);
    assert!(!h.images.calls().contains(&Call::Upload("w4.jpg".to_string())));

    let gallery: Gallery = h.manager.get_as(RecordKind::Gallery, &id).await.unwrap();
    let ids: Vec<_> = gallery.images.iter().filter_map(|i| i.public_id.clone()).collect();
    assert_eq!(ids, vec!["hospital/w1"]);
}

#[tokio::test]
async fn gallery_update_removes_and_appends_in_one_write() {
    let h = harness();
    let created = h
        .manager
        .create_gallery(
            fields(json!({"title": "OPD"})),
            vec![jpeg("a.jpg", 10).into(), jpeg("b.jpg", 10).into(), jpeg("c.jpg", 10).into()],
            &h.cancel,
        )
        .await
        .unwrap();
    let id = created.value.id;
    let url_a = "https://res.cloudinary.com/demo/image/upload/v1700000000/hospital/a.jpg".to_string();

    h.manager
        .update_gallery(
            &id,
            fields(json!({"title": "OPD block"})),
            vec![jpeg("d.jpg", 10).into(), jpeg("e.jpg", 10).into()],
            vec![url_a],
            &h.cancel,
        )
        .await
        .unwrap();

    assert_eq!(h.images.deletes(), vec!["hospital/a".to_string()]);
    let gallery: Gallery = h.manager.get_as(RecordKind::Gallery, &id).await.unwrap();
    let ids: Vec<_> = gallery.images.iter().filter_map(|i| i.public_id.clone()).collect();
    assert_eq!(ids, vec!["hospital/b", "hospital/c", "hospital/d", "hospital/e"]);
    assert_eq!(gallery.title, "OPD block");
}

#[tokio::test]
async fn cancelled_replace_and_delete_leave_record_alone() {
    let h = harness();
    let original = json!({
        "name": "Radiology",
        "imageUrl": "https://res.cloudinary.com/demo/image/upload/v1/hospital/xray.jpg",
        "imagePublicId": "hospital/xray"
    });
    seed(&h, "departments", "r1", original.clone()).await;
    h.cancel.cancel();

    let err = h
        .manager
        .update(RecordKind::Department, "r1", fields(json!({"name": "Imaging"})), Some(jpeg("ct.jpg", 10)), &h.cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Cancelled { .. }));

    let err = h.manager.delete(RecordKind::Department, "r1", &h.cancel).await.unwrap_err();
    assert!(matches!(err, ManagerError::Cancelled { .. }));

    assert!(h.images.calls().is_empty());
    let doc = h.manager.get(RecordKind::Department, "r1").await.unwrap();
    assert_eq!(Value::Object(doc.data), original);
}
