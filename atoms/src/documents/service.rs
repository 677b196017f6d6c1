use async_trait::async_trait;

use super::model::{Document, ListQuery, StoredDocument};
use crate::error::StoreError;

/// Collection/document addressed store (DynamoDB in production).
///
/// `set` with `merge = true` only overwrites the top-level fields present in
/// `doc`; with `merge = false` the stored document is replaced wholesale.
/// Both forms create the document if it does not exist yet.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<StoredDocument>, StoreError>;

    /// Store a new document under a generated id and return that id.
    async fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    async fn set(&self, collection: &str, id: &str, doc: Document, merge: bool) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
