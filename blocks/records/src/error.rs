use hospital_atoms::{ImageStoreError, StoreError};
use thiserror::Error;

/// Fatal outcome of a manager operation.
///
/// `orphaned` lists the public ids of assets that were uploaded before the
/// operation aborted. Nothing references them any more.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("upload of {file_name} failed: {source}")]
    Upload {
        file_name: String,
        #[source]
        source: ImageStoreError,
        orphaned: Vec<String>,
    },

    #[error("document store error: {source}")]
    Document {
        #[source]
        source: StoreError,
        orphaned: Vec<String>,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("operation cancelled")]
    Cancelled { orphaned: Vec<String> },
}

impl ManagerError {
    pub fn not_found(kind: impl ToString, id: impl Into<String>) -> Self {
        ManagerError::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    pub fn orphaned(&self) -> &[String] {
        match self {
            ManagerError::Upload { orphaned, .. }
            | ManagerError::Document { orphaned, .. }
            | ManagerError::Cancelled { orphaned } => orphaned,
            ManagerError::NotFound { .. } | ManagerError::Invalid(_) => &[],
        }
    }

    pub(crate) fn with_orphans(source: StoreError, orphaned: Vec<String>) -> Self {
        ManagerError::Document { source, orphaned }
    }
}

impl From<StoreError> for ManagerError {
    fn from(source: StoreError) -> Self {
        ManagerError::Document {
            source,
            orphaned: Vec::new(),
        }
    }
}
