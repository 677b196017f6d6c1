use thiserror::Error;

/// Failure reported by a document store read or write.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("document read failed: {0}")]
    Read(String),

    #[error("document write failed: {0}")]
    Write(String),

    #[error("malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },
}

/// Failure reported by the remote image store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ImageStoreError {
    #[error("image store unreachable: {0}")]
    Transport(String),

    #[error("image store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected image store response: {0}")]
    InvalidResponse(String),
}
