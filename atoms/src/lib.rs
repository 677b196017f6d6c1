//! Building blocks for the hospital site's content service.
//!
//! Everything in here takes its store clients as arguments; constructing
//! DynamoDB or image-service clients is left to `hospital-shared`.

pub mod documents;
pub mod error;
pub mod media;
pub mod records;

pub use error::{ImageStoreError, StoreError};
