// Re-export model types, the store seam and URL/signing helpers
pub mod model;
pub mod public_id;
pub mod service;
pub mod signing;

pub use model::{MediaAsset, UploadFile, UploadedAsset};
pub use public_id::derive_public_id;
pub use service::ImageStore;
