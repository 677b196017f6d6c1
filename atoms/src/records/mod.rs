
// Re-export record models and the kind table
pub mod kind;
pub mod model;

pub use kind::{
    AssetShape, RecordKind, HERO_COLLECTION, HERO_DOC_ID, IMAGES_FIELD, IMAGE_ID_FIELD, IMAGE_URL_FIELD,
};
pub use model::{decode, Appointment, Department, Doctor, EmpanelmentItem, Gallery, GalleryImage, HeroConfig};
