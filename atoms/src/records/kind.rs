use serde_json::Value;

use crate::documents::{Document, ListQuery, OrderBy};

/// The hero banner lives in a single fixed document.
pub const HERO_COLLECTION: &str = "settings";
pub const HERO_DOC_ID: &str = "hero";

/// Field names shared by every single-image record.
pub const IMAGE_URL_FIELD: &str = "imageUrl";
pub const IMAGE_ID_FIELD: &str = "imagePublicId";
/// Ordered asset list on galleries (and plain URL list on the hero config).
pub const IMAGES_FIELD: &str = "images";

/// How a record kind holds its images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetShape {
    None,
    /// `imageUrl` (+ `imagePublicId` once known)
    Single,
    /// `images: [GalleryImage]`
    Gallery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Doctor,
    Department,
    Empanelment,
    Gallery,
    Appointment,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Doctor,
        RecordKind::Department,
        RecordKind::Empanelment,
        RecordKind::Gallery,
        RecordKind::Appointment,
    ];

    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Doctor => "doctors",
            RecordKind::Department => "departments",
            RecordKind::Empanelment => "empanelments",
            RecordKind::Gallery => "galleries",
            RecordKind::Appointment => "appointments",
        }
    }

    /// Resolve a route segment such as `doctors` into a kind.
    pub fn from_collection(segment: &str) -> Option<RecordKind> {
        Self::ALL.into_iter().find(|k| k.collection() == segment)
    }

    pub fn asset_shape(&self) -> AssetShape {
        match self {
            RecordKind::Doctor | RecordKind::Department | RecordKind::Empanelment => AssetShape::Single,
            RecordKind::Gallery => AssetShape::Gallery,
            RecordKind::Appointment => AssetShape::None,
        }
    }

    /// Display order used by the public pages.
    pub fn default_query(&self) -> ListQuery {
        match self {
            RecordKind::Doctor | RecordKind::Department => ListQuery::ordered(OrderBy::asc("name")),
            RecordKind::Empanelment => ListQuery::ordered(OrderBy::asc("createdAt")),
            RecordKind::Gallery | RecordKind::Appointment => ListQuery::ordered(OrderBy::desc("createdAt")),
        }
    }

    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Doctor => &["name", "specialization"],
            RecordKind::Department => &["name"],
            RecordKind::Empanelment => &["name", "category"],
            RecordKind::Gallery => &["title"],
            RecordKind::Appointment => &["patientName", "phone", "preferredDate"],
        }
    }

    /// Fields the manager owns; callers may not set them directly.
    fn managed_fields(&self) -> &'static [&'static str] {
        match self.asset_shape() {
            AssetShape::Single => &[IMAGE_URL_FIELD, IMAGE_ID_FIELD, "createdAt", "updatedAt", "id"],
            AssetShape::Gallery => &[IMAGES_FIELD, "createdAt", "updatedAt", "id"],
            AssetShape::None => &["createdAt", "updatedAt", "id"],
        }
    }

    /// Check the fields of a new record. Returns the first problem found.
    pub fn validate_new(&self, fields: &Document) -> Result<(), String> {
        for field in self.required_fields() {
            match fields.get(*field) {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                _ => return Err(format!("{} is required", field)),
            }
        }
        self.validate_update(fields)
    }

    /// Check the fields of an edit: required fields may be omitted but not blanked.
    pub fn validate_update(&self, fields: &Document) -> Result<(), String> {
        for field in self.managed_fields() {
            if fields.contains_key(*field) {
                return Err(format!("{} cannot be set directly", field));
            }
        }
        for field in self.required_fields() {
            if let Some(value) = fields.get(*field) {
                if value.as_str().map(str::trim).unwrap_or_default().is_empty() {
                    return Err(format!("{} cannot be empty", field));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection())
    }
}
