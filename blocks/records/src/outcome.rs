use serde::Serialize;

/// Partial failure that did not stop the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degraded {
    /// The image store refused or failed to delete an asset; it is now orphaned.
    AssetDeleteFailed { remote_id: String, reason: String },
    /// No public id could be derived from the URL, so the asset was not deleted.
    PublicIdUnavailable { url: String },
}

impl std::fmt::Display for Degraded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degraded::AssetDeleteFailed { remote_id, reason } => {
                write!(f, "could not delete image {}: {}", remote_id, reason)
            }
            Degraded::PublicIdUnavailable { url } => {
                write!(f, "no public id in {}; image left in place", url)
            }
        }
    }
}

/// Successful result plus whatever degraded along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Degraded>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Vec<Degraded>) -> Self {
        Self { value, warnings }
    }

    pub fn clean(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
