//! Asset-backed record management for the hospital site.
//!
//! [`RecordManager`] keeps the image store and the document store in step
//! when doctors, departments, empanelments, galleries and the hero banner are
//! created, edited or deleted. When both cannot be kept clean it leaves an
//! orphaned image behind rather than a document pointing at a missing one.

pub mod error;
pub mod gallery;
pub mod hero;
pub mod http;
pub mod manager;
pub mod outcome;

pub use error::ManagerError;
pub use manager::RecordManager;
pub use outcome::{Degraded, Outcome};
