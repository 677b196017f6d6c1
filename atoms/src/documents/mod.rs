
// Re-export model types and store implementations
pub mod model;
pub mod service;
pub mod dynamo;
pub mod memory;

pub use model::{Direction, Document, Filter, ListQuery, OrderBy, StoredDocument};
pub use service::DocumentStore;
pub use dynamo::DynamoDocumentStore;
pub use memory::MemoryDocumentStore;
