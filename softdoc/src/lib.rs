//! Reversible deletion for document stores.
//!
//! Deleting a record through a soft-delete collection marks it (`deleted: true`, plus an
//! optional `deletedAt` timestamp and `deletedBy` actor) instead of removing it. The
//! overridden reads and updates skip marked records, and each gains `_deleted` and
//! `_with_deleted` siblings to reach them. Records can be restored, and purged for good.
//!
//! # Quick Start
//!
//! ```ignore
//! use softdoc::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document, SoftDeletable)]
//! #[document(collection = "pilots")]
//! #[soft_delete(override_methods = "all", deleted_at)]
//! pub struct Pilot {
//!     pub id: Uuid,
//!     pub name: String,
//!     #[serde(flatten)]
//!     #[deletion]
//!     pub deletion: DeletionState,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let pilots = store.typed_soft_collection::<Pilot>();
//!
//!     let mut luke = Pilot { id: Uuid::new(), name: "Luke".into(), deletion: DeletionState::default() };
//!     pilots.insert(vec![luke.clone()]).await?;
//!
//!     pilots.delete_document(&mut luke).await?;
//!     assert!(pilots.find(Query::new(), FindOptions::default()).await?.is_empty());
//!     assert_eq!(pilots.find_deleted(Query::new()).await?.len(), 1);
//!
//!     pilots.restore_document(&mut luke).await?;
//!     store.shutdown().await
//! }
//! ```
//!
//! # Configuration
//!
//! Options come from the `#[soft_delete(...)]` attribute, from
//! [`SoftDeleteOptions::builder`](soft::SoftDeleteOptions::builder), or from the JSON
//! shape the plugin has always accepted:
//!
//! ```ignore
//! let options = SoftDeleteOptions::from_json(serde_json::json!({
//!     "overrideMethods": ["find", "countDocuments"],
//!     "deletedBy": true,
//!     "deletedByType": "string",
//! }))?;
//! let pilots = store.soft_collection("pilots", options);
//! ```
//!
//! # Dynamic Dispatch
//!
//! A store can erase its backend type with [`DocumentStore::into_dyn`](store::DocumentStore::into_dyn):
//!
//! ```ignore
//! let store: DynDocumentStore = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! let pilots = store.typed_soft_collection::<Pilot>();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as softdoc;

pub mod prelude;

pub use softdoc_core::{backend, collection, conditions, document, error, pipeline, query, soft, store, update};
pub use softdoc_macros::{Document, SoftDeletable};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use softdoc_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use softdoc_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
