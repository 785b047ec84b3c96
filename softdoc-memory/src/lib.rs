//! In-memory document storage backend for softdoc.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is the backend of choice
//! for development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Document-store filter semantics** - `ne` matches missing fields, dotted paths, `$in`/`$nin`
//! - **Partial updates and upserts** - The write primitives soft deletion is built from
//! - **Aggregation** - Match, sort, skip, limit, project and count stages
//!
//! # Quick Start
//!
//! ```ignore
//! use softdoc::{DocumentStore, SoftDeleteOptions, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let pilots = store.soft_collection("pilots", SoftDeleteOptions::builder().override_all().build());
//!
//!     pilots.insert(vec![(bson::Uuid::new(), doc! { "name": "Luke" }.into())]).await?;
//!     pilots.delete(doc! { "name": "Luke" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as softdoc_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
