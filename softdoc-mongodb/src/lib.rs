//! MongoDB backend implementation for softdoc.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters, partial updates, upserts and aggregation pipelines are translated to their
//! native MongoDB form, so soft deletion runs server-side.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! softdoc = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use softdoc::{backend::StoreBackendBuilder, mongodb::MongoDbStore, DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "fleet")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let pilots = store.typed_soft_collection::<Pilot>();
//!     pilots.ensure_indexes().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as softdoc_mongodb;

pub mod store;
pub(crate) mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
