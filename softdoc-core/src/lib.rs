//! Soft deletion for document stores.
//!
//! Deleting a record marks it instead of removing it, and the usual reads and updates
//! skip marked records unless asked otherwise. This crate provides:
//!
//! - **Document traits** ([`document`]) - Core traits for defining and serializing documents
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query and filtering API** ([`query`], [`conditions`]) - Filter construction and normalisation
//! - **Updates and pipelines** ([`update`], [`pipeline`]) - Partial updates and aggregation stages
//! - **Collections interface** ([`collection`]) - Raw collection handles that see every record
//! - **Soft deletion** ([`soft`]) - Options, scoping and the soft-delete collections
//! - **Document store** ([`store`]) - Entry point handing out collections
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use softdoc::{DocumentStore, SoftDeleteOptions, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let pilots = store.soft_collection("pilots", SoftDeleteOptions::builder().override_all().build());
//!
//! pilots.delete(doc! { "name": "Anakin" }).await?;
//! let deleted = pilots.find_deleted(Query::new()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as softdoc_core;

pub mod backend;
pub mod collection;
pub mod conditions;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod soft;
pub mod store;
pub mod update;
