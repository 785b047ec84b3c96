//! Soft deletion.
//!
//! - [`options`] - Plugin configuration and its normalisation
//! - [`scope`] - Deciding which records an invocation observes
//! - [`state`] - The per-record deletion fields
//! - [`collection`] - Collections that delete by marking

pub mod collection;
pub mod options;
pub mod scope;
pub mod state;

pub use collection::{FindOptions, SoftDeleteCollection, SoftUpdateOptions, TypedSoftDeleteCollection};
pub use options::{DeletedByType, IndexField, Method, SoftDeleteOptions, SoftDeleteOptionsBuilder};
pub use scope::{Scope, Variant};
pub use state::{DELETED, DELETED_AT, DELETED_BY, DeletionState, SoftDeletable};
