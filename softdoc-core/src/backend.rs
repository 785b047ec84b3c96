//! Storage backend abstraction for the document store.
//!
//! The soft-delete layer never touches storage directly. Everything it does is expressed
//! through the [`StoreBackend`] trait: filtered partial updates, counts, aggregations and
//! physical deletes. Backends (in-memory, MongoDB) implement it.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: Object-safe mirror of [`StoreBackend`] for dynamic dispatch
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use softdoc::backend::StoreBackend;
//! use softdoc::update::{Update, UpdateOptions};
//! use softdoc::query::Filter;
//!
//! let result = backend
//!     .update_where(
//!         Some(Filter::eq("side", 0)),
//!         Update::new().set("deleted", true),
//!         true,
//!         UpdateOptions::default(),
//!         "pilots",
//!     )
//!     .await?;
//! assert_eq!(result.matched_count, 2);
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
    update::{FindOneAndUpdateOptions, Update, UpdateOptions, UpdateResult},
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The concurrency model is implementation-specific.
///
/// # Filters
///
/// Every filtered operation takes an `Option<Expr>`; `None` matches every document in
/// the collection. Backends must honour the filter semantics documented in
/// [`query`](crate::query), in particular that `Ne` matches a missing field.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Operations on a collection that does not exist behave as if it were empty, except
/// `update_documents` and `delete_documents` which report
/// [`CollectionNotFound`](crate::error::DocumentStoreError::CollectionNotFound).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (UUID, BSON document) pairs to insert
    /// * `collection` - The name of the collection to insert into. Created automatically if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if an identifier is already taken.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents, matched by identifier, in their entirety.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (UUID, BSON document) pairs with updated content
    /// * `collection` - The name of the collection containing the documents
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Applies a partial update to the documents matching `filter`.
    ///
    /// Only the first match is updated unless `multi` is true. When nothing matches and
    /// `options.upsert` is set, a new document is created from the filter's equalities,
    /// the update's `set_on_insert` fields and its `set` fields.
    ///
    /// # Arguments
    ///
    /// * `filter` - Documents to update; `None` matches all
    /// * `update` - The fields to set or remove
    /// * `multi` - Update every match instead of the first
    /// * `options` - Upsert behaviour
    /// * `collection` - The name of the collection
    ///
    /// # Returns
    ///
    /// The matched, modified and upserted counts.
    async fn update_where(
        &self,
        filter: Option<Expr>,
        update: Update,
        multi: bool,
        options: UpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Atomically updates the first document matching `filter` and returns it.
    ///
    /// # Returns
    ///
    /// The document before or after the update, according to
    /// `options.return_document`, or `None` when nothing matched (and no upsert happened,
    /// or the pre-image of an upsert was requested).
    async fn find_one_and_update(
        &self,
        filter: Option<Expr>,
        update: Update,
        options: FindOneAndUpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>>;

    /// Physically deletes documents by identifier.
    ///
    /// # Arguments
    ///
    /// * `ids` - A vector of document UUIDs to delete
    /// * `collection` - The name of the collection to delete from
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;

    /// Physically deletes every document matching `filter`.
    ///
    /// # Returns
    ///
    /// The number of documents removed.
    async fn delete_where(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;

    /// Retrieves documents by identifier. Missing identifiers are omitted.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents in a collection using a structured query.
    ///
    /// # Arguments
    ///
    /// * `query` - The [`Query`] object specifying filters, sorts, limits, and offsets
    /// * `collection` - The name of the collection to query
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts the documents matching `filter`.
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;

    /// Runs an aggregation pipeline over a collection.
    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>>;

    /// Creates a new, empty collection.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Creates an index on a field in a collection.
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection
    /// * `field` - The name of the field to index
    /// * `unique` - Whether this index should enforce uniqueness constraints
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;

    /// Removes the index on `field`.
    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe counterpart of [`StoreBackend`].
///
/// Implemented for every `StoreBackend`; `Box<dyn DynStoreBackend>` implements
/// `StoreBackend` in turn, so a boxed backend can back a
/// [`DynDocumentStore`](crate::store::DynDocumentStore).
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_where(
        &self,
        filter: Option<Expr>,
        update: Update,
        multi: bool,
        options: UpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<UpdateResult>;
    async fn find_one_and_update(
        &self,
        filter: Option<Expr>,
        update: Update,
        options: FindOneAndUpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>>;
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;
    async fn delete_where(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>>;
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;
    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_documents(self, documents, collection).await
    }

    async fn update_where(
        &self,
        filter: Option<Expr>,
        update: Update,
        multi: bool,
        options: UpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<UpdateResult> {
        StoreBackend::update_where(self, filter, update, multi, options, collection).await
    }

    async fn find_one_and_update(
        &self,
        filter: Option<Expr>,
        update: Update,
        options: FindOneAndUpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        StoreBackend::find_one_and_update(self, filter, update, options, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        StoreBackend::delete_documents(self, ids, collection).await
    }

    async fn delete_where(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::delete_where(self, filter, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::get_documents(self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::aggregate(self, pipeline, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        StoreBackend::add_index(self, collection, field, unique).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_index(self, collection, field).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::insert_documents(&**self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::update_documents(&**self, documents, collection).await
    }

    async fn update_where(
        &self,
        filter: Option<Expr>,
        update: Update,
        multi: bool,
        options: UpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<UpdateResult> {
        DynStoreBackend::update_where(&**self, filter, update, multi, options, collection).await
    }

    async fn find_one_and_update(
        &self,
        filter: Option<Expr>,
        update: Update,
        options: FindOneAndUpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        DynStoreBackend::find_one_and_update(&**self, filter, update, options, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::delete_documents(&**self, ids, collection).await
    }

    async fn delete_where(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        DynStoreBackend::delete_where(&**self, filter, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        DynStoreBackend::get_documents(&**self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        DynStoreBackend::query_documents(&**self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        DynStoreBackend::count_documents(&**self, filter, collection).await
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        DynStoreBackend::aggregate(&**self, pipeline, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::create_collection(&**self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_collection(&**self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        DynStoreBackend::list_collections(&**self).await
    }

    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::add_index(&**self, collection, field, unique).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_index(&**self, collection, field).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        <dyn DynStoreBackend as DynStoreBackend>::shutdown_boxed(self).await
    }
}

/// Builds a backend, usually after connecting to it.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
