//! Raw collection handles.
//!
//! These are the undecorated model operations: they see every record, deleted or not.
//! The soft-delete layer in [`soft`](crate::soft) is built on top of them and hands one
//! back through `raw()` when a caller needs to bypass it.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped collection with explicit BSON documents
//! - [`TypedCollection`] - Type-safe collection for a specific document type
//!
//! # Example
//!
//! ```ignore
//! use softdoc::{Document, query::Filter, update::{Update, UpdateOptions}};
//!
//! let pilots = store.typed_collection::<Pilot>();
//! pilots.insert(vec![luke.clone()]).await?;
//!
//! let result = pilots
//!     .update_many(Filter::eq("side", 0), Update::new().set("rank", "jedi"), UpdateOptions::default())
//!     .await?;
//! ```

use bson::{Bson, Uuid};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    conditions::Conditions,
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Filter, Query},
    update::{FindOneAndUpdateOptions, Update, UpdateOptions, UpdateResult},
};

/// An untyped collection with a reference to a storage backend.
///
/// All documents are represented as BSON values.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<B: StoreBackend> Clone for Collection<'_, B> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), backend: self.backend }
    }
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend this collection talks to.
    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Inserts new documents into the collection.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (ID, BSON document) pairs to insert
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if an identifier
    /// is already taken or the backend fails.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, self.name())
            .await
    }

    /// Replaces existing documents, matched by identifier.
    pub async fn replace(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(documents, self.name())
            .await
    }

    /// Writes a document back, inserting it when its identifier is unknown.
    pub async fn save(&self, id: Uuid, document: Bson) -> DocumentStoreResult<()> {
        let exists = !self
            .backend
            .get_documents(vec![id], self.name())
            .await?
            .is_empty();

        if exists {
            self.replace(vec![(id, document)]).await
        } else {
            self.insert(vec![(id, document)]).await
        }
    }

    /// Retrieves documents by identifier. Unknown identifiers are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<Bson>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(ids.into_iter().map(Into::into).collect(), self.name())
            .await
    }

    /// Runs a structured query.
    ///
    /// # Arguments
    ///
    /// * `query` - The [`Query`] specifying filters, sorting, limits, and offsets
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        self.backend
            .query_documents(query, self.name())
            .await
    }

    /// Returns the first document matching `conditions`.
    pub async fn find_one(
        &self,
        conditions: impl Into<Conditions>,
    ) -> DocumentStoreResult<Option<Bson>> {
        let query = Query {
            limit: Some(1),
            ..Query::filtered(conditions.into().into_expr())
        };

        Ok(self.find(query).await?.into_iter().next())
    }

    /// Counts the documents matching `conditions`.
    pub async fn count(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(conditions.into().into_expr(), self.name())
            .await
    }

    /// Updates the first document matching `conditions`.
    pub async fn update_one(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: UpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_where(conditions, update, false, options).await
    }

    /// Updates every document matching `conditions`.
    pub async fn update_many(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: UpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_where(conditions, update, true, options).await
    }

    /// Updates the first match, or every match when `multi` is set.
    pub async fn update_where(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        multi: bool,
        options: UpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.backend
            .update_where(conditions.into().into_expr(), update, multi, options, self.name())
            .await
    }

    /// Updates the first document matching `conditions` and returns it.
    pub async fn find_one_and_update(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<Bson>> {
        self.backend
            .find_one_and_update(conditions.into().into_expr(), update, options, self.name())
            .await
    }

    /// Runs an aggregation pipeline.
    pub async fn aggregate(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Bson>> {
        self.backend
            .aggregate(pipeline, self.name())
            .await
    }

    /// Physically deletes documents by identifier.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(ids.into_iter().map(Into::into).collect(), self.name())
            .await
    }

    /// Physically deletes every document matching `conditions`, returning how many went.
    pub async fn delete_many(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.backend
            .delete_where(conditions.into().into_expr(), self.name())
            .await
    }

    /// Creates an index on `field`.
    pub async fn add_index(&self, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.backend
            .add_index(self.name(), field, unique)
            .await
    }
}

/// A collection of a specific [`Document`] type.
///
/// Wraps a [`Collection`] and converts between `D` and BSON at the edges.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    inner: Collection<'a, B>,
    _marker: PhantomData<D>,
}

impl<B: StoreBackend, D: Document> Clone for TypedCollection<'_, B, D> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), _marker: PhantomData }
    }
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { inner: Collection::new(name, backend), _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped view of this collection.
    pub fn untyped(&self) -> &Collection<'a, B> {
        &self.inner
    }

    /// Views the same collection as a different document type.
    pub fn with_type<T: Document>(&self) -> TypedCollection<'a, B, T> {
        TypedCollection { inner: self.inner.clone(), _marker: PhantomData }
    }

    /// Inserts new documents into the collection.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if serialization or insertion fails.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.inner
            .insert(
                documents
                    .iter()
                    .map(DocumentExt::to_entry)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )
            .await
    }

    /// Replaces existing documents, matched by identifier.
    pub async fn replace(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.inner
            .replace(
                documents
                    .iter()
                    .map(DocumentExt::to_entry)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )
            .await
    }

    /// Validates the document and writes it back.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Document::validate`] reports, in which case nothing is written.
    pub async fn save(&self, document: &D) -> DocumentStoreResult<()> {
        self.save_with(document, true).await
    }

    /// Writes the document back, running [`Document::validate`] only when `validate` is set.
    pub async fn save_with(&self, document: &D, validate: bool) -> DocumentStoreResult<()> {
        if validate {
            document.validate()?;
        }

        let (id, bson) = document.to_entry()?;
        self.inner.save(id, bson).await
    }

    /// Retrieves documents by identifier. Unknown identifiers are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<D>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        decode_all(self.inner.get(ids).await?)
    }

    /// Retrieves one document by identifier.
    pub async fn get_one(&self, id: impl Into<Uuid>) -> DocumentStoreResult<Option<D>> {
        self.find_one(Filter::id(id)).await
    }

    /// Runs a structured query.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        decode_all(self.inner.find(query).await?)
    }

    /// Returns the first document matching `conditions`.
    pub async fn find_one(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<Option<D>> {
        self.inner
            .find_one(conditions)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Counts the documents matching `conditions`.
    pub async fn count(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.count(conditions).await
    }

    /// Updates the first document matching `conditions`.
    pub async fn update_one(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: UpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_one(conditions, update, options).await
    }

    /// Updates every document matching `conditions`.
    pub async fn update_many(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: UpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_many(conditions, update, options).await
    }

    /// Updates the first document matching `conditions` and returns it.
    pub async fn find_one_and_update(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<D>> {
        self.inner
            .find_one_and_update(conditions, update, options)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Runs an aggregation pipeline. Stages may reshape documents, so results stay BSON.
    pub async fn aggregate(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.aggregate(pipeline).await
    }

    /// Physically deletes documents by identifier.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.inner.delete(ids).await
    }

    /// Physically deletes every document matching `conditions`.
    pub async fn delete_many(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.delete_many(conditions).await
    }
}

pub(crate) fn decode_all<D: Document>(documents: Vec<Bson>) -> DocumentStoreResult<Vec<D>> {
    documents
        .into_iter()
        .map(D::from_bson)
        .collect()
}
