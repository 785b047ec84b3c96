//! Collections with soft deletion.
//!
//! A [`SoftDeleteCollection`] decorates a raw [`Collection`]. Deleting marks records
//! instead of removing them. Every overridden read or update gains two siblings:
//!
//! | call                   | observes                         |
//! |------------------------|----------------------------------|
//! | `find`                 | records that are not deleted     |
//! | `find_deleted`         | deleted records                  |
//! | `find_with_deleted`    | every record                     |
//!
//! Methods that are not overridden keep their plain behaviour and their siblings fail with
//! [`MethodNotAvailable`](crate::error::DocumentStoreError::MethodNotAvailable).
//! [`purge`](SoftDeleteCollection::purge) and [`raw`](SoftDeleteCollection::raw) bypass the
//! layer entirely.
//!
//! ```ignore
//! let pilots = store.soft_collection("pilots", SoftDeleteOptions::builder().override_all().build());
//!
//! pilots.delete_as(doc! { "side": 1 }, actor).await?;
//! assert_eq!(pilots.count_documents((), FindOptions::default()).await?, 2);
//! assert_eq!(pilots.count_documents_deleted(()).await?, 1);
//! ```

use bson::{Bson, DateTime, Uuid};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    collection::{Collection, TypedCollection, decode_all},
    conditions::{Conditions, truthy},
    document::DocumentExt,
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Filter, Query},
    soft::{
        options::{IndexField, Method, SoftDeleteOptions},
        scope::{Variant, resolve},
        state::{DELETED, DELETED_AT, DELETED_BY, DeletionState, SoftDeletable},
    },
    update::{FindOneAndUpdateOptions, ReturnDocument, Update, UpdateOptions, UpdateResult},
};

/// Caller options for reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Let the default form of an overridden method see deleted records too.
    pub with_deleted: bool,
}

impl FindOptions {
    /// Options that include deleted records.
    pub fn including_deleted() -> Self {
        FindOptions { with_deleted: true }
    }
}

/// Caller options for updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftUpdateOptions {
    /// Insert a record when nothing matches. The record starts out not deleted unless the
    /// update or the conditions say otherwise.
    pub upsert: bool,
    /// Let the default form of an overridden method see deleted records too.
    pub with_deleted: bool,
    /// Update every match. Only read by the legacy `update` family.
    pub multi: bool,
    /// Which version `find_one_and_update` returns.
    pub return_document: ReturnDocument,
}

/// An untyped collection with soft deletion.
#[derive(Debug)]
pub struct SoftDeleteCollection<'a, B: StoreBackend> {
    raw: Collection<'a, B>,
    options: SoftDeleteOptions,
}

impl<B: StoreBackend> Clone for SoftDeleteCollection<'_, B> {
    fn clone(&self) -> Self {
        Self { raw: self.raw.clone(), options: self.options.clone() }
    }
}

impl<'a, B: StoreBackend> SoftDeleteCollection<'a, B> {
    /// Decorates `raw` with the given options.
    pub fn new(raw: Collection<'a, B>, options: SoftDeleteOptions) -> Self {
        Self { raw, options }
    }

    pub fn name(&self) -> &str {
        self.raw.name()
    }

    pub fn options(&self) -> &SoftDeleteOptions {
        &self.options
    }

    /// The undecorated collection. Reads through it see every record and its deletes are
    /// physical.
    pub fn raw(&self) -> &Collection<'a, B> {
        &self.raw
    }

    fn scoped(
        &self,
        method: Method,
        variant: Variant,
        with_deleted: bool,
        conditions: Conditions,
    ) -> DocumentStoreResult<Option<Expr>> {
        Ok(resolve(&self.options, method, variant, with_deleted)?.restrict(&self.options, conditions.into_expr()))
    }

    async fn count_scoped(
        &self,
        method: Method,
        variant: Variant,
        with_deleted: bool,
        conditions: Conditions,
    ) -> DocumentStoreResult<u64> {
        let filter = self.scoped(method, variant, with_deleted, conditions)?;
        self.raw.count(filter).await
    }

    /// Counts matching records that are not deleted (every record when `count` is not overridden).
    pub async fn count(&self, conditions: impl Into<Conditions>, options: FindOptions) -> DocumentStoreResult<u64> {
        self.count_scoped(Method::Count, Variant::Default, options.with_deleted, conditions.into()).await
    }

    pub async fn count_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.count_scoped(Method::Count, Variant::Deleted, false, conditions.into()).await
    }

    pub async fn count_with_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.count_scoped(Method::Count, Variant::WithDeleted, false, conditions.into()).await
    }

    pub async fn count_documents(
        &self,
        conditions: impl Into<Conditions>,
        options: FindOptions,
    ) -> DocumentStoreResult<u64> {
        self.count_scoped(Method::CountDocuments, Variant::Default, options.with_deleted, conditions.into()).await
    }

    pub async fn count_documents_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.count_scoped(Method::CountDocuments, Variant::Deleted, false, conditions.into()).await
    }

    pub async fn count_documents_with_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.count_scoped(Method::CountDocuments, Variant::WithDeleted, false, conditions.into()).await
    }

    async fn find_scoped(&self, variant: Variant, with_deleted: bool, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        let scope = resolve(&self.options, Method::Find, variant, with_deleted)?;
        self.raw.find(query.and_filter(scope.filter(&self.options))).await
    }

    /// Runs `query` over the records that are not deleted. Sorting and paging apply
    /// after the deleted records are filtered out.
    pub async fn find(&self, query: Query, options: FindOptions) -> DocumentStoreResult<Vec<Bson>> {
        self.find_scoped(Variant::Default, options.with_deleted, query).await
    }

    pub async fn find_deleted(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        self.find_scoped(Variant::Deleted, false, query).await
    }

    pub async fn find_with_deleted(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        self.find_scoped(Variant::WithDeleted, false, query).await
    }

    async fn find_one_scoped(
        &self,
        variant: Variant,
        with_deleted: bool,
        conditions: Conditions,
    ) -> DocumentStoreResult<Option<Bson>> {
        let filter = self.scoped(Method::FindOne, variant, with_deleted, conditions)?;
        self.raw.find_one(filter).await
    }

    pub async fn find_one(
        &self,
        conditions: impl Into<Conditions>,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Bson>> {
        self.find_one_scoped(Variant::Default, options.with_deleted, conditions.into()).await
    }

    pub async fn find_one_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<Option<Bson>> {
        self.find_one_scoped(Variant::Deleted, false, conditions.into()).await
    }

    pub async fn find_one_with_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<Option<Bson>> {
        self.find_one_scoped(Variant::WithDeleted, false, conditions.into()).await
    }

    async fn find_one_and_update_scoped(
        &self,
        variant: Variant,
        conditions: Conditions,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<Bson>> {
        let filter = self.scoped(Method::FindOneAndUpdate, variant, options.with_deleted, conditions)?;
        let update = self.prepare_upsert(update, options.upsert, filter.as_ref());

        self.raw
            .find_one_and_update(
                filter,
                update,
                FindOneAndUpdateOptions { upsert: options.upsert, return_document: options.return_document },
            )
            .await
    }

    pub async fn find_one_and_update(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<Bson>> {
        self.find_one_and_update_scoped(Variant::Default, conditions.into(), update, options).await
    }

    pub async fn find_one_and_update_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<Bson>> {
        self.find_one_and_update_scoped(Variant::Deleted, conditions.into(), update, options).await
    }

    pub async fn find_one_and_update_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<Bson>> {
        self.find_one_and_update_scoped(Variant::WithDeleted, conditions.into(), update, options).await
    }

    async fn update_scoped(
        &self,
        method: Method,
        variant: Variant,
        conditions: Conditions,
        update: Update,
        options: SoftUpdateOptions,
        multi: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let filter = self.scoped(method, variant, options.with_deleted, conditions)?;
        let update = self.prepare_upsert(update, options.upsert, filter.as_ref());

        self.raw
            .update_where(filter, update, multi, UpdateOptions { upsert: options.upsert })
            .await
    }

    /// Legacy update: the first match, or every match when `options.multi` is set.
    pub async fn update(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::Update, Variant::Default, conditions.into(), update, options, options.multi).await
    }

    pub async fn update_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::Update, Variant::Deleted, conditions.into(), update, options, options.multi).await
    }

    pub async fn update_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::Update, Variant::WithDeleted, conditions.into(), update, options, options.multi).await
    }

    pub async fn update_one(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::UpdateOne, Variant::Default, conditions.into(), update, options, false).await
    }

    pub async fn update_one_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::UpdateOne, Variant::Deleted, conditions.into(), update, options, false).await
    }

    pub async fn update_one_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::UpdateOne, Variant::WithDeleted, conditions.into(), update, options, false).await
    }

    pub async fn update_many(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::UpdateMany, Variant::Default, conditions.into(), update, options, true).await
    }

    pub async fn update_many_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::UpdateMany, Variant::Deleted, conditions.into(), update, options, true).await
    }

    pub async fn update_many_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update_scoped(Method::UpdateMany, Variant::WithDeleted, conditions.into(), update, options, true).await
    }

    async fn aggregate_scoped(
        &self,
        variant: Variant,
        with_deleted: bool,
        pipeline: Pipeline,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let scope = resolve(&self.options, Method::Aggregate, variant, with_deleted)?;
        let pipeline = match scope.filter(&self.options) {
            Some(filter) => pipeline.prepend_match(filter),
            None => pipeline,
        };

        self.raw.aggregate(pipeline).await
    }

    /// Runs `pipeline` with a leading match stage that drops deleted records.
    pub async fn aggregate(&self, pipeline: Pipeline, options: FindOptions) -> DocumentStoreResult<Vec<Bson>> {
        self.aggregate_scoped(Variant::Default, options.with_deleted, pipeline).await
    }

    pub async fn aggregate_deleted(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Bson>> {
        self.aggregate_scoped(Variant::Deleted, false, pipeline).await
    }

    pub async fn aggregate_with_deleted(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Bson>> {
        self.aggregate_scoped(Variant::WithDeleted, false, pipeline).await
    }

    /// Marks every record matching `conditions` deleted, whatever its current state.
    ///
    /// `deletedAt` is stamped when enabled. Returns the raw update outcome, so
    /// `matched_count` counts already-deleted records too.
    pub async fn delete(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<UpdateResult> {
        self.delete_matching(conditions.into(), None).await
    }

    /// Like [`delete`](Self::delete), also recording `actor` in `deletedBy` when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] when `actor` is not of the configured
    /// `deletedByType`.
    pub async fn delete_as(
        &self,
        conditions: impl Into<Conditions>,
        actor: impl Into<Bson>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.delete_matching(conditions.into(), Some(actor.into())).await
    }

    pub async fn delete_by_id(&self, id: impl Into<Uuid>) -> DocumentStoreResult<UpdateResult> {
        self.delete_matching(Filter::id(id).into(), None).await
    }

    pub async fn delete_by_id_as(
        &self,
        id: impl Into<Uuid>,
        actor: impl Into<Bson>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.delete_matching(Filter::id(id).into(), Some(actor.into())).await
    }

    async fn delete_matching(&self, conditions: Conditions, actor: Option<Bson>) -> DocumentStoreResult<UpdateResult> {
        let update = self.deletion_update(actor)?;
        let result = self
            .raw
            .update_many(conditions, update, UpdateOptions::default())
            .await?;

        debug!(
            collection = self.name(),
            matched = result.matched_count,
            modified = result.modified_count,
            "soft-deleted records",
        );

        Ok(result)
    }

    fn deletion_update(&self, actor: Option<Bson>) -> DocumentStoreResult<Update> {
        let mut update = Update::new().set(DELETED, true);

        if self.options.deleted_at {
            update = update.set(DELETED_AT, DateTime::now());
        }
        if self.options.deleted_by {
            if let Some(actor) = actor {
                self.check_actor(&actor)?;
                update = update.set(DELETED_BY, actor);
            }
        }

        Ok(update)
    }

    pub(crate) fn check_actor(&self, actor: &Bson) -> DocumentStoreResult<()> {
        if self.options.deleted_by_type.accepts(actor) {
            Ok(())
        } else {
            Err(DocumentStoreError::InvalidArgument(format!(
                "deletedBy must be of type {:?}, got {}",
                self.options.deleted_by_type, actor,
            )))
        }
    }

    /// Clears the deletion state of every record matching `conditions`.
    pub async fn restore(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<UpdateResult> {
        let update = Update::new()
            .set(DELETED, false)
            .unset(DELETED_AT)
            .unset(DELETED_BY);

        let result = self
            .raw
            .update_many(conditions, update, UpdateOptions::default())
            .await?;

        debug!(
            collection = self.name(),
            matched = result.matched_count,
            modified = result.modified_count,
            "restored records",
        );

        Ok(result)
    }

    /// Inserts records, normalising their flag to a boolean that defaults to `false`.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.raw
            .insert(
                documents
                    .into_iter()
                    .map(|(id, document)| (id, with_flag(document)))
                    .collect(),
            )
            .await
    }

    /// Creates the indexes `indexFields` asks for and returns the indexed fields.
    pub async fn ensure_indexes(&self) -> DocumentStoreResult<Vec<IndexField>> {
        let mut indexed = Vec::new();

        for field in IndexField::ALL {
            if self.options.indexes(field) {
                self.raw.add_index(field.name(), false).await?;
                indexed.push(field);
            }
        }

        debug!(collection = self.name(), ?indexed, "ensured soft-delete indexes");

        Ok(indexed)
    }

    /// Writes `deleted = false` on records that have no flag yet.
    pub async fn backfill(&self) -> DocumentStoreResult<UpdateResult> {
        self.raw
            .update_many(
                Filter::not_exists(DELETED),
                Update::new().set(DELETED, false),
                UpdateOptions::default(),
            )
            .await
    }

    /// Physically deletes every record matching `conditions`.
    pub async fn purge(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.raw.delete_many(conditions).await
    }

    /// Physically deletes records by identifier.
    pub async fn purge_by_ids<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.raw.delete(ids).await
    }

    /// Makes a record created by an upsert start out not deleted, unless the update or the
    /// conditions already decide its flag.
    fn prepare_upsert(&self, update: Update, upsert: bool, filter: Option<&Expr>) -> Update {
        let pinned = filter.is_some_and(|filter| {
            filter
                .equalities()
                .iter()
                .any(|(field, _)| *field == DELETED)
        });

        if upsert && !pinned && !update.touches(DELETED) {
            update.set_on_insert(DELETED, false)
        } else {
            update
        }
    }
}

fn with_flag(document: Bson) -> Bson {
    match document {
        Bson::Document(mut document) => {
            let deleted = document.get(DELETED).is_some_and(truthy);
            document.insert(DELETED, deleted);
            Bson::Document(document)
        }
        other => other,
    }
}

/// A collection of [`SoftDeletable`] documents.
///
/// Options come from [`SoftDeletable::soft_delete_options`]. Besides the query methods of
/// [`SoftDeleteCollection`] it can delete and restore individual documents, which runs
/// document validation according to `validateBeforeDelete` / `validateBeforeRestore`.
#[derive(Debug)]
pub struct TypedSoftDeleteCollection<'a, B: StoreBackend, D: SoftDeletable> {
    inner: SoftDeleteCollection<'a, B>,
    typed: TypedCollection<'a, B, D>,
}

impl<B: StoreBackend, D: SoftDeletable> Clone for TypedSoftDeleteCollection<'_, B, D> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), typed: self.typed.clone() }
    }
}

impl<'a, B: StoreBackend, D: SoftDeletable> TypedSoftDeleteCollection<'a, B, D> {
    pub(crate) fn new(typed: TypedCollection<'a, B, D>, options: SoftDeleteOptions) -> Self {
        Self {
            inner: SoftDeleteCollection::new(typed.untyped().clone(), options),
            typed,
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn options(&self) -> &SoftDeleteOptions {
        self.inner.options()
    }

    /// The undecorated typed collection.
    pub fn raw(&self) -> &TypedCollection<'a, B, D> {
        &self.typed
    }

    /// The untyped soft-delete view of the same collection.
    pub fn untyped(&self) -> &SoftDeleteCollection<'a, B> {
        &self.inner
    }

    pub async fn count(&self, conditions: impl Into<Conditions>, options: FindOptions) -> DocumentStoreResult<u64> {
        self.inner.count(conditions, options).await
    }

    pub async fn count_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.count_deleted(conditions).await
    }

    pub async fn count_with_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.count_with_deleted(conditions).await
    }

    pub async fn count_documents(
        &self,
        conditions: impl Into<Conditions>,
        options: FindOptions,
    ) -> DocumentStoreResult<u64> {
        self.inner.count_documents(conditions, options).await
    }

    pub async fn count_documents_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.count_documents_deleted(conditions).await
    }

    pub async fn count_documents_with_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.count_documents_with_deleted(conditions).await
    }

    pub async fn find(&self, query: Query, options: FindOptions) -> DocumentStoreResult<Vec<D>> {
        decode_all(self.inner.find(query, options).await?)
    }

    pub async fn find_deleted(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        decode_all(self.inner.find_deleted(query).await?)
    }

    pub async fn find_with_deleted(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        decode_all(self.inner.find_with_deleted(query).await?)
    }

    pub async fn find_one(
        &self,
        conditions: impl Into<Conditions>,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<D>> {
        decode_one(self.inner.find_one(conditions, options).await?)
    }

    pub async fn find_one_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<Option<D>> {
        decode_one(self.inner.find_one_deleted(conditions).await?)
    }

    pub async fn find_one_with_deleted(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<Option<D>> {
        decode_one(self.inner.find_one_with_deleted(conditions).await?)
    }

    pub async fn find_one_and_update(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<D>> {
        decode_one(self.inner.find_one_and_update(conditions, update, options).await?)
    }

    pub async fn find_one_and_update_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<D>> {
        decode_one(self.inner.find_one_and_update_deleted(conditions, update, options).await?)
    }

    pub async fn find_one_and_update_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<Option<D>> {
        decode_one(self.inner.find_one_and_update_with_deleted(conditions, update, options).await?)
    }

    pub async fn update(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update(conditions, update, options).await
    }

    pub async fn update_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_deleted(conditions, update, options).await
    }

    pub async fn update_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_with_deleted(conditions, update, options).await
    }

    pub async fn update_one(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_one(conditions, update, options).await
    }

    pub async fn update_one_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_one_deleted(conditions, update, options).await
    }

    pub async fn update_one_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_one_with_deleted(conditions, update, options).await
    }

    pub async fn update_many(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_many(conditions, update, options).await
    }

    pub async fn update_many_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_many_deleted(conditions, update, options).await
    }

    pub async fn update_many_with_deleted(
        &self,
        conditions: impl Into<Conditions>,
        update: Update,
        options: SoftUpdateOptions,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_many_with_deleted(conditions, update, options).await
    }

    pub async fn aggregate(&self, pipeline: Pipeline, options: FindOptions) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.aggregate(pipeline, options).await
    }

    pub async fn aggregate_deleted(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.aggregate_deleted(pipeline).await
    }

    pub async fn aggregate_with_deleted(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.aggregate_with_deleted(pipeline).await
    }

    pub async fn delete(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<UpdateResult> {
        self.inner.delete(conditions).await
    }

    pub async fn delete_as(
        &self,
        conditions: impl Into<Conditions>,
        actor: impl Into<Bson>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.delete_as(conditions, actor).await
    }

    pub async fn delete_by_id(&self, id: impl Into<Uuid>) -> DocumentStoreResult<UpdateResult> {
        self.inner.delete_by_id(id).await
    }

    pub async fn delete_by_id_as(
        &self,
        id: impl Into<Uuid>,
        actor: impl Into<Bson>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.delete_by_id_as(id, actor).await
    }

    pub async fn restore(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<UpdateResult> {
        self.inner.restore(conditions).await
    }

    /// Inserts documents. Their flag is stored as a plain boolean.
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

    /// Marks `document` deleted and saves it.
    ///
    /// On failure `document` keeps its previous deletion state.
    pub async fn delete_document(&self, document: &mut D) -> DocumentStoreResult<()> {
        self.delete_document_with(document, None).await
    }

    /// Marks `document` deleted by `actor` and saves it.
    pub async fn delete_document_as(&self, document: &mut D, actor: impl Into<Bson>) -> DocumentStoreResult<()> {
        self.delete_document_with(document, Some(actor.into())).await
    }

    async fn delete_document_with(&self, document: &mut D, actor: Option<Bson>) -> DocumentStoreResult<()> {
        let options = self.options();

        if let (true, Some(actor)) = (options.deleted_by, &actor) {
            self.inner.check_actor(actor)?;
        }

        let previous = document.deletion().clone();
        document.deletion_mut().mark_deleted(options, actor);

        self.save_or_revert(document, previous, options.validate_before_delete).await
    }

    /// Clears the deletion state of `document` and saves it.
    pub async fn restore_document(&self, document: &mut D) -> DocumentStoreResult<()> {
        let previous = document.deletion().clone();
        document.deletion_mut().clear();

        self.save_or_revert(document, previous, self.options().validate_before_restore).await
    }

    async fn save_or_revert(
        &self,
        document: &mut D,
        previous: DeletionState,
        validate: bool,
    ) -> DocumentStoreResult<()> {
        match self.typed.save_with(document, validate).await {
            Ok(()) => Ok(()),
            Err(err) => {
                *document.deletion_mut() = previous;
                Err(err)
            }
        }
    }

    pub async fn ensure_indexes(&self) -> DocumentStoreResult<Vec<IndexField>> {
        self.inner.ensure_indexes().await
    }

    pub async fn backfill(&self) -> DocumentStoreResult<UpdateResult> {
        self.inner.backfill().await
    }

    pub async fn purge(&self, conditions: impl Into<Conditions>) -> DocumentStoreResult<u64> {
        self.inner.purge(conditions).await
    }

    pub async fn purge_by_ids<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.inner.purge_by_ids(ids).await
    }
}

fn decode_one<D: SoftDeletable>(document: Option<Bson>) -> DocumentStoreResult<Option<D>> {
    document.map(D::from_bson).transpose()
}
