use async_trait::async_trait;
use futures::{stream::iter, StreamExt, TryStreamExt};
use bson::{Document, Bson, Uuid, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    options::{ClientOptions, FindOptions, IndexOptions, ReturnDocument as MongoReturnDocument},
};
use tracing::{debug, info};

use softdoc_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Query},
    update::{FindOneAndUpdateOptions, ReturnDocument, Update, UpdateOptions, UpdateResult},
};

use crate::query::MongoQueryTranslator;

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// The identifier an upsert should use: the one the filter pins, or a fresh one.
fn upsert_id(filter: Option<&Expr>) -> Uuid {
    fn pinned(expr: &Expr) -> Option<Uuid> {
        match expr {
            Expr::Ids(ids) if ids.len() == 1 => ids.first().copied(),
            Expr::And(exprs) => exprs.iter().find_map(pinned),
            _ => None,
        }
    }

    filter.and_then(pinned).unwrap_or_else(Uuid::new)
}

/// Translates an update into MongoDB update operators.
///
/// An upsert also writes `_id` and, unless the update sets it, the `id` field, so the
/// inserted record can be addressed like any other.
fn update_document(update: &Update, upsert_id: Option<Uuid>) -> Document {
    let mut translated = Document::new();

    if !update.set.is_empty() {
        translated.insert("$set", update.set.clone());
    }
    if !update.unset.is_empty() {
        translated.insert(
            "$unset",
            update
                .unset
                .iter()
                .map(|field| (field.clone(), Bson::String(String::new())))
                .collect::<Document>(),
        );
    }

    let mut on_insert = update.set_on_insert.clone();
    if let Some(id) = upsert_id {
        on_insert.insert("_id", id);
        if !update.touches("id") {
            on_insert.insert("id", id);
        }
    }
    if !on_insert.is_empty() {
        translated.insert("$setOnInsert", on_insert);
    }

    if translated.is_empty() {
        translated.insert("$set", Document::new());
    }

    translated
}

/// MongoDB-backed [`StoreBackend`].
///
/// Records are stored with their identifier in `_id`, which is stripped again on read.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        Ok(Document::from_iter(
            document
                .as_document()
                .cloned()
                .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?
                .into_iter()
                .chain(vec![("_id".to_string(), (*id).into())].into_iter()),
        ))
    }

    fn restore_document(&self, document: Document) -> Bson {
        Bson::Document(Document::from_iter(
            document
                .into_iter()
                .filter(|(k, _)| k != "_id")
        ))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        iter(documents)
            .then(async |(id, doc)| {
                let result = self.get_collection(collection)
                    .replace_one(
                        doc! { "_id": id },
                        self.prepare_document(&id, &doc)?,
                    )
                    .await
                    .map_err(backend_error)?;

                if result.matched_count == 0 {
                    return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
                }

                Ok(())
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn update_where(
        &self,
        filter: Option<Expr>,
        update: Update,
        multi: bool,
        options: UpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<UpdateResult> {
        let query = MongoQueryTranslator::filter(filter.as_ref())?;
        let upserted = options.upsert.then(|| upsert_id(filter.as_ref()));
        let update = update_document(&update, upserted);

        let result = if multi {
            self.get_collection(collection)
                .update_many(query, update)
                .upsert(options.upsert)
                .await
        } else {
            self.get_collection(collection)
                .update_one(query, update)
                .upsert(options.upsert)
                .await
        }
        .map_err(backend_error)?;

        debug!(
            collection,
            matched = result.matched_count,
            modified = result.modified_count,
            "applied update",
        );

        Ok(UpdateResult {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.and(upserted),
        })
    }

    async fn find_one_and_update(
        &self,
        filter: Option<Expr>,
        update: Update,
        options: FindOneAndUpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        let query = MongoQueryTranslator::filter(filter.as_ref())?;
        let upserted = options.upsert.then(|| upsert_id(filter.as_ref()));

        Ok(
            self.get_collection(collection)
                .find_one_and_update(query, update_document(&update, upserted))
                .upsert(options.upsert)
                .return_document(match options.return_document {
                    ReturnDocument::Before => MongoReturnDocument::Before,
                    ReturnDocument::After => MongoReturnDocument::After,
                })
                .await
                .map_err(backend_error)?
                .map(|doc| self.restore_document(doc))
        )
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn delete_where(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_many(MongoQueryTranslator::filter(filter.as_ref())?)
                .await
                .map_err(backend_error)?
                .deleted_count
        )
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .find(doc! { "_id": { "$in": ids } })
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(MongoQueryTranslator::sort(sort));
        }

        Ok(
            self.get_collection(collection)
                .find(MongoQueryTranslator::filter(query.filter.as_ref())?)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .aggregate(MongoQueryTranslator::pipeline(&pipeline)?)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .create_collection(name)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                    .name(field.to_string())
                    .unique(unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(backend_error)?;

        debug!(collection, field, unique, "created index");

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .drop_index(field)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        MongoDbStore::shutdown(self).await
    }
}

/// Connects a [`MongoDbStore`] from a connection string.
#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let client = Client::with_options(
            ClientOptions::parse(&self.dsn)
                .await
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
        )
        .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        info!(database = %self.database, "connected to mongodb");

        Ok(MongoDbStore::new(client, self.database))
    }
}
