//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values in HashMaps behind async-safe read-write locks.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, Uuid};
use tracing::{debug, trace};

use softdoc_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Pipeline, Stage},
    query::{Expr, Query, Sort, SortDirection},
    update::{FindOneAndUpdateOptions, ReturnDocument, Update, UpdateOptions, UpdateResult},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// All documents are stored as BSON values indexed by their UUID.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data. Every write takes the store lock once, so a
/// filtered update or an upsert is atomic with respect to other operations.
///
/// # Performance
///
/// Queries scan all documents in a collection. Indexes are accepted and ignored.
///
/// # Example
///
/// ```ignore
/// use softdoc_memory::InMemoryStore;
/// use softdoc::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
///
/// let id = Uuid::new();
/// let doc = Bson::Document(doc! { "name": "Luke", "side": 0 });
/// store.insert_documents(vec![(id, doc)], "pilots").await?;
///
/// let docs = store.get_documents(vec![id], "pilots").await?;
/// assert_eq!(docs.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// ```ignore
    /// let store = InMemoryStore::builder().build().await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}

/// Keys of the documents matching `filter`, at most `limit` of them.
fn matching_keys(
    collection_map: &CollectionMap,
    filter: Option<&Expr>,
    limit: usize,
) -> DocumentStoreResult<Vec<String>> {
    let mut keys = Vec::new();

    for (key, doc) in collection_map {
        if keys.len() >= limit {
            break;
        }
        if DocumentEvaluator::matches(key, doc, filter)? {
            keys.push(key.clone());
        }
    }

    Ok(keys)
}

fn document_mut<'m>(
    collection_map: &'m mut CollectionMap,
    key: &str,
    collection: &str,
) -> DocumentStoreResult<&'m mut Document> {
    collection_map
        .get_mut(key)
        .ok_or_else(|| DocumentStoreError::DocumentNotFound(key.to_string(), collection.to_string()))?
        .as_document_mut()
        .ok_or_else(|| DocumentStoreError::InvalidDocument(format!("{key} in {collection} is not a document")))
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

/// Builds the document an upsert inserts: the filter's equalities, then the update.
fn upsert_document(filter: Option<&Expr>, update: &Update, id: Uuid) -> Document {
    let mut document = Document::new();

    if let Some(filter) = filter {
        let seed = filter
            .equalities()
            .into_iter()
            .fold(Update::new(), |seed, (field, value)| seed.set(field, value.clone()));
        seed.apply(&mut document, true);
    }

    update.apply(&mut document, true);

    if !document.contains_key("id") {
        document.insert("id", id);
    }

    document
}

/// Stores an upserted document. An upsert never replaces an existing record, deleted or not.
fn insert_upserted(
    collection_map: &mut CollectionMap,
    id: Uuid,
    document: Document,
    collection: &str,
) -> DocumentStoreResult<()> {
    let key = id.to_string();

    if collection_map.contains_key(&key) {
        return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
    }

    collection_map.insert(key, Bson::Document(document));
    Ok(())
}

fn sort_key<'d>(doc: &'d Bson, field: &str) -> Comparable<'d> {
    doc.as_document()
        .and_then(|document| lookup(document, field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

fn compare(a: &Bson, b: &Bson, sort: &Sort) -> Ordering {
    let left = sort_key(a, &sort.field);
    let right = sort_key(b, &sort.field);

    match sort.direction {
        SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
        SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
    }
}

fn project(document: Bson, fields: &[String]) -> Bson {
    match document {
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .filter(|(key, _)| fields.iter().any(|field| field == key))
                .collect(),
        ),
        other => other,
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            let key = id.to_string();

            if collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
            }

            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for (id, doc) in documents {
            let key = id.to_string();

            if !collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }

            collection_map.insert(key, doc);
        }

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
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        let limit = if multi { usize::MAX } else { 1 };
        let keys = matching_keys(collection_map, filter.as_ref(), limit)?;

        let mut result = UpdateResult {
            acknowledged: true,
            matched_count: keys.len() as u64,
            ..UpdateResult::default()
        };

        for key in &keys {
            if update.apply(document_mut(collection_map, key, collection)?, false) {
                result.modified_count += 1;
            }
        }

        if keys.is_empty() && options.upsert {
            let id = upsert_id(filter.as_ref());
            let document = upsert_document(filter.as_ref(), &update, id);

            insert_upserted(collection_map, id, document, collection)?;
            result.upserted_id = Some(id);
        }

        trace!(
            collection,
            matched = result.matched_count,
            modified = result.modified_count,
            upserted = result.upserted_id.is_some(),
            "applied update",
        );

        Ok(result)
    }

    async fn find_one_and_update(
        &self,
        filter: Option<Expr>,
        update: Update,
        options: FindOneAndUpdateOptions,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        match matching_keys(collection_map, filter.as_ref(), 1)?.first() {
            Some(key) => {
                let document = document_mut(collection_map, key, collection)?;
                let before = document.clone();
                update.apply(document, false);

                Ok(Some(Bson::Document(match options.return_document {
                    ReturnDocument::Before => before,
                    ReturnDocument::After => document.clone(),
                })))
            }
            None if options.upsert => {
                let id = upsert_id(filter.as_ref());
                let document = upsert_document(filter.as_ref(), &update, id);
                insert_upserted(collection_map, id, document.clone(), collection)?;

                Ok(match options.return_document {
                    ReturnDocument::Before => None,
                    ReturnDocument::After => Some(Bson::Document(document)),
                })
            }
            None => Ok(None),
        }
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for id in ids {
            let key = id.to_string();

            if collection_map.remove(&key).is_none() {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }
        }

        Ok(())
    }

    async fn delete_where(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        let keys = matching_keys(collection_map, filter.as_ref(), usize::MAX)?;
        for key in &keys {
            collection_map.remove(key);
        }

        debug!(collection, removed = keys.len(), "removed documents");

        Ok(keys.len() as u64)
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = Vec::with_capacity(ids.len());

        for id in ids {
            let key = id.to_string();

            if let Some(doc) = collection_map.get(&key) {
                documents.push(doc.clone());
            }
        }

        Ok(documents)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = Vec::new();
        for (key, doc) in collection_map {
            if DocumentEvaluator::matches(key, doc, query.filter.as_ref())? {
                documents.push(doc.clone());
            }
        }

        if let Some(sort) = &query.sort {
            documents.sort_by(|a, b| compare(a, b, sort));
        }

        Ok(
            documents
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        Ok(matching_keys(collection_map, filter.as_ref(), usize::MAX)?.len() as u64)
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        // keys travel with documents so `Ids` matches still work after earlier stages
        let mut stream: Vec<(String, Bson)> = collection_map
            .iter()
            .map(|(key, doc)| (key.clone(), doc.clone()))
            .collect();

        for stage in pipeline.stages() {
            stream = match stage {
                Stage::Match(expr) => {
                    let mut kept = Vec::with_capacity(stream.len());
                    for (key, doc) in stream {
                        if DocumentEvaluator::new(&key, &doc).evaluate(expr)? {
                            kept.push((key, doc));
                        }
                    }
                    kept
                }
                Stage::Sort(sort) => {
                    let mut sorted = stream;
                    sorted.sort_by(|(_, a), (_, b)| compare(a, b, sort));
                    sorted
                }
                Stage::Skip(n) => stream.into_iter().skip(*n).collect(),
                Stage::Limit(n) => stream.into_iter().take(*n).collect(),
                Stage::Project(fields) => stream
                    .into_iter()
                    .map(|(key, doc)| (key, project(doc, fields)))
                    .collect(),
                Stage::Count(_) if stream.is_empty() => Vec::new(),
                Stage::Count(field) => {
                    let mut counted = Document::new();
                    counted.insert(field.clone(), stream.len() as i64);
                    vec![(String::new(), Bson::Document(counted))]
                }
            };
        }

        Ok(stream.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .cloned()
                .collect()
        )
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        trace!(collection, field, unique, "index requested on in-memory store, ignoring");
        Ok(())
    }

    async fn drop_index(&self, _collection: &str, _field: &str) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
