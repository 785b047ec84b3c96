//! Main document store interface.
//!
//! - [`DocumentStore`] - Store bound to a specific backend implementation
//! - [`DynDocumentStore`] - Store over a boxed backend chosen at runtime
//!
//! # Example
//!
//! ```ignore
//! use softdoc::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let pilots = store.typed_soft_collection::<Pilot>();
//! let everyone = store.typed_collection::<Pilot>();
//! ```

use tracing::info;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
    soft::{SoftDeletable, SoftDeleteCollection, SoftDeleteOptions, TypedSoftDeleteCollection},
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
///
/// # Example
///
/// ```ignore
/// let store = DocumentStore::new(InMemoryStore::new());
/// let pilots = store.soft_collection("pilots", SoftDeleteOptions::default());
/// ```
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

/// A document store whose backend is picked at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn DynStoreBackend>>;

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets an untyped collection with the given name. It sees every record.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the collection
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Gets an untyped collection with soft deletion.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the collection
    /// * `options` - Which methods hide deleted records and which fields are stamped
    pub fn soft_collection<'a>(&'a self, name: &str, options: SoftDeleteOptions) -> SoftDeleteCollection<'a, B> {
        SoftDeleteCollection::new(self.collection(name), options)
    }

    /// Gets a typed collection with soft deletion, configured by
    /// [`SoftDeletable::soft_delete_options`].
    pub fn typed_soft_collection<'a, D: SoftDeletable>(&'a self) -> TypedSoftDeleteCollection<'a, B, D> {
        TypedSoftDeleteCollection::new(self.typed_collection::<D>(), D::soft_delete_options())
    }

    /// Creates a new collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    /// Drops a collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Adds an index to a field in a collection.
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection
    /// * `field` - The field to index
    /// * `unique` - Whether the index should enforce uniqueness
    pub async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        self.backend
            .add_index(collection, field, unique)
            .await
    }

    /// Removes an index from a field in a collection.
    pub async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_index(collection, field)
            .await
    }

    /// Erases the backend type.
    pub fn into_dyn(self) -> DynDocumentStore
    where
        B: 'static,
    {
        DocumentStore::new(Box::new(self.backend))
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        info!("document store shut down");

        Ok(())
    }
}
