//! Core traits for document representation and serialization.
//!
//! Every record handled by a store implements [`Document`]. Records that take part
//! in soft deletion additionally implement [`SoftDeletable`](crate::soft::SoftDeletable).

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::DocumentStoreResult;

/// Core trait that all documents stored in a document store must implement.
///
/// Every document has a unique identifier (UUID) and names the collection it belongs to.
/// The optional [`validate`](Document::validate) hook is consulted by the save path
/// before a document is written back.
///
/// # Example
///
/// ```ignore
/// use softdoc::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Pilot {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for Pilot {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "pilots"
///     }
///
///     fn validate(&self) -> DocumentStoreResult<()> {
///         if self.name.is_empty() {
///             return Err(DocumentStoreError::Validation("name is required".into()));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;

    /// Checks the document before it is saved.
    ///
    /// The default implementation accepts every document.
    ///
    /// # Errors
    ///
    /// Implementations should return [`DocumentStoreError::Validation`](crate::error::DocumentStoreError::Validation).
    fn validate(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;

    /// Pairs the document with its identifier, the shape backends store.
    fn to_entry(&self) -> DocumentStoreResult<(Uuid, Bson)> {
        Ok((*self.id(), self.to_bson()?))
    }
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}
