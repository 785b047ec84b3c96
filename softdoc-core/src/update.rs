//! Partial updates, their options and results.
//!
//! An [`Update`] describes the fields to set or remove on every matched document. It is
//! what `update_one`, `update_many` and `find_one_and_update` send to the backend, and
//! what soft deletion and restoration are built from.
//!
//! ```ignore
//! use softdoc::update::Update;
//!
//! let update = Update::new()
//!     .set("deleted", true)
//!     .set("deletedAt", bson::DateTime::now());
//!
//! // or from a query-style update document
//! let update = Update::from_document(doc! { "$set": { "name": "Ben" }, "$unset": { "alias": "" } })?;
//! ```

use bson::{Bson, Document, Uuid};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A partial update applied to matching documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Fields to overwrite.
    pub set: Document,
    /// Fields to remove.
    pub unset: Vec<String>,
    /// Fields written only when the update inserts a new document.
    pub set_on_insert: Document,
}

impl Update {
    /// Creates an empty update.
    pub fn new() -> Self {
        Update::default()
    }

    /// Sets `field` to `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Removes `field`.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.unset.contains(&field) {
            self.unset.push(field);
        }
        self
    }

    /// Sets `field` to `value` only when the document is created by an upsert.
    pub fn set_on_insert(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set_on_insert.insert(field.into(), value.into());
        self
    }

    /// Builds an update from a query-style update document.
    ///
    /// A document without operators is treated as `$set`. `$set`, `$unset` and
    /// `$setOnInsert` are recognised.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] for any other `$` operator, or when an
    /// operator's operand is not a document.
    pub fn from_document(document: Document) -> DocumentStoreResult<Self> {
        let mut update = Update::new();

        for (key, value) in document {
            match key.as_str() {
                "$set" => {
                    for (field, value) in operand(&key, value)? {
                        update = update.set(field, value);
                    }
                }
                "$setOnInsert" => {
                    for (field, value) in operand(&key, value)? {
                        update = update.set_on_insert(field, value);
                    }
                }
                "$unset" => {
                    for (field, _) in operand(&key, value)? {
                        update = update.unset(field);
                    }
                }
                other if other.starts_with('$') => {
                    return Err(DocumentStoreError::InvalidArgument(format!(
                        "Unsupported update operator {other}"
                    )));
                }
                field => {
                    update.set.insert(field, value);
                }
            }
        }

        Ok(update)
    }

    /// Returns true when the update writes or removes `field`.
    pub fn touches(&self, field: &str) -> bool {
        self.set.contains_key(field)
            || self.set_on_insert.contains_key(field)
            || self.unset.iter().any(|unset| unset == field)
    }

    /// Returns true when the update has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.set_on_insert.is_empty()
    }

    /// Applies the update to `document`, returning whether it changed.
    ///
    /// Dotted field names address nested documents, which are created as needed.
    /// `set_on_insert` fields are only written when `inserting` is true.
    pub fn apply(&self, document: &mut Document, inserting: bool) -> bool {
        let before = document.clone();

        for (field, value) in &self.set {
            set_path(document, field, value.clone());
        }
        for field in &self.unset {
            unset_path(document, field);
        }
        if inserting {
            for (field, value) in &self.set_on_insert {
                set_path(document, field, value.clone());
            }
        }

        *document != before
    }
}

/// Writes `value` at a dotted `path`. A non-document in the way is replaced.
fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(child)) = document.get_mut(head) {
                set_path(child, rest, value);
            }
        }
        None => {
            document.insert(path, value);
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        Some((head, rest)) => {
            if let Some(Bson::Document(child)) = document.get_mut(head) {
                unset_path(child, rest);
            }
        }
        None => {
            document.remove(path);
        }
    }
}

fn operand(key: &str, value: Bson) -> DocumentStoreResult<Document> {
    match value {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidArgument(format!(
            "Operand of {key} must be a document, got {other}"
        ))),
    }
}

/// Options for `update_one` / `update_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document when nothing matches.
    pub upsert: bool,
}

/// Which version of the document `find_one_and_update` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update.
    #[default]
    Before,
    /// The document after the update was applied.
    After,
}

/// Options for `find_one_and_update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOneAndUpdateOptions {
    /// Insert a new document when nothing matches.
    pub upsert: bool,
    /// Which version of the document to return.
    pub return_document: ReturnDocument,
}

/// Outcome of an update operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Whether the backend acknowledged the write.
    pub acknowledged: bool,
    /// Number of documents that matched the filter.
    pub matched_count: u64,
    /// Number of documents actually changed.
    pub modified_count: u64,
    /// Identifier of the document inserted by an upsert.
    pub upserted_id: Option<Uuid>,
}

impl UpdateResult {
    /// Number of documents inserted by an upsert (0 or 1).
    pub fn upserted_count(&self) -> u64 {
        u64::from(self.upserted_id.is_some())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn plain_document_is_a_set() {
        let update = Update::from_document(doc! { "name": "Ben" }).unwrap();

        assert_eq!(update, Update::new().set("name", "Ben"));
    }

    #[test]
    fn operators_are_split() {
        let update = Update::from_document(doc! {
            "$set": { "deleted": false },
            "$unset": { "deletedAt": "", "deletedBy": 1 },
            "$setOnInsert": { "side": 0 },
        })
        .unwrap();

        assert_eq!(update.set, doc! { "deleted": false });
        assert_eq!(update.unset, vec!["deletedAt".to_string(), "deletedBy".to_string()]);
        assert_eq!(update.set_on_insert, doc! { "side": 0 });
        assert!(update.touches("deletedBy"));
        assert!(!update.touches("name"));
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let result = Update::from_document(doc! { "$inc": { "age": 1 } });
        assert!(matches!(result, Err(DocumentStoreError::InvalidArgument(_))));

        let result = Update::from_document(doc! { "$set": 1 });
        assert!(matches!(result, Err(DocumentStoreError::InvalidArgument(_))));
    }

    #[test]
    fn apply_reports_changes() {
        let update = Update::new()
            .set("deleted", true)
            .unset("deletedBy")
            .set_on_insert("created", true);

        let mut document = doc! { "name": "Luke", "deletedBy": "admin" };
        assert!(update.apply(&mut document, false));
        assert_eq!(document, doc! { "name": "Luke", "deleted": true });

        assert!(!update.apply(&mut document, false));

        let mut fresh = doc! {};
        update.apply(&mut fresh, true);
        assert_eq!(fresh, doc! { "deleted": true, "created": true });
    }

    #[test]
    fn dotted_fields_reach_nested_documents() {
        let mut document = doc! { "ship": { "name": "Falcon", "crew": 4 } };

        assert!(Update::new().set("ship.name", "X-Wing").apply(&mut document, false));
        assert_eq!(document, doc! { "ship": { "name": "X-Wing", "crew": 4 } });

        Update::new().unset("ship.crew").apply(&mut document, false);
        assert_eq!(document, doc! { "ship": { "name": "X-Wing" } });

        let mut fresh = doc! {};
        Update::new()
            .set("pilot.rank", "master")
            .set_on_insert("pilot.home.planet", "Tatooine")
            .apply(&mut fresh, true);
        assert_eq!(fresh, doc! { "pilot": { "rank": "master", "home": { "planet": "Tatooine" } } });

        assert!(!Update::new().unset("hull.plating").apply(&mut fresh, false));
    }
}
