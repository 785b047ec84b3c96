//! Per-record deletion state.

use bson::{Bson, DateTime};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{document::Document, soft::options::SoftDeleteOptions};

/// Name of the deletion flag.
pub const DELETED: &str = "deleted";
/// Name of the deletion timestamp.
pub const DELETED_AT: &str = "deletedAt";
/// Name of the deleting actor.
pub const DELETED_BY: &str = "deletedBy";

/// The soft-delete fields of a record.
///
/// Embed it in a document with `#[serde(flatten)]` so the fields sit at the top level
/// where the soft-delete filters look for them:
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Document, SoftDeletable)]
/// #[document(collection = "pilots")]
/// #[soft_delete(override_methods = "all", deleted_at)]
/// pub struct Pilot {
///     pub id: Uuid,
///     pub name: String,
///     #[serde(flatten)]
///     #[deletion]
///     pub deletion: DeletionState,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionState {
    /// Whether the record is deleted. Records written before the flag existed read as `false`.
    #[serde(default)]
    pub deleted: bool,
    /// When the record was deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
    /// Who deleted the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Bson>,
}

impl DeletionState {
    /// The deletion timestamp as a `chrono` value.
    pub fn deleted_at_utc(&self) -> Option<chrono::DateTime<Utc>> {
        self.deleted_at.map(DateTime::to_chrono)
    }

    /// Marks the record deleted, stamping the fields `options` enables.
    pub(crate) fn mark_deleted(&mut self, options: &SoftDeleteOptions, actor: Option<Bson>) {
        self.deleted = true;

        if options.deleted_at {
            self.deleted_at = Some(DateTime::now());
        }
        if options.deleted_by {
            self.deleted_by = actor;
        }
    }

    /// Clears every deletion field.
    pub(crate) fn clear(&mut self) {
        *self = DeletionState::default();
    }
}

/// A document that takes part in soft deletion.
///
/// Usually derived with `#[derive(SoftDeletable)]`, which also turns the
/// `#[soft_delete(...)]` attribute into [`soft_delete_options`](SoftDeletable::soft_delete_options).
pub trait SoftDeletable: Document {
    fn deletion(&self) -> &DeletionState;

    fn deletion_mut(&mut self) -> &mut DeletionState;

    fn is_deleted(&self) -> bool {
        self.deletion().deleted
    }

    /// The soft-delete configuration of this document type's collection.
    fn soft_delete_options() -> SoftDeleteOptions {
        SoftDeleteOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};

    use super::*;

    #[test]
    fn missing_fields_read_as_active() {
        let state: DeletionState = bson::deserialize_from_document(doc! {}).unwrap();

        assert_eq!(state, DeletionState::default());
        assert!(!state.deleted);
    }

    #[test]
    fn only_enabled_fields_are_stamped() {
        let actor = Bson::ObjectId(ObjectId::new());

        let mut state = DeletionState::default();
        state.mark_deleted(&SoftDeleteOptions::default(), Some(actor.clone()));
        assert!(state.deleted);
        assert!(state.deleted_at.is_none());
        assert!(state.deleted_by.is_none());

        let options = SoftDeleteOptions::builder().deleted_at(true).deleted_by(true).build();
        let mut state = DeletionState::default();
        state.mark_deleted(&options, Some(actor.clone()));
        assert!(state.deleted_at_utc().is_some());
        assert_eq!(state.deleted_by, Some(actor));

        state.clear();
        assert_eq!(state, DeletionState::default());
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let document = bson::serialize_to_document(&DeletionState::default()).unwrap();

        assert_eq!(document, doc! { "deleted": false });
    }
}
