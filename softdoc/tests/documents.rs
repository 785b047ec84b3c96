use bson::{Uuid, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use softdoc::{memory::InMemoryStore, prelude::*};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document, SoftDeletable)]
#[document(collection = "pilots", validate = Pilot::check)]
#[soft_delete(override_methods = "all", deleted_at, deleted_by, deleted_by_type = "string", index_fields = "all")]
struct Pilot {
    id: Uuid,
    name: String,
    #[serde(flatten)]
    #[deletion]
    deletion: DeletionState,
}

impl Pilot {
    fn new(name: &str) -> Self {
        Pilot { id: Uuid::new(), name: name.to_string(), deletion: DeletionState::default() }
    }

    fn check(&self) -> DocumentStoreResult<()> {
        if self.name.is_empty() {
            return Err(DocumentStoreError::Validation("name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Document, SoftDeletable)]
#[document(collection = "drafts", validate = Draft::check)]
#[soft_delete(override_methods = ["find", "count"], validate_before_delete = false, use_ne_operator = false)]
struct Draft {
    #[document(id)]
    key: Uuid,
    title: String,
    #[serde(flatten)]
    #[deletion]
    state: DeletionState,
}

impl Draft {
    fn check(&self) -> DocumentStoreResult<()> {
        if self.title.is_empty() {
            return Err(DocumentStoreError::Validation("title is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Document, SoftDeletable)]
#[document(collection = "droids", validate = Droid::check)]
#[soft_delete(override_methods = "all", validate_before_restore = false)]
struct Droid {
    id: Uuid,
    model: String,
    #[serde(flatten)]
    deletion: DeletionState,
}

impl Droid {
    fn check(&self) -> DocumentStoreResult<()> {
        if self.model.is_empty() {
            return Err(DocumentStoreError::Validation("model is required".to_string()));
        }
        Ok(())
    }
}

#[test]
fn derived_options_match_the_builder() {
    let expected = SoftDeleteOptions::builder()
        .override_all()
        .deleted_at(true)
        .deleted_by(true)
        .deleted_by_type(DeletedByType::String)
        .index_all()
        .build();
    assert_eq!(Pilot::soft_delete_options(), expected);

    let expected = SoftDeleteOptions::builder()
        .override_methods([Method::Find, Method::Count])
        .validate_before_delete(false)
        .use_ne_operator(false)
        .build();
    assert_eq!(Draft::soft_delete_options(), expected);
}

#[test]
fn derived_document_metadata() {
    let draft = Draft { key: Uuid::new(), title: "Plans".to_string(), state: DeletionState::default() };

    assert_eq!(Pilot::collection_name(), "pilots");
    assert_eq!(Draft::collection_name(), "drafts");
    assert_eq!(draft.id(), &draft.key);
    assert!(Pilot::new("").validate().is_err());
    assert!(!draft.is_deleted());
}

#[tokio::test]
async fn delete_document_stamps_and_hides() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.typed_soft_collection::<Pilot>();

    let mut luke = Pilot::new("Luke Skywalker");
    pilots.insert(vec![luke.clone(), Pilot::new("Leia Organa")]).await.unwrap();

    pilots.delete_document_as(&mut luke, "yoda").await.unwrap();
    assert!(luke.is_deleted());
    assert!(luke.deletion.deleted_at.is_some());
    assert_eq!(luke.deletion.deleted_by, Some(bson::Bson::String("yoda".to_string())));

    let active = pilots.find(Query::new(), FindOptions::default()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Leia Organa");

    let deleted = pilots.find_deleted(Query::new()).await.unwrap();
    assert_eq!(deleted, vec![luke.clone()]);

    pilots.restore_document(&mut luke).await.unwrap();
    assert_eq!(luke.deletion, DeletionState::default());
    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 2);

    let stored = pilots.find_one_with_deleted(Filter::id(luke.id)).await.unwrap().unwrap();
    assert_eq!(stored, luke);
}

#[tokio::test]
async fn delete_document_rejects_the_wrong_actor_type() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.typed_soft_collection::<Pilot>();

    let mut luke = Pilot::new("Luke Skywalker");
    pilots.insert(vec![luke.clone()]).await.unwrap();

    let result = pilots.delete_document_as(&mut luke, ObjectId::new()).await;

    assert!(matches!(result, Err(DocumentStoreError::InvalidArgument(_))));
    assert!(!luke.is_deleted());
    assert_eq!(pilots.count_deleted(()).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_validation_keeps_the_record_and_the_state() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.typed_soft_collection::<Pilot>();

    let mut luke = Pilot::new("Luke Skywalker");
    pilots.insert(vec![luke.clone()]).await.unwrap();

    luke.name.clear();
    let result = pilots.delete_document(&mut luke).await;

    assert!(matches!(result, Err(DocumentStoreError::Validation(_))));
    assert!(!luke.is_deleted());
    assert_eq!(luke.deletion, DeletionState::default());
    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn validation_can_be_skipped_on_delete() {
    let store = DocumentStore::new(InMemoryStore::new());
    let drafts = store.typed_soft_collection::<Draft>();

    let mut draft = Draft { key: Uuid::new(), title: "Plans".to_string(), state: DeletionState::default() };
    drafts.insert(vec![draft.clone()]).await.unwrap();

    draft.title.clear();
    drafts.delete_document(&mut draft).await.unwrap();

    assert!(draft.is_deleted());
    assert!(draft.state.deleted_at.is_none());
    assert_eq!(drafts.count((), FindOptions::default()).await.unwrap(), 0);
    assert_eq!(drafts.count_deleted(()).await.unwrap(), 1);

    // restoring still validates
    let result = drafts.restore_document(&mut draft).await;
    assert!(matches!(result, Err(DocumentStoreError::Validation(_))));
    assert!(draft.is_deleted());
}

#[tokio::test]
async fn legacy_records_decode_as_active() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = Uuid::new();

    store
        .collection("pilots")
        .insert(vec![(id, bson::Bson::Document(doc! { "id": id, "name": "Han Solo" }))])
        .await
        .unwrap();

    let pilots = store.typed_soft_collection::<Pilot>();
    let han = pilots.find_one(Filter::id(id), FindOptions::default()).await.unwrap().unwrap();

    assert_eq!(han.name, "Han Solo");
    assert_eq!(han.deletion, DeletionState::default());
}

#[tokio::test]
async fn typed_updates_and_indexes() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.typed_soft_collection::<Pilot>();

    let mut luke = Pilot::new("Luke Skywalker");
    pilots.insert(vec![luke.clone(), Pilot::new("Leia Organa")]).await.unwrap();
    pilots.delete_document(&mut luke).await.unwrap();

    let renamed = pilots
        .find_one_and_update_deleted(
            doc! { "name": "Luke Skywalker" },
            Update::new().set("name", "Ben"),
            SoftUpdateOptions { return_document: ReturnDocument::After, ..Default::default() },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Ben");
    assert!(renamed.is_deleted());

    let result = pilots
        .update_many((), Update::new().set("name", "Rebel"), SoftUpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(result.modified_count, 1);

    let indexed = pilots.ensure_indexes().await.unwrap();
    assert_eq!(indexed, vec![IndexField::Deleted, IndexField::DeletedAt, IndexField::DeletedBy]);

    pilots.purge_by_ids(vec![luke.id]).await.unwrap();
    assert_eq!(pilots.count_with_deleted(()).await.unwrap(), 1);
}

#[tokio::test]
async fn validation_can_be_skipped_on_restore() {
    let store = DocumentStore::new(InMemoryStore::new());
    let droids = store.typed_soft_collection::<Droid>();

    let mut droid = Droid { id: Uuid::new(), model: "R2-D2".to_string(), deletion: DeletionState::default() };
    droids.insert(vec![droid.clone()]).await.unwrap();
    droids.delete_document(&mut droid).await.unwrap();

    droid.model.clear();
    droids.restore_document(&mut droid).await.unwrap();

    assert!(!droid.is_deleted());
    assert_eq!(droids.count((), FindOptions::default()).await.unwrap(), 1);
    assert_eq!(droids.count_deleted(()).await.unwrap(), 0);

    // deleting still validates
    let result = droids.delete_document(&mut droid).await;
    assert!(matches!(result, Err(DocumentStoreError::Validation(_))));
    assert!(!droid.is_deleted());
}
