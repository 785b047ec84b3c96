use bson::{Bson, Document as BsonDocument, doc, oid::ObjectId};
use rstest::rstest;
use serde_json::json;
use softdoc::{memory::InMemoryStore, prelude::*};

const PILOTS: &str = "pilots";

fn record(fields: BsonDocument) -> (bson::Uuid, Bson) {
    (bson::Uuid::new(), Bson::Document(fields))
}

/// A store whose `pilots` collection holds `records` exactly as given.
async fn store_with(records: Vec<BsonDocument>) -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::new());

    store
        .collection(PILOTS)
        .insert(records.into_iter().map(record).collect())
        .await
        .unwrap();

    store
}

fn overriding_all() -> SoftDeleteOptions {
    SoftDeleteOptions::builder().override_all().build()
}

async fn raw_one(store: &DocumentStore<InMemoryStore>, name: &str) -> BsonDocument {
    store
        .collection(PILOTS)
        .find_one(doc! { "name": name })
        .await
        .unwrap()
        .and_then(|document| document.as_document().cloned())
        .unwrap()
}

#[tokio::test]
async fn delete_marks_records_without_timestamp_by_default() {
    let store = store_with(vec![doc! { "name": "Fulano", "deleted": false }]).await;
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    let result = pilots.delete(doc! { "name": "Fulano" }).await.unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);

    let stored = raw_one(&store, "Fulano").await;
    assert!(stored.get_bool("deleted").unwrap());
    assert!(!stored.contains_key("deletedAt"));
    assert!(!stored.contains_key("deletedBy"));
}

#[tokio::test]
async fn delete_by_id_marks_one_record() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    let (id, fulano) = record(doc! { "name": "Fulano" });
    let (_, cicrano) = record(doc! { "name": "Cicrano" });
    pilots.insert(vec![(id, fulano)]).await.unwrap();
    pilots.insert(vec![(bson::Uuid::new(), cicrano)]).await.unwrap();

    let result = pilots.delete_by_id(id).await.unwrap();
    assert_eq!(result.modified_count, 1);

    assert!(raw_one(&store, "Fulano").await.get_bool("deleted").unwrap());
    assert!(!raw_one(&store, "Cicrano").await.get_bool("deleted").unwrap());
}

#[tokio::test]
async fn insert_stamps_the_flag() {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    pilots
        .insert(vec![
            record(doc! { "name": "Luke" }),
            record(doc! { "name": "Obi-Wan", "deleted": 1 }),
        ])
        .await
        .unwrap();

    assert_eq!(raw_one(&store, "Luke").await.get_bool("deleted").unwrap(), false);
    assert_eq!(raw_one(&store, "Obi-Wan").await.get_bool("deleted").unwrap(), true);
}

#[tokio::test]
async fn deleted_at_is_stamped_and_cleared_on_restore() {
    let store = store_with(vec![doc! { "name": "Fulano", "deleted": false }]).await;
    let options = SoftDeleteOptions::builder().deleted_at(true).build();
    let pilots = store.soft_collection(PILOTS, options);

    pilots.delete(doc! { "name": "Fulano" }).await.unwrap();
    let stored = raw_one(&store, "Fulano").await;
    assert!(stored.get_datetime("deletedAt").is_ok());

    let result = pilots.restore(doc! { "name": "Fulano" }).await.unwrap();
    assert_eq!(result.modified_count, 1);

    let stored = raw_one(&store, "Fulano").await;
    assert!(!stored.get_bool("deleted").unwrap());
    assert!(!stored.contains_key("deletedAt"));
}

#[tokio::test]
async fn deleted_by_records_the_actor() {
    let store = store_with(vec![doc! { "name": "Fulano", "deleted": false }]).await;
    let options = SoftDeleteOptions::builder().deleted_by(true).build();
    let pilots = store.soft_collection(PILOTS, options);
    let actor = ObjectId::new();

    pilots.delete_as(doc! { "name": "Fulano" }, actor).await.unwrap();
    assert_eq!(raw_one(&store, "Fulano").await.get_object_id("deletedBy").unwrap(), actor);

    pilots.restore(()).await.unwrap();
    assert!(!raw_one(&store, "Fulano").await.contains_key("deletedBy"));
}

#[tokio::test]
async fn deleted_by_type_is_enforced() {
    let store = store_with(vec![doc! { "name": "Fulano", "deleted": false }]).await;
    let options = SoftDeleteOptions::builder()
        .deleted_by(true)
        .deleted_by_type(DeletedByType::String)
        .build();
    let pilots = store.soft_collection(PILOTS, options);

    let result = pilots.delete_as(doc! { "name": "Fulano" }, ObjectId::new()).await;
    assert!(matches!(result, Err(DocumentStoreError::InvalidArgument(_))));
    assert!(!raw_one(&store, "Fulano").await.get_bool("deleted").unwrap());

    pilots.delete_as(doc! { "name": "Fulano" }, "53da93b1").await.unwrap();
    assert_eq!(raw_one(&store, "Fulano").await.get_str("deletedBy").unwrap(), "53da93b1");
}

#[tokio::test]
async fn actor_is_ignored_when_deleted_by_is_off() {
    let store = store_with(vec![doc! { "name": "Fulano", "deleted": false }]).await;
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    pilots.delete_as(doc! { "name": "Fulano" }, 42).await.unwrap();

    let stored = raw_one(&store, "Fulano").await;
    assert!(stored.get_bool("deleted").unwrap());
    assert!(!stored.contains_key("deletedBy"));
}

async fn jedi() -> DocumentStore<InMemoryStore> {
    store_with(vec![
        doc! { "name": "Obi-Wan Kenobi", "deleted": true },
        doc! { "name": "Darth Vader", "deleted": false },
        doc! { "name": "Luke Skywalker", "deleted": true },
    ])
    .await
}

#[tokio::test]
async fn methods_that_are_not_overridden_see_everything() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 3);
    assert_eq!(pilots.count_documents((), FindOptions::default()).await.unwrap(), 3);
    assert_eq!(pilots.find(Query::new(), FindOptions::default()).await.unwrap().len(), 3);

    let obi_wan = pilots
        .find_one(doc! { "name": "Obi-Wan Kenobi" }, FindOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(obi_wan.as_document().unwrap().get_bool("deleted").unwrap(), true);

    let renamed = pilots
        .find_one_and_update(
            doc! { "name": "Obi-Wan Kenobi" },
            Update::new().set("name", "Obi-Wan Kenobi Test"),
            SoftUpdateOptions { return_document: ReturnDocument::After, ..Default::default() },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.as_document().unwrap().get_str("name").unwrap(), "Obi-Wan Kenobi Test");

    let result = pilots
        .update_many(doc! { "deleted": true }, Update::new().set("rank", "master"), SoftUpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(result.modified_count, 2);
}

#[rstest]
#[case::find_one("findOneDeleted")]
#[case::update_many("updateManyWithDeleted")]
#[tokio::test]
async fn variants_of_plain_methods_are_unavailable(#[case] name: &str) {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    assert!(!pilots.options().exposes(name));

    let find = pilots.find_one_deleted(()).await;
    assert!(matches!(find, Err(DocumentStoreError::MethodNotAvailable(_))));

    let update = pilots
        .update_many_with_deleted((), Update::new().set("rank", "master"), SoftUpdateOptions::default())
        .await;
    assert!(matches!(update, Err(DocumentStoreError::MethodNotAvailable(_))));
}

#[tokio::test]
async fn upsert_through_plain_update_one_inserts_an_active_record() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::default());

    let result = pilots
        .update_one(
            doc! { "name": "Obi-Wan Kenobi Upsert" },
            Update::new().set("name", "Obi-Wan Kenobi Upsert Test"),
            SoftUpdateOptions { upsert: true, ..Default::default() },
        )
        .await
        .unwrap();

    assert_eq!(result.upserted_count(), 1);
    assert!(result.upserted_id.is_some());

    let inserted = raw_one(&store, "Obi-Wan Kenobi Upsert Test").await;
    assert!(!inserted.get_bool("deleted").unwrap());
}

#[tokio::test]
async fn overridden_counts_follow_the_scope() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 1);
    assert_eq!(pilots.count_documents((), FindOptions::default()).await.unwrap(), 1);
    assert_eq!(pilots.count_deleted(()).await.unwrap(), 2);
    assert_eq!(pilots.count_documents_deleted(()).await.unwrap(), 2);
    assert_eq!(pilots.count_with_deleted(()).await.unwrap(), 3);
    assert_eq!(pilots.count_documents_with_deleted(()).await.unwrap(), 3);
    assert_eq!(pilots.count((), FindOptions::including_deleted()).await.unwrap(), 3);
}

#[tokio::test]
async fn overridden_finds_follow_the_scope() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    assert_eq!(pilots.find(Query::new(), FindOptions::default()).await.unwrap().len(), 1);
    assert_eq!(pilots.find_deleted(Query::new()).await.unwrap().len(), 2);
    assert_eq!(pilots.find_with_deleted(Query::new()).await.unwrap().len(), 3);

    let hidden = pilots
        .find_one(doc! { "name": "Obi-Wan Kenobi" }, FindOptions::default())
        .await
        .unwrap();
    assert!(hidden.is_none());

    let deleted = pilots.find_one_deleted(doc! { "name": "Obi-Wan Kenobi" }).await.unwrap();
    assert!(deleted.is_some());

    let active = pilots.find_one_with_deleted(doc! { "name": "Darth Vader" }).await.unwrap();
    assert!(active.is_some());
}

#[tokio::test]
async fn caller_conditions_are_kept_alongside_the_scope() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    let query = Query::matching(doc! { "name": { "$in": ["Darth Vader", "Luke Skywalker"] } });
    let found = pilots.find(query, FindOptions::default()).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].as_document().unwrap().get_str("name").unwrap(), "Darth Vader");
}

#[tokio::test]
async fn overridden_find_one_and_update_skips_deleted_records() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());
    let rename = || Update::new().set("name", "Obi-Wan Kenobi Test");
    let after = SoftUpdateOptions { return_document: ReturnDocument::After, ..Default::default() };

    let missed = pilots
        .find_one_and_update(doc! { "name": "Obi-Wan Kenobi" }, rename(), after)
        .await
        .unwrap();
    assert!(missed.is_none());

    let updated = pilots
        .find_one_and_update_deleted(doc! { "name": "Obi-Wan Kenobi" }, rename(), after)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.as_document().unwrap().get_str("name").unwrap(), "Obi-Wan Kenobi Test");

    let active = pilots
        .find_one_and_update_with_deleted(
            doc! { "name": "Darth Vader" },
            Update::new().set("name", "Anakin Skywalker"),
            after,
        )
        .await
        .unwrap();
    assert!(active.is_some());
}

#[tokio::test]
async fn overridden_updates_skip_deleted_records() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());
    let touch = || Update::new().set("rank", "master");

    let one = pilots
        .update_one(doc! { "name": "Obi-Wan Kenobi" }, touch(), SoftUpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(one.matched_count, 0);
    assert_eq!(one.modified_count, 0);

    let many = pilots.update_many((), touch(), SoftUpdateOptions::default()).await.unwrap();
    assert_eq!(many.modified_count, 1);

    let legacy = pilots
        .update((), Update::new().set("rank", "knight"), SoftUpdateOptions { multi: true, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(legacy.modified_count, 1);

    let deleted = pilots
        .update_one_deleted(doc! { "name": "Obi-Wan Kenobi" }, touch(), SoftUpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(deleted.modified_count, 1);

    let deleted_many = pilots
        .update_many_deleted((), Update::new().set("rank", "ghost"), SoftUpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(deleted_many.modified_count, 2);

    let everyone = pilots
        .update_many_with_deleted((), Update::new().set("rank", "legend"), SoftUpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(everyone.modified_count, 3);
}

#[tokio::test]
async fn overridden_upsert_does_not_resurrect_deleted_records() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    let result = pilots
        .update_one(
            doc! { "name": "Obi-Wan Kenobi" },
            Update::new().set("rank", "master"),
            SoftUpdateOptions { upsert: true, ..Default::default() },
        )
        .await
        .unwrap();

    assert_eq!(result.matched_count, 0);
    assert_eq!(result.upserted_count(), 1);
    assert_eq!(pilots.count_with_deleted(doc! { "name": "Obi-Wan Kenobi" }).await.unwrap(), 2);
    assert_eq!(pilots.count(doc! { "name": "Obi-Wan Kenobi" }, FindOptions::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_respects_a_flag_pinned_by_the_caller() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    pilots
        .update_one_with_deleted(
            doc! { "name": "Yoda", "deleted": true },
            Update::new().set("rank", "master"),
            SoftUpdateOptions { upsert: true, ..Default::default() },
        )
        .await
        .unwrap();

    assert!(raw_one(&store, "Yoda").await.get_bool("deleted").unwrap());
}

#[tokio::test]
async fn delete_many_with_conditions_and_actor() {
    let store = store_with(vec![
        doc! { "name": "Obi-Wan Kenobi", "side": 0, "deleted": false },
        doc! { "name": "Darth Vader", "side": 1, "deleted": false },
        doc! { "name": "Luke Skywalker", "side": 0, "deleted": false },
    ])
    .await;
    let options = SoftDeleteOptions::builder().override_all().deleted_by(true).build();
    let pilots = store.soft_collection(PILOTS, options);
    let actor = ObjectId::new();

    let result = pilots.delete_as(doc! { "side": 0 }, actor).await.unwrap();
    assert_eq!(result.modified_count, 2);
    assert_eq!(pilots.count_deleted(doc! { "deletedBy": actor }).await.unwrap(), 2);

    let result = pilots.delete(()).await.unwrap();
    assert_eq!(result.matched_count, 3);
    assert_eq!(result.modified_count, 1);
    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn restore_with_conditions() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    let result = pilots.restore(doc! { "name": "Obi-Wan Kenobi" }).await.unwrap();
    assert_eq!(result.modified_count, 1);
    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 2);

    let result = pilots.restore(()).await.unwrap();
    assert_eq!(result.matched_count, 3);
    assert_eq!(pilots.count_deleted(()).await.unwrap(), 0);
}

#[tokio::test]
async fn equality_filter_ignores_records_without_a_flag() {
    let store = store_with(vec![
        doc! { "name": "One" },
        doc! { "name": "Two", "deleted": true },
        doc! { "name": "Three", "deleted": false },
    ])
    .await;
    let options = SoftDeleteOptions::builder().override_all().use_ne_operator(false).build();
    let pilots = store.soft_collection(PILOTS, options);

    assert_eq!(pilots.count_documents((), FindOptions::default()).await.unwrap(), 1);
    assert_eq!(pilots.count_documents_deleted(()).await.unwrap(), 1);
    assert_eq!(pilots.find(Query::new(), FindOptions::default()).await.unwrap().len(), 1);

    let backfilled = pilots.backfill().await.unwrap();
    assert_eq!(backfilled.modified_count, 1);
    assert_eq!(pilots.count_documents((), FindOptions::default()).await.unwrap(), 2);
}

#[tokio::test]
async fn ne_filter_treats_records_without_a_flag_as_active() {
    let store = store_with(vec![
        doc! { "name": "One" },
        doc! { "name": "Two", "deleted": true },
        doc! { "name": "Three", "deleted": false },
    ])
    .await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    assert_eq!(pilots.count_documents((), FindOptions::default()).await.unwrap(), 2);
}

#[tokio::test]
async fn aggregate_prepends_the_scope() {
    let store = jedi().await;
    let options = SoftDeleteOptions::builder().override_methods([Method::Aggregate]).build();
    let pilots = store.soft_collection(PILOTS, options);
    let pipeline = || Pipeline::new().project(["name"]).sort("name", SortDirection::Asc);

    let active = pilots.aggregate(pipeline(), FindOptions::default()).await.unwrap();
    assert_eq!(active, vec![Bson::Document(doc! { "name": "Darth Vader" })]);

    let deleted = pilots.aggregate_deleted(pipeline()).await.unwrap();
    assert_eq!(
        deleted,
        vec![
            Bson::Document(doc! { "name": "Luke Skywalker" }),
            Bson::Document(doc! { "name": "Obi-Wan Kenobi" }),
        ],
    );

    let all = pilots.aggregate_with_deleted(pipeline()).await.unwrap();
    assert_eq!(all.len(), 3);

    // only aggregate is overridden
    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 3);
}

#[tokio::test]
async fn purge_removes_records_for_good() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    let removed = pilots.purge(doc! { "deleted": true }).await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(pilots.count_with_deleted(()).await.unwrap(), 1);
    assert_eq!(pilots.raw().count(()).await.unwrap(), 1);
}

#[rstest]
#[case(json!({ "indexFields": true, "deletedAt": true, "deletedBy": true }), vec![IndexField::Deleted, IndexField::DeletedAt, IndexField::DeletedBy])]
#[case(json!({ "indexFields": "all", "deletedAt": true }), vec![IndexField::Deleted, IndexField::DeletedAt])]
#[case(json!({ "indexFields": ["deleted"], "deletedAt": true, "deletedBy": true }), vec![IndexField::Deleted])]
#[case(json!({ "indexFields": ["deletedAt", "deletedBy"], "deletedAt": true, "deletedBy": true }), vec![IndexField::DeletedAt, IndexField::DeletedBy])]
#[case(json!({}), vec![])]
#[tokio::test]
async fn ensure_indexes_follows_index_fields(#[case] config: serde_json::Value, #[case] expected: Vec<IndexField>) {
    let store = DocumentStore::new(InMemoryStore::new());
    let pilots = store.soft_collection(PILOTS, SoftDeleteOptions::from_json(config).unwrap());

    assert_eq!(pilots.ensure_indexes().await.unwrap(), expected);
}

#[tokio::test]
async fn json_options_expose_variants_of_listed_methods_only() {
    let store = jedi().await;
    let options = SoftDeleteOptions::from_json(json!({
        "overrideMethods": ["testError", "count", "countDocuments", "find"],
    }))
    .unwrap();
    let pilots = store.soft_collection(PILOTS, options);

    assert!(!pilots.options().exposes("testError"));
    assert!(pilots.options().exposes("countDeleted"));
    assert!(pilots.options().exposes("findWithDeleted"));
    assert!(pilots.options().exposes("findOne"));
    assert!(!pilots.options().exposes("findOneDeleted"));

    assert_eq!(pilots.find_deleted(Query::new()).await.unwrap().len(), 2);
    assert!(matches!(
        pilots.update_one_deleted((), Update::new(), SoftUpdateOptions::default()).await,
        Err(DocumentStoreError::MethodNotAvailable(_)),
    ));
}

#[tokio::test]
async fn dynamic_store_behaves_the_same() {
    let store = jedi().await.into_dyn();
    let pilots = store.soft_collection(PILOTS, overriding_all());

    pilots.delete(doc! { "name": "Darth Vader" }).await.unwrap();

    assert_eq!(pilots.count((), FindOptions::default()).await.unwrap(), 0);
    assert_eq!(pilots.count_deleted(()).await.unwrap(), 3);

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn upsert_never_replaces_a_deleted_record() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = bson::Uuid::new();
    store
        .collection(PILOTS)
        .insert(vec![(
            id,
            Bson::Document(doc! { "id": id, "name": "Obi-Wan Kenobi", "rank": "master", "deleted": true }),
        )])
        .await
        .unwrap();
    let pilots = store.soft_collection(PILOTS, overriding_all());
    let upsert = SoftUpdateOptions { upsert: true, ..Default::default() };

    let result = pilots.update_one(Filter::id(id), Update::new().set("note", "x"), upsert).await;
    assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(..))));

    let result = pilots
        .find_one_and_update(Filter::id(id), Update::new().set("note", "x"), upsert)
        .await;
    assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(..))));

    let stored = raw_one(&store, "Obi-Wan Kenobi").await;
    assert_eq!(stored.get_str("rank").unwrap(), "master");
    assert!(stored.get_bool("deleted").unwrap());
    assert!(!stored.contains_key("note"));

    let restored = pilots.restore(Filter::id(id)).await.unwrap();
    assert_eq!(restored.modified_count, 1);
    assert_eq!(pilots.count_with_deleted(()).await.unwrap(), 1);
}

#[tokio::test]
async fn dotted_updates_are_visible_to_filters() {
    let store = store_with(vec![doc! { "name": "Han Solo", "ship": { "name": "Falcon" }, "deleted": false }]).await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    let result = pilots
        .update_one(
            doc! { "ship.name": "Falcon" },
            Update::new().set("ship.name", "X-Wing"),
            SoftUpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.modified_count, 1);
    assert_eq!(pilots.count(doc! { "ship.name": "X-Wing" }, FindOptions::default()).await.unwrap(), 1);

    let han = raw_one(&store, "Han Solo").await;
    assert_eq!(han.get_document("ship").unwrap(), &doc! { "name": "X-Wing" });
    assert!(!han.contains_key("ship.name"));

    pilots
        .update_one(
            doc! { "ship.name": "Slave I" },
            Update::new().set("name", "Boba Fett"),
            SoftUpdateOptions { upsert: true, ..Default::default() },
        )
        .await
        .unwrap();

    let boba = raw_one(&store, "Boba Fett").await;
    assert_eq!(boba.get_document("ship").unwrap(), &doc! { "name": "Slave I" });
    assert_eq!(pilots.count(doc! { "ship.name": "Slave I" }, FindOptions::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn with_deleted_option_widens_default_updates() {
    let store = jedi().await;
    let pilots = store.soft_collection(PILOTS, overriding_all());

    let result = pilots
        .update_many(
            (),
            Update::new().set("rank", "legend"),
            SoftUpdateOptions { with_deleted: true, ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(result.matched_count, 3);
    assert_eq!(result.modified_count, 3);

    let updated = pilots
        .find_one_and_update(
            doc! { "name": "Obi-Wan Kenobi" },
            Update::new().set("name", "Ben Kenobi"),
            SoftUpdateOptions { with_deleted: true, return_document: ReturnDocument::After, ..Default::default() },
        )
        .await
        .unwrap()
        .unwrap();
    let updated = updated.as_document().unwrap();
    assert_eq!(updated.get_str("name").unwrap(), "Ben Kenobi");
    assert!(updated.get_bool("deleted").unwrap());
}
