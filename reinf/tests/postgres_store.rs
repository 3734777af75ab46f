use futures::future::join_all;
use serde_json::{json, Map, Value};
use sqlx::PgPool;

use reinf::events::EventType;
use reinf::record_key::RecordKey;
use reinf::stores::postgres::PgStore;
use reinf::stores::{InsertOutcome, RecordStore, StoredDocument};

fn document(event_type: EventType, key: &str, value: i64) -> StoredDocument {
    let mut body = Map::new();
    body.insert("_id".to_owned(), json!(key));
    body.insert("value".to_owned(), json!(value));
    StoredDocument {
        event_type,
        key: serde_json::from_value(json!(key)).unwrap(),
        body,
    }
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires a PostgreSQL database, set DATABASE_URL"]
async fn inserts_once(db: PgPool) {
    let store = PgStore::from_pool(db);

    let first = store
        .insert_if_absent(document(EventType::R2010, "1-a-b-t", 1))
        .await
        .unwrap();
    let second = store
        .insert_if_absent(document(EventType::R2010, "1-a-b-t", 2))
        .await
        .unwrap();

    assert_eq!(first, InsertOutcome::Inserted);
    assert_eq!(second, InsertOutcome::AlreadyExists);

    let key: RecordKey = serde_json::from_value(json!("1-a-b-t")).unwrap();
    let stored = store.get(EventType::R2010, &key).await.unwrap().unwrap();
    assert_eq!(stored["value"], Value::from(1));
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires a PostgreSQL database, set DATABASE_URL"]
async fn event_types_are_separate_collections(db: PgPool) {
    let store = PgStore::from_pool(db);

    store
        .insert_if_absent(document(EventType::R4010, "k", 1))
        .await
        .unwrap();
    let outcome = store
        .insert_if_absent(document(EventType::R4020, "k", 1))
        .await
        .unwrap();

    assert_eq!(outcome, InsertOutcome::Inserted);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires a PostgreSQL database, set DATABASE_URL"]
async fn concurrent_inserts_have_one_winner(db: PgPool) {
    let store = PgStore::from_pool(db);

    let inserts = (0..8).map(|value| {
        let store = store.clone();
        async move {
            store
                .insert_if_absent(document(EventType::R4020, "race", value))
                .await
                .unwrap()
        }
    });
    let outcomes = join_all(inserts).await;

    let inserted = outcomes
        .iter()
        .filter(|outcome| **outcome == InsertOutcome::Inserted)
        .count();
    assert_eq!(inserted, 1);
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires a PostgreSQL database, set DATABASE_URL"]
async fn missing_record_is_none(db: PgPool) {
    let store = PgStore::from_pool(db);
    let key: RecordKey = serde_json::from_value(json!("nope")).unwrap();

    assert_eq!(store.get(EventType::R2010, &key).await.unwrap(), None);
}
