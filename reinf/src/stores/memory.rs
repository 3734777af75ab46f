use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{InsertOutcome, RecordStore, StoreError, StoredDocument};
use crate::events::EventType;
use crate::record_key::RecordKey;

type Collections = HashMap<(EventType, RecordKey), Map<String, Value>>;

/// Process-local store for development and tests. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, event_type: EventType, key: &RecordKey) -> Option<Map<String, Value>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(event_type, key.clone()))
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_if_absent(&self, document: StoredDocument) -> Result<InsertOutcome, StoreError> {
        let mut documents = self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match documents.entry((document.event_type, document.key)) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(entry) => {
                entry.insert(document.body);
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document(key: &str, value: i64) -> StoredDocument {
        let Value::Object(body) = json!({"value": value}) else {
            unreachable!()
        };
        StoredDocument {
            event_type: EventType::R4010,
            key: serde_json::from_value(json!(key)).unwrap(),
            body,
        }
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let store = MemoryStore::new();

        assert_eq!(
            store.insert_if_absent(document("k", 1)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_if_absent(document("k", 2)).await.unwrap(),
            InsertOutcome::AlreadyExists
        );

        let key: RecordKey = serde_json::from_value(json!("k")).unwrap();
        assert_eq!(store.get(EventType::R4010, &key).unwrap()["value"], json!(1));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn keys_are_scoped_by_event_type() {
        let store = MemoryStore::new();
        let mut other = document("k", 1);
        other.event_type = EventType::R4020;

        store.insert_if_absent(document("k", 1)).await.unwrap();
        assert_eq!(
            store.insert_if_absent(other).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn clones_share_records() {
        let store = MemoryStore::new();
        let clone = store.clone();

        clone.insert_if_absent(document("k", 1)).await.unwrap();
        assert!(!store.is_empty());
    }
}
