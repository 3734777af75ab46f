use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::events::EventType;
use crate::record_key::RecordKey;

pub mod memory;
pub mod postgres;

/// Errors from a storage backend. A duplicate key is not one of them, see [`InsertOutcome`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("pool creation failed with: {error}")]
    PoolCreationError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError {
        command: String,
        error: sqlx::Error,
    },
    #[error("failed to build storage document: {0}")]
    DocumentError(#[from] serde_json::Error),
}

/// What gets persisted for an accepted event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub event_type: EventType,
    pub key: RecordKey,
    pub body: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Write-once storage, one collection per event type. Concurrent inserts of the same key
/// must resolve to exactly one `Inserted`; the first writer wins and is never overwritten.
#[async_trait]
pub trait RecordStore {
    async fn insert_if_absent(&self, document: StoredDocument) -> Result<InsertOutcome, StoreError>;
}
