use serde_json::{Map, Value};
use tracing::instrument;

use crate::api::Verdict;
use crate::events::ValidRecord;
use crate::prometheus::report_insert;
use crate::record_key::RecordKey;
use crate::stores::{InsertOutcome, RecordStore, StoreError, StoredDocument};
use crate::tenant::Tenant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotValid,
    AlreadyExists(RecordKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted(RecordKey),
    Skipped(SkipReason),
}

/// The persisted form of an accepted event: the payload as sent, overlaid with the normalized
/// record fields, then the verdict, then `_id`.
pub fn storage_document(
    payload: &Map<String, Value>,
    record: &ValidRecord,
    verdict: &Verdict,
    key: &RecordKey,
) -> Result<Map<String, Value>, serde_json::Error> {
    let mut document = payload.clone();
    document.extend(record.to_fields()?);
    if let Value::Object(verdict) = serde_json::to_value(verdict)? {
        document.extend(verdict);
    }
    document.insert("_id".to_owned(), Value::String(key.as_str().to_owned()));
    Ok(document)
}

/// Store an accepted event unless its key is already taken. A taken key is a normal outcome:
/// re-submitting the same event is idempotent.
#[instrument(skip_all, fields(event = %verdict.event, tenant = %tenant))]
pub async fn persist_if_valid<S>(
    store: &S,
    verdict: &Verdict,
    record: &ValidRecord,
    payload: &Map<String, Value>,
    tenant: &Tenant,
) -> Result<PersistOutcome, StoreError>
where
    S: RecordStore + Send + Sync + ?Sized,
{
    if !verdict.is_accepted() {
        return Ok(PersistOutcome::Skipped(SkipReason::NotValid));
    }

    let event_type = record.event_type();
    let key = RecordKey::build(record, tenant);
    let body = storage_document(payload, record, verdict, &key)?;

    let outcome = store
        .insert_if_absent(StoredDocument {
            event_type,
            key: key.clone(),
            body,
        })
        .await?;

    report_insert(event_type, outcome);
    match outcome {
        InsertOutcome::Inserted => {
            tracing::info!(key = %key, "record stored");
            Ok(PersistOutcome::Inserted(key))
        }
        InsertOutcome::AlreadyExists => {
            tracing::info!(key = %key, "record already stored, skipping");
            Ok(PersistOutcome::Skipped(SkipReason::AlreadyExists(key)))
        }
    }
}
