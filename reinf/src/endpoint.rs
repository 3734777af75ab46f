use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use serde_json::Value;
use tracing::instrument;

use crate::api::{ReinfError, StorageStatus, ValidationResponse, Verdict};
use crate::events::EventType;
use crate::persist::{persist_if_valid, PersistOutcome, SkipReason};
use crate::prometheus::{report_received_event, report_rejected_event};
use crate::router;
use crate::tenant::{InvalidTenantReason, Tenant, TENANT_HEADER};

fn extract_tenant(headers: &HeaderMap) -> Result<Tenant, ReinfError> {
    let raw = headers
        .get(TENANT_HEADER)
        .ok_or(ReinfError::NoTenantError)?
        .to_str()
        .map_err(|_| ReinfError::TenantValidationError(InvalidTenantReason::NotAscii))?;

    Ok(Tenant::parse(raw)?)
}

/// Validate one event and store it when accepted.
#[instrument(skip_all, fields(event_type, tenant))]
pub async fn validate_event(
    state: State<router::State>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ValidationResponse>, ReinfError> {
    let tenant = extract_tenant(&headers).map_err(|err| {
        tracing::warn!("rejected request without a valid tenant: {}", err);
        err
    })?;
    tracing::Span::current().record("tenant", tenant.as_str());

    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(payload)) => payload,
        Ok(_) => {
            report_rejected_event("unknown", "dispatch");
            return Err(ReinfError::NotAnObject);
        }
        Err(err) => {
            report_rejected_event("unknown", "dispatch");
            tracing::warn!("failed to parse request body: {}", err);
            return Err(ReinfError::RequestParsingError(err));
        }
    };

    let event_type = EventType::from_payload(&payload).map_err(|err| {
        report_rejected_event("unknown", "dispatch");
        tracing::warn!("{}", err);
        err
    })?;
    tracing::Span::current().record("event_type", event_type.as_str());
    report_received_event(event_type);
    tracing::debug!("validating event");

    let record = event_type
        .validate(&payload, &state.catalog)
        .map_err(|err| {
            report_rejected_event(event_type.as_str(), err.phase());
            for error in err.field_errors() {
                tracing::warn!(field = %error.field, "{}", error.message);
            }
            ReinfError::Validation {
                event: event_type,
                source: err,
            }
        })?;

    let verdict = Verdict::accepted(event_type);
    let outcome = persist_if_valid(
        state.store.as_ref(),
        &verdict,
        &record,
        &payload,
        &tenant,
    )
    .await
    .map_err(|err| {
        tracing::error!("failed to persist event: {}", err);
        ReinfError::RetryableStoreError
    })?;

    let (key, storage) = match outcome {
        PersistOutcome::Inserted(key) => (key, StorageStatus::Inserted),
        PersistOutcome::Skipped(SkipReason::AlreadyExists(key)) => {
            (key, StorageStatus::AlreadyExists)
        }
        PersistOutcome::Skipped(SkipReason::NotValid) => return Err(ReinfError::NotPersisted),
    };

    Ok(Json(ValidationResponse {
        verdict,
        key,
        storage,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn tenant_header_is_required() {
        assert!(matches!(
            extract_tenant(&HeaderMap::new()),
            Err(ReinfError::NoTenantError)
        ));
    }

    #[test]
    fn tenant_header_is_validated() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("  "));

        assert!(matches!(
            extract_tenant(&headers),
            Err(ReinfError::TenantValidationError(InvalidTenantReason::Empty))
        ));

        headers.insert(TENANT_HEADER, HeaderValue::from_static("11222333000181"));
        assert_eq!(
            extract_tenant(&headers).unwrap().as_str(),
            "11222333000181"
        );
    }
}
