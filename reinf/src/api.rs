use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::events::{EventType, EventTypeError, ValidationError};
use crate::record_key::RecordKey;
use crate::tenant::InvalidTenantReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum VerdictStatus {
    #[serde(rename = "valido")]
    Valid,
    #[serde(rename = "invalido")]
    Invalid,
}

/// Outcome of validating one event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Verdict {
    #[serde(rename = "evento")]
    pub event: EventType,
    pub status: VerdictStatus,
    #[serde(rename = "mensagem")]
    pub message: String,
}

impl Verdict {
    pub fn accepted(event: EventType) -> Verdict {
        Verdict {
            event,
            status: VerdictStatus::Valid,
            message: format!("Evento {} validado com sucesso!", event),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == VerdictStatus::Valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum StorageStatus {
    #[serde(rename = "inserido")]
    Inserted,
    #[serde(rename = "existente")]
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationResponse {
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(rename = "chave")]
    pub key: RecordKey,
    #[serde(rename = "armazenamento")]
    pub storage: StorageStatus,
}

#[derive(Error, Debug)]
pub enum ReinfError {
    #[error("failed to parse request: {0}")]
    RequestParsingError(#[from] serde_json::Error),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("{0}")]
    EventTypeError(#[from] EventTypeError),

    #[error("request submitted without a tenant")]
    NoTenantError,
    #[error("tenant is not valid: {0}")]
    TenantValidationError(#[from] InvalidTenantReason),

    #[error("event {event} failed validation: {source}")]
    Validation {
        event: EventType,
        source: ValidationError,
    },

    #[error("transient error, please retry")]
    RetryableStoreError,
    #[error("accepted event was not persisted")]
    NotPersisted,
}

impl IntoResponse for ReinfError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ReinfError::RequestParsingError(_)
            | ReinfError::NotAnObject
            | ReinfError::EventTypeError(_) => (StatusCode::BAD_REQUEST, json!(self.to_string())),

            ReinfError::NoTenantError | ReinfError::TenantValidationError(_) => {
                (StatusCode::UNAUTHORIZED, json!(self.to_string()))
            }

            ReinfError::Validation { ref source, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!(source.field_errors()),
            ),

            ReinfError::RetryableStoreError => {
                (StatusCode::SERVICE_UNAVAILABLE, json!(self.to_string()))
            }
            ReinfError::NotPersisted => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!(self.to_string()))
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
