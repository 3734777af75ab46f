//! EFD-Reinf event validation.
//!
//! Validation runs in two phases. Decoding checks every field's presence and type and
//! reports all structural problems at once. Business rules then run in a fixed order on the
//! decoded record and stop at the first violation.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::Date;

use crate::catalog::Catalog;
use crate::identifiers::IdentifierError;

mod decode;
pub mod r2010;
pub mod r4010;
pub mod r4020;
mod rules;

pub use r2010::{ConstructionWork, CprbRegime, ServiceWithholding};
pub use r4010::IndividualIncome;
pub use r4020::OrganizationIncome;

/// Field path for errors raised by a rule that spans several fields.
pub const GENERAL_FIELD: &str = "geral";

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    R2010,
    R4010,
    R4020,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventTypeError {
    #[error("Tipo de evento (TpEvento) não informado.")]
    MissingEventType,
    #[error("Evento '{0}' não reconhecido.")]
    UnrecognizedEventType(String),
}

impl EventType {
    /// Payload field holding the event discriminator.
    pub const FIELD: &'static str = "TpEvento";

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::R2010 => "R2010",
            Self::R4010 => "R4010",
            Self::R4020 => "R4020",
        }
    }

    /// Read the discriminator of a raw payload. An absent, null or empty value is missing,
    /// anything else that is not a known code is unrecognized.
    pub fn from_payload(payload: &Map<String, Value>) -> Result<EventType, EventTypeError> {
        match payload.get(Self::FIELD) {
            None | Some(Value::Null) => Err(EventTypeError::MissingEventType),
            Some(Value::String(code)) if code.is_empty() => Err(EventTypeError::MissingEventType),
            Some(Value::String(code)) => code.parse(),
            Some(other) => Err(EventTypeError::UnrecognizedEventType(other.to_string())),
        }
    }

    /// Decode and check a payload as an event of this type.
    pub fn validate(
        self,
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<ValidRecord, ValidationError> {
        match self {
            Self::R2010 => {
                ServiceWithholding::validate(payload, catalog).map(ValidRecord::ServiceWithholding)
            }
            Self::R4010 => {
                IndividualIncome::validate(payload, catalog).map(ValidRecord::IndividualIncome)
            }
            Self::R4020 => {
                OrganizationIncome::validate(payload, catalog).map(ValidRecord::OrganizationIncome)
            }
        }
    }
}

impl FromStr for EventType {
    type Err = EventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R2010" => Ok(Self::R2010),
            "R4010" => Ok(Self::R4010),
            "R4020" => Ok(Self::R4020),
            other => Err(EventTypeError::UnrecognizedEventType(other.to_owned())),
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One problem found in a payload, located by its field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "campo")]
    pub field: String,
    #[serde(rename = "mensagem")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> FieldError {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> FieldError {
        Self::new(GENERAL_FIELD, message)
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Campo: {} | Erro: {}", self.field, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("payload has {} structural error(s)", .0.len())]
    Structural(Vec<FieldError>),
    #[error("{0}")]
    Rule(FieldError),
    #[error("Campo: {field} | Erro: {source}")]
    Identifier {
        field: &'static str,
        source: IdentifierError,
    },
}

impl ValidationError {
    /// Errors in the shape returned to clients.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Structural(errors) => errors.clone(),
            Self::Rule(error) => vec![error.clone()],
            Self::Identifier { field, source } => vec![FieldError::new(*field, source.to_string())],
        }
    }

    /// Which validation phase refused the payload, used as a metric label.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Structural(_) => "decode",
            Self::Rule(_) | Self::Identifier { .. } => "rules",
        }
    }
}

/// A payload that passed every check, with identifiers normalized to digits.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidRecord {
    ServiceWithholding(ServiceWithholding),
    IndividualIncome(IndividualIncome),
    OrganizationIncome(OrganizationIncome),
}

impl ValidRecord {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::ServiceWithholding(_) => EventType::R2010,
            Self::IndividualIncome(_) => EventType::R4010,
            Self::OrganizationIncome(_) => EventType::R4020,
        }
    }

    pub fn document_number(&self) -> i64 {
        match self {
            Self::ServiceWithholding(record) => record.document_number,
            Self::IndividualIncome(record) => record.document_number,
            Self::OrganizationIncome(record) => record.document_number,
        }
    }

    pub fn establishment_id(&self) -> &str {
        match self {
            Self::ServiceWithholding(record) => &record.establishment_id,
            Self::IndividualIncome(record) => &record.establishment_id,
            Self::OrganizationIncome(record) => &record.establishment_id,
        }
    }

    /// The provider (R-2010) or beneficiary (R-4010, R-4020) identifier.
    pub fn counterparty_id(&self) -> &str {
        match self {
            Self::ServiceWithholding(record) => &record.provider_id,
            Self::IndividualIncome(record) => &record.beneficiary_id,
            Self::OrganizationIncome(record) => &record.beneficiary_id,
        }
    }

    /// The record as wire fields, discriminator included.
    pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let value = match self {
            Self::ServiceWithholding(record) => serde_json::to_value(record)?,
            Self::IndividualIncome(record) => serde_json::to_value(record)?,
            Self::OrganizationIncome(record) => serde_json::to_value(record)?,
        };

        let mut fields = match value {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.insert(
            EventType::FIELD.to_owned(),
            Value::String(self.event_type().as_str().to_owned()),
        );
        Ok(fields)
    }
}
