//! R-4010: payments to individual beneficiaries.

use serde::Serialize;
use serde_json::{Map, Value};
use time::Date;

use super::decode::FieldDecoder;
use super::rules;
use super::{EventType, ValidationError};
use crate::catalog::Catalog;

const FIELDS: [&str; 9] = [
    "TpEvento",
    "nrInscEstab",
    "cpfBenef",
    "NumDoc",
    "natRend",
    "dtFG",
    "vlrRendBruto",
    "vlrRendTrib",
    "vlrIR",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualIncome {
    #[serde(rename = "nrInscEstab")]
    pub establishment_id: String,
    #[serde(rename = "cpfBenef")]
    pub beneficiary_id: String,
    #[serde(rename = "NumDoc")]
    pub document_number: i64,
    #[serde(rename = "natRend")]
    pub income_nature: i64,
    #[serde(rename = "dtFG", with = "super::iso_date")]
    pub taxable_event_date: Date,
    #[serde(rename = "vlrRendBruto")]
    pub gross_income: f64,
    #[serde(rename = "vlrRendTrib")]
    pub taxable_income: f64,
    #[serde(rename = "vlrIR")]
    pub income_tax: f64,
}

impl IndividualIncome {
    pub fn validate(
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<IndividualIncome, ValidationError> {
        let mut record = Self::decode(payload, catalog)?;
        record.check_rules()?;
        Ok(record)
    }

    fn decode(
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<IndividualIncome, ValidationError> {
        let mut fields = FieldDecoder::new(payload);

        fields.discriminator(EventType::R4010);
        let establishment_id = fields.string("nrInscEstab");
        let beneficiary_id = fields.string("cpfBenef");
        let document_number = fields.strict_int("NumDoc");
        let income_nature = fields.code("natRend", &catalog.individual_income_natures);
        let taxable_event_date = fields.date("dtFG");
        let gross_income = fields.float("vlrRendBruto");
        let taxable_income = fields.float("vlrRendTrib");
        let income_tax = fields.float("vlrIR");
        fields.reject_unknown(&FIELDS);

        let errors = fields.into_errors();
        match (
            establishment_id,
            beneficiary_id,
            document_number,
            income_nature,
            taxable_event_date,
            gross_income,
            taxable_income,
            income_tax,
        ) {
            (
                Some(establishment_id),
                Some(beneficiary_id),
                Some(document_number),
                Some(income_nature),
                Some(taxable_event_date),
                Some(gross_income),
                Some(taxable_income),
                Some(income_tax),
            ) if errors.is_empty() => Ok(IndividualIncome {
                establishment_id,
                beneficiary_id,
                document_number,
                income_nature,
                taxable_event_date,
                gross_income,
                taxable_income,
                income_tax,
            }),
            _ => Err(ValidationError::Structural(errors)),
        }
    }

    fn check_rules(&mut self) -> Result<(), ValidationError> {
        self.beneficiary_id = rules::individual_id("cpfBenef", &self.beneficiary_id)?;
        self.establishment_id = rules::org_id("nrInscEstab", &self.establishment_id)?;
        rules::not_above(
            "vlrRendTrib",
            self.taxable_income,
            "vlrRendBruto",
            self.gross_income,
        )?;

        if self.taxable_income == 0.0 {
            if self.income_tax > 0.0 {
                return Err(rules::general(
                    "Quando não houver valor tributável (vlrRendTrib = 0), não pode haver imposto (vlrIR > 0).",
                ));
            }
            return Ok(());
        }

        if self.income_tax <= 0.0 {
            return Err(rules::general(
                "Quando houver valor tributável (vlrRendTrib > 0), deve haver imposto (vlrIR > 0).",
            ));
        }
        if self.income_tax > self.taxable_income {
            return Err(rules::general(
                "O valor do imposto (vlrIR) não pode ser maior que a base tributável (vlrRendTrib).",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::test_catalog;
    use crate::events::FieldError;

    fn validate(overrides: Value) -> Result<IndividualIncome, ValidationError> {
        let mut payload = json!({
            "TpEvento": "R4010",
            "nrInscEstab": "11.222.333/0001-81",
            "cpfBenef": "529.982.247-25",
            "NumDoc": 42,
            "natRend": 10001,
            "dtFG": "2024-05-10",
            "vlrRendBruto": 1000,
            "vlrRendTrib": 100,
            "vlrIR": 10
        });
        if let (Value::Object(map), Value::Object(extra)) = (&mut payload, overrides) {
            map.extend(extra);
        }
        match payload {
            Value::Object(map) => IndividualIncome::validate(&map, &test_catalog()),
            _ => unreachable!(),
        }
    }

    fn rule_message(result: Result<IndividualIncome, ValidationError>) -> String {
        match result {
            Err(ValidationError::Rule(FieldError { message, .. })) => message,
            other => panic!("expected a rule error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_and_normalizes() {
        let record = validate(json!({})).unwrap();

        assert_eq!(record.beneficiary_id, "52998224725");
        assert_eq!(record.establishment_id, "11222333000181");
        assert_eq!(record.gross_income, 1000.0);
    }

    #[test]
    fn zero_taxable_income_admits_no_tax() {
        assert!(validate(json!({"vlrRendTrib": 0, "vlrIR": 0})).is_ok());
        assert_eq!(
            rule_message(validate(json!({"vlrRendTrib": 0, "vlrIR": 0.01}))),
            "Quando não houver valor tributável (vlrRendTrib = 0), não pode haver imposto (vlrIR > 0)."
        );
    }

    #[test]
    fn taxable_income_requires_bounded_tax() {
        assert_eq!(
            rule_message(validate(json!({"vlrIR": 0}))),
            "Quando houver valor tributável (vlrRendTrib > 0), deve haver imposto (vlrIR > 0)."
        );
        assert_eq!(
            rule_message(validate(json!({"vlrIR": 150}))),
            "O valor do imposto (vlrIR) não pode ser maior que a base tributável (vlrRendTrib)."
        );
        assert!(validate(json!({"vlrIR": 100})).is_ok());
    }

    #[test]
    fn taxable_cannot_exceed_gross() {
        assert_eq!(
            rule_message(validate(json!({"vlrRendTrib": 2000, "vlrIR": 0}))),
            "vlrRendTrib não pode ser maior que vlrRendBruto."
        );
    }

    #[test]
    fn repeated_individual_id_is_refused() {
        let err = validate(json!({"cpfBenef": "000.000.000-00"})).unwrap_err();
        assert_eq!(
            err.field_errors(),
            vec![FieldError::new("cpfBenef", "CPF inválido: sequência repetida.")]
        );
    }

    #[test]
    fn beneficiary_checked_before_establishment() {
        let err = validate(json!({"cpfBenef": "52998224726", "nrInscEstab": "1"})).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "cpfBenef");
    }

    #[test]
    fn organization_income_nature_is_refused() {
        let err = validate(json!({"natRend": 15001})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Structural(vec![FieldError::new(
                "natRend",
                "Valor inválido para natRend: 15001."
            )])
        );
    }

    #[test]
    fn document_number_is_strict() {
        let err = validate(json!({"NumDoc": "42"})).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "NumDoc");

        let err = validate(json!({"NumDoc": true})).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "NumDoc");
    }
}
