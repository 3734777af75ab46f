//! R-4020: payments to organization beneficiaries.

use serde::Serialize;
use serde_json::{Map, Value};
use time::Date;

use super::decode::FieldDecoder;
use super::rules;
use super::{EventType, ValidationError};
use crate::catalog::Catalog;

const FIELDS: [&str; 11] = [
    "TpEvento",
    "nrInscEstab",
    "cnpjBenef",
    "NumDoc",
    "natRend",
    "dtFG",
    "vlrBruto",
    "vlrBaseIR",
    "vlrIR",
    "vlrBaseAgreg",
    "vlrAgreg",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationIncome {
    #[serde(rename = "nrInscEstab")]
    pub establishment_id: String,
    #[serde(rename = "cnpjBenef")]
    pub beneficiary_id: String,
    #[serde(rename = "NumDoc")]
    pub document_number: i64,
    #[serde(rename = "natRend")]
    pub income_nature: i64,
    #[serde(rename = "dtFG", with = "super::iso_date")]
    pub taxable_event_date: Date,
    #[serde(rename = "vlrBruto")]
    pub gross_value: f64,
    #[serde(rename = "vlrBaseIR")]
    pub income_tax_base: f64,
    #[serde(rename = "vlrIR")]
    pub income_tax: f64,
    /// Base of the aggregated withholding (CSLL, COFINS and PIS/PASEP collected together).
    #[serde(rename = "vlrBaseAgreg")]
    pub aggregated_base: f64,
    #[serde(rename = "vlrAgreg")]
    pub aggregated_tax: f64,
}

impl OrganizationIncome {
    pub fn validate(
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<OrganizationIncome, ValidationError> {
        let mut record = Self::decode(payload, catalog)?;
        record.check_rules()?;
        Ok(record)
    }

    fn decode(
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<OrganizationIncome, ValidationError> {
        let mut fields = FieldDecoder::new(payload);

        fields.discriminator(EventType::R4020);
        let establishment_id = fields.string("nrInscEstab");
        let beneficiary_id = fields.string("cnpjBenef");
        let document_number = fields.strict_int("NumDoc");
        let income_nature = fields.code("natRend", &catalog.organization_income_natures);
        let taxable_event_date = fields.date("dtFG");
        let gross_value = fields.float("vlrBruto");
        let income_tax_base = fields.float("vlrBaseIR");
        let income_tax = fields.float("vlrIR");
        let aggregated_base = fields.float("vlrBaseAgreg");
        let aggregated_tax = fields.float("vlrAgreg");
        fields.reject_unknown(&FIELDS);

        let errors = fields.into_errors();
        match (
            establishment_id,
            beneficiary_id,
            document_number,
            income_nature,
            taxable_event_date,
            gross_value,
            income_tax_base,
            income_tax,
            aggregated_base,
            aggregated_tax,
        ) {
            (
                Some(establishment_id),
                Some(beneficiary_id),
                Some(document_number),
                Some(income_nature),
                Some(taxable_event_date),
                Some(gross_value),
                Some(income_tax_base),
                Some(income_tax),
                Some(aggregated_base),
                Some(aggregated_tax),
            ) if errors.is_empty() => Ok(OrganizationIncome {
                establishment_id,
                beneficiary_id,
                document_number,
                income_nature,
                taxable_event_date,
                gross_value,
                income_tax_base,
                income_tax,
                aggregated_base,
                aggregated_tax,
            }),
            _ => Err(ValidationError::Structural(errors)),
        }
    }

    fn check_rules(&mut self) -> Result<(), ValidationError> {
        self.beneficiary_id = rules::org_id("cnpjBenef", &self.beneficiary_id)?;
        self.establishment_id = rules::org_id("nrInscEstab", &self.establishment_id)?;
        rules::not_above("vlrBaseIR", self.income_tax_base, "vlrBruto", self.gross_value)?;
        rules::not_above("vlrBaseAgreg", self.aggregated_base, "vlrBruto", self.gross_value)?;
        rules::income_pair("vlrBaseIR", self.income_tax_base, "vlrIR", self.income_tax)?;
        rules::income_pair(
            "vlrBaseAgreg",
            self.aggregated_base,
            "vlrAgreg",
            self.aggregated_tax,
        )
    }
}
