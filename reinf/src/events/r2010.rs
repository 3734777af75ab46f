//! R-2010: social security withheld on services taken.

use serde::Serialize;
use serde_json::{Map, Value};
use time::Date;

use super::decode::FieldDecoder;
use super::rules::{self, within_tolerance, TOLERANCE};
use super::{EventType, ValidationError};
use crate::catalog::Catalog;
use crate::identifiers::{normalize_digits, org_id_root, CNPJ_LEN, CNPJ_ROOT_LEN};

const FIELDS: [&str; 13] = [
    "TpEvento",
    "nrInsc",
    "indObra",
    "nrInscEstab",
    "cnpjPrestador",
    "indCPRB",
    "numDocto",
    "serie",
    "dtEmissaoNF",
    "vlrBruto",
    "tpServico",
    "vlrBaseRet",
    "vlrRetencao",
];

/// `indObra`: whether the service was provided on a registered construction site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum ConstructionWork {
    NotApplicable,
    TotalContract,
    PartialContract,
}

impl From<ConstructionWork> for u8 {
    fn from(value: ConstructionWork) -> u8 {
        match value {
            ConstructionWork::NotApplicable => 0,
            ConstructionWork::TotalContract => 1,
            ConstructionWork::PartialContract => 2,
        }
    }
}

/// `indCPRB`: whether the provider pays the CPRB, which lowers the withholding rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum CprbRegime {
    NotSubject,
    Subject,
}

impl From<CprbRegime> for u8 {
    fn from(value: CprbRegime) -> u8 {
        match value {
            CprbRegime::NotSubject => 0,
            CprbRegime::Subject => 1,
        }
    }
}

impl CprbRegime {
    pub fn withholding_rate(&self) -> f64 {
        match *self {
            Self::NotSubject => 0.11,
            Self::Subject => 0.035,
        }
    }

    fn rate_label(&self) -> &'static str {
        match *self {
            Self::NotSubject => "11%",
            Self::Subject => "3,5%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceWithholding {
    #[serde(rename = "nrInsc")]
    pub taker_id: String,
    #[serde(rename = "indObra")]
    pub construction_work: ConstructionWork,
    #[serde(rename = "nrInscEstab")]
    pub establishment_id: String,
    #[serde(rename = "cnpjPrestador")]
    pub provider_id: String,
    #[serde(rename = "indCPRB")]
    pub cprb: CprbRegime,
    #[serde(rename = "numDocto")]
    pub document_number: i64,
    #[serde(rename = "serie")]
    pub series: i64,
    #[serde(rename = "dtEmissaoNF", with = "super::iso_date")]
    pub issue_date: Date,
    #[serde(rename = "vlrBruto")]
    pub gross_value: f64,
    #[serde(rename = "tpServico")]
    pub service_type: i64,
    #[serde(rename = "vlrBaseRet")]
    pub withholding_base: f64,
    #[serde(rename = "vlrRetencao")]
    pub withholding_amount: f64,
}

impl ServiceWithholding {
    pub fn validate(
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<ServiceWithholding, ValidationError> {
        let mut record = Self::decode(payload, catalog)?;
        record.check_rules()?;
        Ok(record)
    }

    fn decode(
        payload: &Map<String, Value>,
        catalog: &Catalog,
    ) -> Result<ServiceWithholding, ValidationError> {
        let mut fields = FieldDecoder::new(payload);

        fields.discriminator(EventType::R2010);
        let taker_id = fields.string("nrInsc");
        let construction_work = fields.choice(
            "indObra",
            &[
                (0, ConstructionWork::NotApplicable),
                (1, ConstructionWork::TotalContract),
                (2, ConstructionWork::PartialContract),
            ],
        );
        let establishment_id = fields.string("nrInscEstab");
        let provider_id = fields.string("cnpjPrestador");
        let cprb = fields.choice(
            "indCPRB",
            &[(0, CprbRegime::NotSubject), (1, CprbRegime::Subject)],
        );
        let document_number = fields.strict_int("numDocto");
        let series = fields.int("serie");
        let issue_date = fields.date("dtEmissaoNF");
        let gross_value = fields.float("vlrBruto");
        let service_type = fields.code("tpServico", &catalog.service_types);
        let withholding_base = fields.float("vlrBaseRet");
        let withholding_amount = fields.float("vlrRetencao");
        fields.reject_unknown(&FIELDS);

        let errors = fields.into_errors();
        match (
            taker_id,
            construction_work,
            establishment_id,
            provider_id,
            cprb,
            document_number,
            series,
            issue_date,
            gross_value,
            service_type,
            withholding_base,
            withholding_amount,
        ) {
            (
                Some(taker_id),
                Some(construction_work),
                Some(establishment_id),
                Some(provider_id),
                Some(cprb),
                Some(document_number),
                Some(series),
                Some(issue_date),
                Some(gross_value),
                Some(service_type),
                Some(withholding_base),
                Some(withholding_amount),
            ) if errors.is_empty() => Ok(ServiceWithholding {
                taker_id,
                construction_work,
                establishment_id,
                provider_id,
                cprb,
                document_number,
                series,
                issue_date,
                gross_value,
                service_type,
                withholding_base,
                withholding_amount,
            }),
            _ => Err(ValidationError::Structural(errors)),
        }
    }

    fn check_rules(&mut self) -> Result<(), ValidationError> {
        self.provider_id = rules::org_id("cnpjPrestador", &self.provider_id)?;
        self.establishment_id = match self.construction_work {
            ConstructionWork::NotApplicable => rules::org_id("nrInscEstab", &self.establishment_id)?,
            ConstructionWork::TotalContract | ConstructionWork::PartialContract => {
                rules::site_id("nrInscEstab", &self.establishment_id)?
            }
        };
        rules::not_above(
            "vlrBaseRet",
            self.withholding_base,
            "vlrBruto",
            self.gross_value,
        )?;
        self.check_withholding_rate()?;
        self.check_taker()?;
        rules::withholding_pair(
            "vlrBaseRet",
            self.withholding_base,
            "vlrRetencao",
            self.withholding_amount,
        )
    }

    fn check_withholding_rate(&self) -> Result<(), ValidationError> {
        let expected = self.withholding_base * self.cprb.withholding_rate();
        if !within_tolerance(self.withholding_amount, expected) {
            return Err(rules::general(format!(
                "vlrRetencao deve ser {} de vlrBaseRet (calculado: {:.2}), mas o valor fornecido foi {:.2}. Tolerância permitida: ±{:.2}.",
                self.cprb.rate_label(),
                expected,
                self.withholding_amount,
                TOLERANCE
            )));
        }
        Ok(())
    }

    /// Outside construction sites the taker is the establishment's organization, given either
    /// as a full CNPJ or as its 8-digit root. A bare root is replaced by the establishment id.
    fn check_taker(&mut self) -> Result<(), ValidationError> {
        let taker = normalize_digits(&self.taker_id);
        if self.construction_work != ConstructionWork::NotApplicable {
            self.taker_id = taker;
            return Ok(());
        }

        let root = org_id_root(&self.establishment_id).unwrap_or_default();
        match taker.len() {
            CNPJ_LEN => {
                let taker = rules::org_id("nrInsc", &taker)?;
                if org_id_root(&taker) != Some(root) {
                    return Err(rules::violation(
                        "nrInsc",
                        format!(
                            "O nrInsc ({}) não pertence à mesma raiz do nrInscEstab ({}).",
                            taker, root
                        ),
                    ));
                }
                self.taker_id = taker;
            }
            CNPJ_ROOT_LEN => {
                if taker != root {
                    return Err(rules::violation(
                        "nrInsc",
                        format!(
                            "O nrInsc ({}) não corresponde ao nrInscEstab ({}).",
                            taker, root
                        ),
                    ));
                }
                self.taker_id = self.establishment_id.clone();
            }
            _ => {
                return Err(rules::violation(
                    "nrInsc",
                    "nrInsc deve ser um CNPJ com 14 dígitos ou os 8 primeiros dígitos de um CNPJ.",
                ))
            }
        }
        Ok(())
    }
}
