use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {error}")]
    ReadError {
        path: String,
        error: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("catalog table {0} is empty")]
    EmptyTable(&'static str),
}

/// A closed set of codes accepted for one payload field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CodeTable(BTreeMap<i64, String>);

impl CodeTable {
    pub fn contains(&self, code: i64) -> bool {
        self.0.contains_key(&code)
    }

    pub fn description(&self, code: i64) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(i64, String)> for CodeTable {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        CodeTable(iter.into_iter().collect())
    }
}

/// Reference tables the validators check enumerated fields against. They are data, not
/// code, so a new table revision only needs a new file.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    /// Service types accepted in R-2010 `tpServico`.
    #[serde(rename = "tpServico")]
    pub service_types: CodeTable,
    /// Income natures accepted in R-4010 `natRend`.
    #[serde(rename = "natRendPF")]
    pub individual_income_natures: CodeTable,
    /// Income natures accepted in R-4020 `natRend`.
    #[serde(rename = "natRendPJ")]
    pub organization_income_natures: CodeTable,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Catalog, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| CatalogError::ReadError {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_json(&json)
    }

    fn check(&self) -> Result<(), CatalogError> {
        let tables = [
            ("tpServico", &self.service_types),
            ("natRendPF", &self.individual_income_natures),
            ("natRendPJ", &self.organization_income_natures),
        ];
        match tables.iter().find(|(_, table)| table.is_empty()) {
            Some((name, _)) => Err(CatalogError::EmptyTable(*name)),
            None => Ok(()),
        }
    }
}

/// Partial tables used by the unit tests.
#[cfg(test)]
pub(crate) fn test_catalog() -> Catalog {
    Catalog::from_json(include_str!("../tests/fixtures/tabelas.json"))
        .expect("test catalog must parse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_tables_load() {
        let catalog = test_catalog();

        assert_eq!(catalog.service_types.len(), 31);
        assert!(catalog.service_types.contains(100000003));
        assert!(!catalog.service_types.contains(100000099));
        assert!(catalog.individual_income_natures.contains(10001));
        assert!(catalog.organization_income_natures.contains(15001));
        assert!(!catalog.organization_income_natures.contains(10001));
    }

    #[test]
    fn loads_custom_tables() {
        let catalog = Catalog::from_json(
            r#"{"tpServico": {"1": "um"}, "natRendPF": {"2": "dois"}, "natRendPJ": {"3": "tres"}}"#,
        )
        .unwrap();

        assert_eq!(catalog.service_types.description(1), Some("um"));
        assert!(!catalog.service_types.contains(2));
    }

    #[test]
    fn rejects_empty_tables() {
        let result =
            Catalog::from_json(r#"{"tpServico": {"1": "um"}, "natRendPF": {}, "natRendPJ": {"3": "tres"}}"#);

        match result {
            Err(CatalogError::EmptyTable("natRendPF")) => (),
            other => panic!("expected EmptyTable, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_numeric_codes() {
        let result = Catalog::from_json(
            r#"{"tpServico": {"abc": "x"}, "natRendPF": {"2": "y"}, "natRendPJ": {"3": "z"}}"#,
        );

        assert!(matches!(result, Err(CatalogError::ParseError(_))));
    }

    #[test]
    fn loads_from_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tabelas.json");
        let catalog = Catalog::from_path(path).unwrap();

        assert!(catalog.organization_income_natures.contains(15001));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = Catalog::from_path("/nonexistent/tabelas.json");

        assert!(matches!(result, Err(CatalogError::ReadError { .. })));
    }
}
