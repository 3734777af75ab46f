use serde_json::{Map, Value};
use time::macros::format_description;
use time::Date;

use super::{EventType, FieldError};
use crate::catalog::CodeTable;

const MISSING: &str = "Campo obrigatório.";
const NOT_ALLOWED: &str = "Campo não permitido.";
const NOT_TEXT: &str = "Deve ser um texto.";
const NOT_INTEGER: &str = "Deve ser um número inteiro.";
const NOT_NUMBER: &str = "Deve ser um número.";
const NOT_DATE: &str = "Deve ser uma data válida no formato AAAA-MM-DD.";

/// Reads typed fields out of a payload, collecting every problem instead of stopping at the
/// first one. Each getter returns `None` exactly when it recorded an error.
pub(super) struct FieldDecoder<'a> {
    payload: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldDecoder<'a> {
    pub fn new(payload: &'a Map<String, Value>) -> Self {
        Self {
            payload,
            errors: Vec::new(),
        }
    }

    fn fail<T>(&mut self, field: &str, message: impl Into<String>) -> Option<T> {
        self.errors.push(FieldError::new(field, message));
        None
    }

    fn required(&mut self, field: &str) -> Option<&'a Value> {
        match self.payload.get(field) {
            Some(value) => Some(value),
            None => self.fail(field, MISSING),
        }
    }

    /// The discriminator must be present and name exactly this event.
    pub fn discriminator(&mut self, expected: EventType) {
        match self.required(EventType::FIELD) {
            Some(Value::String(code)) if code == expected.as_str() => (),
            Some(_) => {
                self.errors.push(FieldError::new(
                    EventType::FIELD,
                    format!("Deve ser \"{}\".", expected),
                ));
            }
            None => (),
        }
    }

    pub fn string(&mut self, field: &str) -> Option<String> {
        match self.required(field)? {
            Value::String(value) => Some(value.clone()),
            _ => self.fail(field, NOT_TEXT),
        }
    }

    /// A JSON integer, nothing converted.
    pub fn strict_int(&mut self, field: &str) -> Option<i64> {
        match self.required(field)? {
            Value::Number(number) => number.as_i64().or_else(|| self.fail(field, NOT_INTEGER)),
            _ => self.fail(field, NOT_INTEGER),
        }
    }

    /// An integer, also accepted as a float without fractional part or as an integer string.
    /// Booleans are refused.
    pub fn int(&mut self, field: &str) -> Option<i64> {
        let parsed = match self.required(field)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(whole_number)),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.or_else(|| self.fail(field, NOT_INTEGER))
    }

    /// A finite number, also accepted as a numeric string.
    pub fn float(&mut self, field: &str) -> Option<f64> {
        let parsed = match self.required(field)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|value| value.is_finite())
            .or_else(|| self.fail(field, NOT_NUMBER))
    }

    pub fn date(&mut self, field: &str) -> Option<Date> {
        let parsed = match self.required(field)? {
            Value::String(text) => Date::parse(text, format_description!("[year]-[month]-[day]")).ok(),
            _ => None,
        };
        parsed.or_else(|| self.fail(field, NOT_DATE))
    }

    /// A strict integer that must be one of the listed codes.
    pub fn choice<T: Copy>(&mut self, field: &str, options: &[(i64, T)]) -> Option<T> {
        let code = self.strict_int(field)?;
        match options.iter().find(|(candidate, _)| *candidate == code) {
            Some((_, value)) => Some(*value),
            None => {
                let allowed: Vec<String> = options.iter().map(|(c, _)| c.to_string()).collect();
                self.fail(
                    field,
                    format!("Deve ser um dos valores: {}.", allowed.join(", ")),
                )
            }
        }
    }

    /// A strict integer that must be listed in a catalog table.
    pub fn code(&mut self, field: &str, table: &CodeTable) -> Option<i64> {
        let code = self.strict_int(field)?;
        if table.contains(code) {
            Some(code)
        } else {
            self.fail(field, format!("Valor inválido para {}: {}.", field, code))
        }
    }

    /// Record an error for every payload field outside `known`.
    pub fn reject_unknown(&mut self, known: &[&str]) {
        let unknown: Vec<&String> = self
            .payload
            .keys()
            .filter(|key| !known.contains(&key.as_str()))
            .collect();
        for key in unknown {
            self.errors.push(FieldError::new(key.as_str(), NOT_ALLOWED));
        }
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

fn whole_number(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e18 {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn collects_every_error() {
        let payload = object(json!({"a": 1, "b": true}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.string("a"), None);
        assert_eq!(fields.int("b"), None);
        assert_eq!(fields.float("c"), None);

        let errors = fields.into_errors();
        assert_eq!(
            errors,
            vec![
                FieldError::new("a", NOT_TEXT),
                FieldError::new("b", NOT_INTEGER),
                FieldError::new("c", MISSING),
            ]
        );
    }

    #[test]
    fn lax_integers() {
        let payload = object(json!({"int": 7, "float": 7.0, "text": " 7 ", "frac": 7.5, "word": "sete"}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.int("int"), Some(7));
        assert_eq!(fields.int("float"), Some(7));
        assert_eq!(fields.int("text"), Some(7));
        assert_eq!(fields.int("frac"), None);
        assert_eq!(fields.int("word"), None);
        assert_eq!(fields.into_errors().len(), 2);
    }

    #[test]
    fn strict_integers() {
        let payload = object(json!({"int": 1, "float": 1.0, "text": "1", "bool": false}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.strict_int("int"), Some(1));
        assert_eq!(fields.strict_int("float"), None);
        assert_eq!(fields.strict_int("text"), None);
        assert_eq!(fields.strict_int("bool"), None);
    }

    #[test]
    fn floats() {
        let payload = object(json!({"n": 10.5, "i": 3, "s": "2.25", "bad": "x", "inf": "inf"}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.float("n"), Some(10.5));
        assert_eq!(fields.float("i"), Some(3.0));
        assert_eq!(fields.float("s"), Some(2.25));
        assert_eq!(fields.float("bad"), None);
        assert_eq!(fields.float("inf"), None);
    }

    #[test]
    fn dates() {
        let payload = object(json!({"ok": "2024-02-29", "bad": "2023-02-29", "br": "29/02/2024"}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.date("ok"), Some(date!(2024 - 02 - 29)));
        assert_eq!(fields.date("bad"), None);
        assert_eq!(fields.date("br"), None);
    }

    #[test]
    fn choices_list_allowed_values() {
        let payload = object(json!({"flag": 3}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.choice("flag", &[(0, 'a'), (1, 'b')]), None);
        assert_eq!(
            fields.into_errors(),
            vec![FieldError::new("flag", "Deve ser um dos valores: 0, 1.")]
        );
    }

    #[test]
    fn codes_must_be_in_table() {
        let table: CodeTable = [(10, "dez".to_owned())].into_iter().collect();
        let payload = object(json!({"ok": 10, "unknown": 11, "text": "10"}));
        let mut fields = FieldDecoder::new(&payload);

        assert_eq!(fields.code("ok", &table), Some(10));
        assert_eq!(fields.code("unknown", &table), None);
        assert_eq!(fields.code("text", &table), None);
        assert_eq!(
            fields.into_errors()[0],
            FieldError::new("unknown", "Valor inválido para unknown: 11.")
        );
    }

    #[test]
    fn discriminator_must_match() {
        let payload = object(json!({"TpEvento": "R4010", "extra": 1}));
        let mut fields = FieldDecoder::new(&payload);

        fields.discriminator(EventType::R2010);
        fields.reject_unknown(&["TpEvento"]);

        assert_eq!(
            fields.into_errors(),
            vec![
                FieldError::new("TpEvento", "Deve ser \"R2010\"."),
                FieldError::new("extra", NOT_ALLOWED),
            ]
        );
    }
}
