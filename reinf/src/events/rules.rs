use super::{FieldError, ValidationError};
use crate::identifiers::{
    normalize_digits, validate_individual_id, validate_org_id, validate_site_id, IdentifierError,
};

/// Monetary comparisons tolerate one cent of difference.
pub(super) const TOLERANCE: f64 = 0.01;

fn identifier(field: &'static str) -> impl Fn(IdentifierError) -> ValidationError {
    move |source| ValidationError::Identifier { field, source }
}

pub(super) fn org_id(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let digits = normalize_digits(value);
    validate_org_id(&digits).map_err(identifier(field))?;
    Ok(digits)
}

pub(super) fn individual_id(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let digits = normalize_digits(value);
    validate_individual_id(&digits).map_err(identifier(field))?;
    Ok(digits)
}

pub(super) fn site_id(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let digits = normalize_digits(value);
    validate_site_id(&digits).map_err(identifier(field))?;
    Ok(digits)
}

pub(super) fn violation(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::Rule(FieldError::new(field, message))
}

pub(super) fn general(message: impl Into<String>) -> ValidationError {
    ValidationError::Rule(FieldError::general(message))
}

/// Whether `actual` is within [`TOLERANCE`] of `expected`. The slack above the tolerance is a
/// few ulps at the operands' magnitude, enough to absorb products like `200.0 * 0.035`.
pub(super) fn within_tolerance(actual: f64, expected: f64) -> bool {
    let scale = actual.abs().max(expected.abs()).max(1.0);
    (actual - expected).abs() <= TOLERANCE + 8.0 * f64::EPSILON * scale
}

/// `part` may not exceed `whole`.
pub(super) fn not_above(
    part_name: &str,
    part: f64,
    whole_name: &str,
    whole: f64,
) -> Result<(), ValidationError> {
    if part > whole {
        return Err(general(format!(
            "{} não pode ser maior que {}.",
            part_name, whole_name
        )));
    }
    Ok(())
}

/// A withheld amount and its calculation base are either both zero or both positive.
pub(super) fn withholding_pair(
    base_name: &str,
    base: f64,
    amount_name: &str,
    amount: f64,
) -> Result<(), ValidationError> {
    if amount == 0.0 && base > 0.0 {
        return Err(general(format!(
            "Quando não houver valor de imposto ({}), não pode haver base de cálculo ({}).",
            amount_name, base_name
        )));
    }
    if amount > 0.0 && base <= 0.0 {
        return Err(general(format!(
            "Quando houver valor de imposto ({} > 0), deve haver base de cálculo ({} > 0).",
            amount_name, base_name
        )));
    }
    Ok(())
}

/// A zero base admits no tax; a positive base requires a tax no larger than itself.
pub(super) fn income_pair(
    base_name: &str,
    base: f64,
    amount_name: &str,
    amount: f64,
) -> Result<(), ValidationError> {
    if base == 0.0 {
        if amount > 0.0 {
            return Err(general(format!(
                "Quando não houver valor de {} (valor = 0), não pode haver valor em {} (> 0).",
                base_name, amount_name
            )));
        }
        return Ok(());
    }
    if amount <= 0.0 {
        return Err(general(format!(
            "Quando houver valor de {} (> 0), deve haver valor em {} (> 0).",
            base_name, amount_name
        )));
    }
    if amount > base {
        return Err(general(format!(
            "O valor de {} não pode ser maior que o da {}.",
            amount_name, base_name
        )));
    }
    Ok(())
}
