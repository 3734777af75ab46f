//! Brazilian national registration numbers: CNPJ (organizations), CPF (individuals) and
//! CNO (construction sites).
//!
//! Every function here expects a digits-only input, see [`normalize_digits`].

use std::fmt::Display;

use thiserror::Error;

/// Length of a full CNPJ.
pub const CNPJ_LEN: usize = 14;
const CPF_LEN: usize = 11;
const CNO_LEN: usize = 12;

/// Length of the CNPJ root, shared by every establishment of the same organization.
pub const CNPJ_ROOT_LEN: usize = 8;

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("{kind} deve conter {expected} dígitos numéricos.")]
    InvalidFormat {
        kind: IdentifierKind,
        expected: usize,
    },
    #[error("{0} inválido: sequência repetida.")]
    RepeatedSequence(IdentifierKind),
    #[error("{kind} inválido: dígitos verificadores incorretos (esperado={expected}, recebido={received}).")]
    InvalidChecksum {
        kind: IdentifierKind,
        expected: String,
        received: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Cnpj,
    Cpf,
    Cno,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Cnpj => "CNPJ",
            Self::Cpf => "CPF",
            Self::Cno => "CNO",
        }
    }
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strip every non-digit character. Never fails, the result may be empty.
///
/// Only ASCII `0`-`9` count as digits, other Unicode decimal digits are stripped too.
pub fn normalize_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn digit_values(value: &str) -> impl Iterator<Item = u32> + '_ {
    value.bytes().map(|b| u32::from(b - b'0'))
}

fn cnpj_digit(digits: &str, weights: &[u32]) -> char {
    let sum: u32 = digit_values(digits).zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        remainder if remainder < 2 => '0',
        remainder => char::from_digit(11 - remainder, 10).unwrap_or('0'),
    }
}

/// Compute the two CNPJ check digits for a 12-digit base.
pub fn org_id_check_digits(base: &str) -> Result<String, IdentifierError> {
    if !is_digits(base, CNPJ_LEN - 2) {
        return Err(IdentifierError::InvalidFormat {
            kind: IdentifierKind::Cnpj,
            expected: CNPJ_LEN - 2,
        });
    }

    let first = cnpj_digit(base, &CNPJ_FIRST_WEIGHTS);
    let mut extended = String::with_capacity(CNPJ_LEN - 1);
    extended.push_str(base);
    extended.push(first);
    let second = cnpj_digit(&extended, &CNPJ_SECOND_WEIGHTS);

    Ok([first, second].iter().collect())
}

/// Validate a digits-only CNPJ.
pub fn validate_org_id(digits: &str) -> Result<(), IdentifierError> {
    if !is_digits(digits, CNPJ_LEN) {
        return Err(IdentifierError::InvalidFormat {
            kind: IdentifierKind::Cnpj,
            expected: CNPJ_LEN,
        });
    }

    let (base, received) = digits.split_at(CNPJ_LEN - 2);
    let expected = org_id_check_digits(base)?;
    if expected != received {
        return Err(IdentifierError::InvalidChecksum {
            kind: IdentifierKind::Cnpj,
            expected,
            received: received.to_owned(),
        });
    }

    Ok(())
}

fn cpf_digit(digits: &str, first_weight: u32) -> char {
    let weights = (2..=first_weight).rev();
    let sum: u32 = digit_values(digits).zip(weights).map(|(d, w)| d * w).sum();
    match sum * 10 % 11 {
        10 => '0',
        remainder => char::from_digit(remainder, 10).unwrap_or('0'),
    }
}

/// Compute the two CPF check digits for a 9-digit base.
pub fn individual_id_check_digits(base: &str) -> Result<String, IdentifierError> {
    if !is_digits(base, CPF_LEN - 2) {
        return Err(IdentifierError::InvalidFormat {
            kind: IdentifierKind::Cpf,
            expected: CPF_LEN - 2,
        });
    }

    let first = cpf_digit(base, 10);
    let mut extended = String::with_capacity(CPF_LEN - 1);
    extended.push_str(base);
    extended.push(first);
    let second = cpf_digit(&extended, 11);

    Ok([first, second].iter().collect())
}

/// Validate a digits-only CPF. Sequences of one repeated digit are refused even when their
/// check digits happen to match.
pub fn validate_individual_id(digits: &str) -> Result<(), IdentifierError> {
    if !is_digits(digits, CPF_LEN) {
        return Err(IdentifierError::InvalidFormat {
            kind: IdentifierKind::Cpf,
            expected: CPF_LEN,
        });
    }

    let first = digits.as_bytes()[0];
    if digits.bytes().all(|b| b == first) {
        return Err(IdentifierError::RepeatedSequence(IdentifierKind::Cpf));
    }

    let (base, received) = digits.split_at(CPF_LEN - 2);
    let expected = individual_id_check_digits(base)?;
    if expected != received {
        return Err(IdentifierError::InvalidChecksum {
            kind: IdentifierKind::Cpf,
            expected,
            received: received.to_owned(),
        });
    }

    Ok(())
}

/// Validate a digits-only CNO. Only the length is checked, CNO has no check digits here.
pub fn validate_site_id(digits: &str) -> Result<(), IdentifierError> {
    if !is_digits(digits, CNO_LEN) {
        return Err(IdentifierError::InvalidFormat {
            kind: IdentifierKind::Cno,
            expected: CNO_LEN,
        });
    }
    Ok(())
}

/// The 8-digit root of a CNPJ, or `None` when the input is shorter than that.
pub fn org_id_root(digits: &str) -> Option<&str> {
    digits.get(..CNPJ_ROOT_LEN)
}
