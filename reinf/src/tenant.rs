use std::error::Error;
use std::fmt::Display;

/// Header carrying the caller's organization, resolved from its credential upstream.
pub const TENANT_HEADER: &str = "x-reinf-tenant";

const MAX_TENANT_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidTenantReason {
    Empty,
    TooLong,
    NotAscii,
    InvalidCharacter,
}

impl InvalidTenantReason {
    pub fn reason(&self) -> &str {
        match *self {
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::NotAscii => "not_ascii",
            Self::InvalidCharacter => "invalid_character",
        }
    }
}

impl Display for InvalidTenantReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

impl Error for InvalidTenantReason {}

/// The organization submitting events. Every record key is scoped by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tenant(String);

impl Tenant {
    /// Check the tenant is the right shape. Surrounding whitespace is trimmed first.
    pub fn parse(raw: &str) -> Result<Tenant, InvalidTenantReason> {
        let tenant = raw.trim();

        if tenant.is_empty() {
            return Err(InvalidTenantReason::Empty);
        }

        if tenant.len() > MAX_TENANT_LEN {
            return Err(InvalidTenantReason::TooLong);
        }

        if !tenant.is_ascii() {
            return Err(InvalidTenantReason::NotAscii);
        }

        if tenant.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
            return Err(InvalidTenantReason::InvalidCharacter);
        }

        Ok(Tenant(tenant.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
