use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::events::ValidRecord;
use crate::tenant::Tenant;

/// Identity of a stored record: `{document}-{establishment}-{counterparty}-{tenant}`, built
/// from normalized fields so formatting differences in the payload map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn build(record: &ValidRecord, tenant: &Tenant) -> RecordKey {
        RecordKey(format!(
            "{}-{}-{}-{}",
            record.document_number(),
            record.establishment_id(),
            record.counterparty_id(),
            tenant
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
