// src/models/mod.rs
// Record types shared across the matching pipeline.

use serde::Serialize;

/// One row from the mailing list, already column-aliased into canonical
/// fields by the schema guard. Values are kept as the raw text that came
/// out of the source table.
#[derive(Debug, Clone, Default)]
pub struct MailRecord {
    pub id: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub mail_date: String,
}

/// One row from the customer/job ledger, column-aliased the same way.
#[derive(Debug, Clone, Default)]
pub struct LedgerRecord {
    pub id: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub job_date: String,
    pub amount: String,
}

/// Canonical decomposition of one postal address. Computed once per record
/// and pure in the inputs, so it is safe to cache alongside the raw record.
///
/// `stem` is the house number plus the street-name tokens joined with single
/// spaces; it is empty iff the input had no usable tokens. Street type,
/// directional, and unit live in their own fields and are excluded from the
/// stem so that stem-equal addresses can still be penalized on those facets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedAddress {
    pub house_number: String,
    pub name_tokens: Vec<String>,
    pub street_type: String,
    pub directional: String,
    pub unit_label: String,
    pub unit_number: String,
    pub city_norm: String,
    pub state_norm: String,
    pub zip5: String,
    pub stem: String,
}

impl NormalizedAddress {
    pub fn has_unit(&self) -> bool {
        !self.unit_number.is_empty()
    }
}

/// Coarse exact-equality admission key. Only mail records sharing a ledger
/// record's key are ever scored against it; this is a hard gate, not a
/// similarity hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub zip5: String,
    pub stem: String,
}

impl BlockKey {
    pub fn of(norm: &NormalizedAddress) -> Self {
        Self {
            zip5: norm.zip5.clone(),
            stem: norm.stem.clone(),
        }
    }

    /// A record missing its geo/stem fields never admits into a populated
    /// block, which downstream manifests as "no match" rather than an error.
    pub fn is_usable(&self) -> bool {
        !self.stem.is_empty()
    }
}

/// Ordered report bucket for a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBucket {
    Low,
    Mid,
    High,
}

impl ConfidenceBucket {
    /// Total over the whole score range.
    pub fn from_score(score: i32) -> Self {
        if score >= 94 {
            ConfidenceBucket::High
        } else if score >= 88 {
            ConfidenceBucket::Mid
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBucket::High => "high",
            ConfidenceBucket::Mid => "mid",
            ConfidenceBucket::Low => "low",
        }
    }
}

/// Confidence plus discrepancy notes for one scored (mail, ledger) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchScore {
    pub value: i32,
    pub notes: Vec<String>,
    pub bucket: ConfidenceBucket,
}

impl MatchScore {
    pub fn rendered_notes(&self) -> String {
        self.notes.join("; ")
    }
}

/// The sole output entity: one per ledger record with at least one
/// qualifying mail candidate. Consumed by presentation layers only.
///
/// Date fields are already rendered in the fixed dd-mm-yy text form, with
/// unknown dates as the literal "None provided".
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub ledger_id: String,
    pub ledger_address1: String,
    pub ledger_address2: String,
    pub ledger_city: String,
    pub ledger_state: String,
    pub ledger_zip: String,
    pub ledger_job_date: String,
    pub ledger_amount: String,
    pub matched_mail_id: String,
    pub matched_mail_address: String,
    pub mail_dates: String,
    pub mail_count: usize,
    pub confidence: i32,
    pub bucket: &'static str,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(ConfidenceBucket::from_score(100), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_score(94), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_score(93), ConfidenceBucket::Mid);
        assert_eq!(ConfidenceBucket::from_score(88), ConfidenceBucket::Mid);
        assert_eq!(ConfidenceBucket::from_score(87), ConfidenceBucket::Low);
        assert_eq!(ConfidenceBucket::from_score(0), ConfidenceBucket::Low);
    }

    #[test]
    fn test_block_key_usability() {
        let mut norm = NormalizedAddress::default();
        assert!(!BlockKey::of(&norm).is_usable());
        norm.stem = "123 main".to_string();
        assert!(BlockKey::of(&norm).is_usable());
    }
}
