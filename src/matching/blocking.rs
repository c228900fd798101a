// src/matching/blocking.rs
// Exact-key blocking over the mail set, bounding comparison cost: only mail
// sharing a ledger record's BlockKey is ever scored against it. A true match
// whose normalization diverges (a genuine street-name typo, say) silently
// fails to admit; that imprecision is accepted, not compensated for.

use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;

use crate::matching::dates::parse_date_any;
use crate::models::{BlockKey, MailRecord, NormalizedAddress};
use crate::normalize::normalize_record;

/// A mail record with its cached normalization and parsed date.
#[derive(Debug, Clone)]
pub struct PreparedMail {
    pub record: MailRecord,
    pub norm: NormalizedAddress,
    pub date: Option<NaiveDate>,
}

/// Normalize and date-parse the mail set once, up front.
pub fn prepare_mail(records: Vec<MailRecord>) -> Vec<PreparedMail> {
    records
        .into_iter()
        .map(|record| {
            let norm = normalize_record(
                &record.address1,
                &record.address2,
                &record.city,
                &record.state,
                &record.zip,
            );
            let date = parse_date_any(&record.mail_date);
            PreparedMail { record, norm, date }
        })
        .collect()
}

/// BlockKey -> indexes into the prepared mail set, in input order.
pub type BlockIndex = HashMap<BlockKey, Vec<usize>>;

/// Group mail records by their exact BlockKey. Built once per run, then
/// shared read-only across resolution workers.
pub fn build_blocks(mail: &[PreparedMail]) -> BlockIndex {
    let mut blocks = BlockIndex::new();
    let mut unusable = 0usize;
    for (idx, m) in mail.iter().enumerate() {
        let key = BlockKey::of(&m.norm);
        if !key.is_usable() {
            unusable += 1;
            continue;
        }
        blocks.entry(key).or_default().push(idx);
    }
    if unusable > 0 {
        debug!(
            "{} mail records had no usable address stem and entered no block",
            unusable
        );
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(address1: &str, zip: &str, date: &str) -> MailRecord {
        MailRecord {
            address1: address1.to_string(),
            zip: zip.to_string(),
            mail_date: date.to_string(),
            ..MailRecord::default()
        }
    }

    #[test]
    fn test_stem_equal_addresses_share_a_block() {
        let prepared = prepare_mail(vec![
            mail("123 Main St", "62704", "2024-01-10"),
            mail("123 Main Street", "62704", "2024-02-15"),
            mail("999 Elm Ave", "62704", "2024-01-10"),
        ]);
        let blocks = build_blocks(&prepared);
        assert_eq!(blocks.len(), 2);
        let key = BlockKey::of(&prepared[0].norm);
        assert_eq!(blocks.get(&key), Some(&vec![0, 1]));
    }

    #[test]
    fn test_unusable_records_enter_no_block() {
        let prepared = prepare_mail(vec![mail("", "62704", ""), mail("...", "", "")]);
        let blocks = build_blocks(&prepared);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_zip_divergence_splits_blocks() {
        let prepared = prepare_mail(vec![
            mail("123 Main St", "62704", ""),
            mail("123 Main St", "62705", ""),
        ]);
        let blocks = build_blocks(&prepared);
        assert_eq!(blocks.len(), 2);
    }
}
