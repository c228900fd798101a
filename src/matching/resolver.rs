// src/matching/resolver.rs
// Best-candidate selection and mail-date aggregation for one ledger record.

use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::matching::blocking::PreparedMail;
use crate::matching::dates::{filter_candidates, fmt_dd_mm_yy, parse_date_any};
use crate::matching::scoring::score_pair;
use crate::models::{LedgerRecord, MatchRecord, MatchScore, NormalizedAddress};
use crate::normalize::normalize_record;

/// A ledger record with its cached normalization and parsed date.
#[derive(Debug, Clone)]
pub struct PreparedLedger {
    pub record: LedgerRecord,
    pub norm: NormalizedAddress,
    pub date: Option<NaiveDate>,
}

pub fn prepare_ledger(records: Vec<LedgerRecord>) -> Vec<PreparedLedger> {
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
            let date = parse_date_any(&record.job_date);
            PreparedLedger { record, norm, date }
        })
        .collect()
}

/// Total-order rank for the top-1 selection: score descending, mail date
/// ascending (unknown sorts latest, so a dated candidate beats an undated
/// one), then stable input order. Smaller rank wins.
fn candidate_rank(
    score: &MatchScore,
    date: Option<NaiveDate>,
    idx: usize,
) -> (Reverse<i32>, NaiveDate, usize) {
    (Reverse(score.value), date.unwrap_or(NaiveDate::MAX), idx)
}

/// The winner's raw address fields joined into one display string.
fn full_mail_address(mail: &PreparedMail) -> String {
    [
        mail.record.address1.as_str(),
        mail.record.address2.as_str(),
        mail.record.city.as_str(),
        mail.record.state.as_str(),
        mail.record.zip.as_str(),
    ]
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Resolve one ledger record against its block: date-filter, score every
/// survivor, pick the winner, and aggregate all qualifying mail dates.
/// Returns `None` when no candidate survives; the ledger record is then
/// dropped from output entirely.
pub fn resolve_one(
    ledger: &PreparedLedger,
    block: &[usize],
    mail: &[PreparedMail],
) -> Option<MatchRecord> {
    let candidates = filter_candidates(ledger.date, block, mail);
    if candidates.is_empty() {
        return None;
    }

    let mut best: Option<(usize, MatchScore)> = None;
    for &idx in &candidates {
        let score = score_pair(&mail[idx].norm, &ledger.norm);
        let better = match &best {
            None => true,
            Some((best_idx, best_score)) => {
                candidate_rank(&score, mail[idx].date, idx)
                    < candidate_rank(best_score, mail[*best_idx].date, *best_idx)
            }
        };
        if better {
            best = Some((idx, score));
        }
    }
    let (winner_idx, score) = best?;
    let winner = &mail[winner_idx];

    // The aggregate is over every qualifying candidate, not just the winner,
    // deduplicated and ascending. Undated candidates still count.
    let dates: BTreeSet<NaiveDate> = candidates.iter().filter_map(|&i| mail[i].date).collect();
    let mail_dates = if dates.is_empty() {
        "None provided".to_string()
    } else {
        dates
            .iter()
            .map(|d| fmt_dd_mm_yy(Some(*d)))
            .collect::<Vec<_>>()
            .join(", ")
    };

    Some(MatchRecord {
        ledger_id: ledger.record.id.clone(),
        ledger_address1: ledger.record.address1.clone(),
        ledger_address2: ledger.record.address2.clone(),
        ledger_city: ledger.record.city.clone(),
        ledger_state: ledger.record.state.clone(),
        ledger_zip: ledger.record.zip.clone(),
        ledger_job_date: fmt_dd_mm_yy(ledger.date),
        ledger_amount: ledger.record.amount.clone(),
        matched_mail_id: winner.record.id.clone(),
        matched_mail_address: full_mail_address(winner),
        mail_dates,
        mail_count: candidates.len(),
        confidence: score.value,
        bucket: score.bucket.as_str(),
        notes: score.rendered_notes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::blocking::{build_blocks, prepare_mail};
    use crate::models::{BlockKey, MailRecord};

    fn mail(id: &str, address1: &str, address2: &str, date: &str) -> MailRecord {
        MailRecord {
            id: id.to_string(),
            address1: address1.to_string(),
            address2: address2.to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62704".to_string(),
            mail_date: date.to_string(),
        }
    }

    fn ledger(address1: &str, address2: &str, date: &str) -> PreparedLedger {
        let records = prepare_ledger(vec![LedgerRecord {
            id: "L1".to_string(),
            address1: address1.to_string(),
            address2: address2.to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62704".to_string(),
            job_date: date.to_string(),
            amount: "1500".to_string(),
        }]);
        records.into_iter().next().unwrap()
    }

    fn resolve(
        mail_records: Vec<MailRecord>,
        ledger: &PreparedLedger,
    ) -> Option<MatchRecord> {
        let prepared = prepare_mail(mail_records);
        let blocks = build_blocks(&prepared);
        let block = blocks.get(&BlockKey::of(&ledger.norm))?;
        resolve_one(ledger, block, &prepared)
    }

    #[test]
    fn test_scenario_a_perfect_match() {
        let l = ledger("123 Main Street", "", "2024-06-01");
        let rec = resolve(vec![mail("M1", "123 Main St", "", "2024-05-01")], &l).unwrap();
        assert_eq!(rec.confidence, 100);
        assert_eq!(rec.notes, "perfect match");
        assert_eq!(rec.bucket, "high");
        assert_eq!(rec.matched_mail_id, "M1");
        assert_eq!(rec.ledger_job_date, "01-06-24");
    }

    #[test]
    fn test_scenario_b_unit_absence_noted() {
        let l = ledger("123 Main St", "", "2024-06-01");
        let rec = resolve(vec![mail("M1", "123 Main St Apt 2", "", "2024-05-01")], &l).unwrap();
        assert!(rec.confidence < 100);
        assert!(rec.notes.contains("(unit)"));
    }

    #[test]
    fn test_scenario_c_postdated_mail_drops_record() {
        let l = ledger("123 Main St", "", "2024-05-01");
        let rec = resolve(vec![mail("M1", "123 Main St", "", "2024-06-01")], &l);
        assert!(rec.is_none());
    }

    #[test]
    fn test_scenario_d_aggregates_all_qualifying_dates() {
        let l = ledger("123 Main St", "", "2024-03-01");
        let rec = resolve(
            vec![
                mail("M2", "123 Main St", "", "2024-02-15"),
                mail("M1", "123 Main St", "", "2024-01-10"),
            ],
            &l,
        )
        .unwrap();
        assert_eq!(rec.mail_count, 2);
        assert_eq!(rec.mail_dates, "10-01-24, 15-02-24");
        // tie on score breaks to the earliest mail date
        assert_eq!(rec.matched_mail_id, "M1");
    }

    #[test]
    fn test_postdated_mail_never_beats_qualifying_mail() {
        let l = ledger("123 Main St", "", "2024-03-01");
        let rec = resolve(
            vec![
                mail("LATE", "123 Main St", "", "2024-04-01"),
                mail("OK", "123 Main St", "", "2024-02-01"),
            ],
            &l,
        )
        .unwrap();
        assert_eq!(rec.matched_mail_id, "OK");
        assert_eq!(rec.mail_count, 1);
    }

    #[test]
    fn test_dated_candidate_wins_tie_over_undated() {
        let l = ledger("123 Main St", "", "2024-03-01");
        let rec = resolve(
            vec![
                mail("NODATE", "123 Main St", "", ""),
                mail("DATED", "123 Main St", "", "2024-01-01"),
            ],
            &l,
        )
        .unwrap();
        assert_eq!(rec.matched_mail_id, "DATED");
        // undated candidate still counts toward the aggregate
        assert_eq!(rec.mail_count, 2);
        assert_eq!(rec.mail_dates, "01-01-24");
    }

    #[test]
    fn test_unknown_ledger_date_keeps_full_block() {
        let l = ledger("123 Main St", "", "");
        let rec = resolve(
            vec![
                mail("M1", "123 Main St", "", "2024-01-01"),
                mail("M2", "123 Main St", "", "2024-06-01"),
            ],
            &l,
        )
        .unwrap();
        assert_eq!(rec.mail_count, 2);
        assert_eq!(rec.ledger_job_date, "None provided");
    }

    #[test]
    fn test_all_undated_candidates_report_none_provided() {
        let l = ledger("123 Main St", "", "2024-03-01");
        let rec = resolve(vec![mail("M1", "123 Main St", "", "")], &l).unwrap();
        assert_eq!(rec.mail_dates, "None provided");
        assert_eq!(rec.mail_count, 1);
    }

    #[test]
    fn test_higher_score_beats_earlier_date() {
        let l = ledger("123 Main St", "Apt 2", "2024-06-01");
        let rec = resolve(
            vec![
                mail("EARLY_WRONG_UNIT", "123 Main St", "Apt 9", "2024-01-01"),
                mail("LATER_RIGHT_UNIT", "123 Main St", "Apt 2", "2024-05-01"),
            ],
            &l,
        )
        .unwrap();
        assert_eq!(rec.matched_mail_id, "LATER_RIGHT_UNIT");
        assert_eq!(rec.confidence, 100);
    }

    #[test]
    fn test_duplicate_dates_deduplicated() {
        let l = ledger("123 Main St", "", "2024-06-01");
        let rec = resolve(
            vec![
                mail("M1", "123 Main St", "", "2024-01-10"),
                mail("M2", "123 Main St", "", "2024-01-10"),
            ],
            &l,
        )
        .unwrap();
        assert_eq!(rec.mail_dates, "10-01-24");
        assert_eq!(rec.mail_count, 2);
    }
}
