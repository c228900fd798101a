// src/matching/mod.rs
// Pipeline driver: normalize both sets, build the block index, then fan
// resolution out across workers. Output order and winner selection are
// identical regardless of thread count.

pub mod blocking;
pub mod dates;
pub mod resolver;
pub mod scoring;

use anyhow::{Context, Result};
use futures::future::join_all;
use log::info;
use serde::Serialize;
use std::sync::Arc;

use crate::models::{BlockKey, ConfidenceBucket, LedgerRecord, MailRecord, MatchRecord};
use crate::utils::progress::ProgressConfig;
use blocking::{build_blocks, prepare_mail};
use resolver::{prepare_ledger, resolve_one};

/// Per-run counters, logged (and JSON-serializable) at completion.
#[derive(Debug, Clone, Serialize)]
pub struct MatchingStats {
    pub mail_records: usize,
    pub ledger_records: usize,
    pub blocks: usize,
    pub matched: usize,
    pub dropped: usize,
    pub bucket_high: usize,
    pub bucket_mid: usize,
    pub bucket_low: usize,
}

impl MatchingStats {
    fn from_results(
        mail_records: usize,
        ledger_records: usize,
        blocks: usize,
        results: &[MatchRecord],
    ) -> Self {
        let mut bucket_high = 0;
        let mut bucket_mid = 0;
        let mut bucket_low = 0;
        for r in results {
            match ConfidenceBucket::from_score(r.confidence) {
                ConfidenceBucket::High => bucket_high += 1,
                ConfidenceBucket::Mid => bucket_mid += 1,
                ConfidenceBucket::Low => bucket_low += 1,
            }
        }
        Self {
            mail_records,
            ledger_records,
            blocks,
            matched: results.len(),
            dropped: ledger_records - results.len(),
            bucket_high,
            bucket_mid,
            bucket_low,
        }
    }
}

/// Run the full matching pipeline over two in-memory record sets.
///
/// Resolution is embarrassingly parallel across ledger records: the block
/// index is built once, shared read-only, and each worker resolves a
/// contiguous slice of ledger indexes. Results are re-ordered by ledger
/// input index afterwards so the output is scheduling-invariant.
pub async fn run_matching(
    mail: Vec<MailRecord>,
    ledger: Vec<LedgerRecord>,
    progress: &ProgressConfig,
) -> Result<(Vec<MatchRecord>, MatchingStats)> {
    info!(
        "Matching {} mail records against {} ledger records",
        mail.len(),
        ledger.len()
    );

    let mail_total = mail.len();
    let ledger_total = ledger.len();

    let index_pb = progress.bar(
        mail_total as u64,
        "  📬 [{elapsed_precise}] {bar:30.yellow/red} {pos}/{len} Indexing mail...",
    );
    let prepared_mail = prepare_mail(mail);
    index_pb.inc(mail_total as u64);
    let blocks = build_blocks(&prepared_mail);
    index_pb.finish_with_message(format!("Indexed mail into {} blocks", blocks.len()));
    info!(
        "Built block index: {} blocks over {} mail records",
        blocks.len(),
        mail_total
    );

    let prepared_mail = Arc::new(prepared_mail);
    let blocks = Arc::new(blocks);
    let prepared_ledger = Arc::new(prepare_ledger(ledger));

    let resolve_pb = progress.bar(
        ledger_total as u64,
        "  📬 [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} Resolving ledger records...",
    );

    let workers = num_cpus::get().max(1);
    let chunk_size = ledger_total.div_ceil(workers).max(1);

    let mut handles = Vec::with_capacity(workers);
    for start in (0..ledger_total).step_by(chunk_size) {
        let end = (start + chunk_size).min(ledger_total);
        let mail_ref = Arc::clone(&prepared_mail);
        let blocks_ref = Arc::clone(&blocks);
        let ledger_ref = Arc::clone(&prepared_ledger);
        let pb = resolve_pb.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut out: Vec<(usize, MatchRecord)> = Vec::new();
            for idx in start..end {
                let record = &ledger_ref[idx];
                let key = BlockKey::of(&record.norm);
                if key.is_usable() {
                    if let Some(block) = blocks_ref.get(&key) {
                        if let Some(matched) = resolve_one(record, block, &mail_ref) {
                            out.push((idx, matched));
                        }
                    }
                }
                pb.inc(1);
            }
            out
        }));
    }

    let mut indexed: Vec<(usize, MatchRecord)> = Vec::new();
    for worker_result in join_all(handles).await {
        indexed.extend(worker_result.context("resolution worker panicked")?);
    }
    indexed.sort_by_key(|(idx, _)| *idx);
    let results: Vec<MatchRecord> = indexed.into_iter().map(|(_, r)| r).collect();

    resolve_pb.finish_with_message(format!(
        "Resolved {} of {} ledger records",
        results.len(),
        ledger_total
    ));

    let stats = MatchingStats::from_results(mail_total, ledger_total, blocks.len(), &results);
    info!(
        "Matching complete: {} matched, {} dropped (high={}, mid={}, low={})",
        stats.matched, stats.dropped, stats.bucket_high, stats.bucket_mid, stats.bucket_low
    );

    Ok((results, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(address1: &str, zip: &str, date: &str) -> MailRecord {
        MailRecord {
            address1: address1.to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: zip.to_string(),
            mail_date: date.to_string(),
            ..MailRecord::default()
        }
    }

    fn ledger(id: &str, address1: &str, zip: &str, date: &str) -> LedgerRecord {
        LedgerRecord {
            id: id.to_string(),
            address1: address1.to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: zip.to_string(),
            job_date: date.to_string(),
            ..LedgerRecord::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_emission_and_stats() {
        let mail = vec![
            mail("123 Main St", "62704", "2024-01-10"),
            mail("123 Main Street", "62704", "2024-02-15"),
            mail("999 Elm Ave", "62704", "2024-01-01"),
        ];
        let ledger = vec![
            ledger("L1", "123 Main St", "62704", "2024-03-01"),
            ledger("L2", "777 Unseen Rd", "62704", "2024-03-01"),
        ];
        let progress = ProgressConfig {
            enabled: false,
            ..ProgressConfig::default()
        };
        let (results, stats) = run_matching(mail, ledger, &progress).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ledger_id, "L1");
        assert_eq!(results[0].mail_count, 2);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.bucket_high, 1);
    }

    #[tokio::test]
    async fn test_output_is_ordered_by_ledger_input() {
        let mail = vec![mail("5 Oak St", "11111", "2024-01-01")];
        let ledger_records: Vec<LedgerRecord> = (0..64)
            .map(|i| ledger(&format!("L{i}"), "5 Oak St", "11111", "2024-02-01"))
            .collect();
        let progress = ProgressConfig {
            enabled: false,
            ..ProgressConfig::default()
        };
        let (results, _) = run_matching(mail, ledger_records, &progress).await.unwrap();
        let ids: Vec<String> = results.iter().map(|r| r.ledger_id.clone()).collect();
        let expected: Vec<String> = (0..64).map(|i| format!("L{i}")).collect();
        assert_eq!(ids, expected);
    }
}
