// src/ingest.rs
// CSV boundary: raw tables in, canonical records out. The only fatal
// conditions here are a table that is not parseable CSV at all and a schema
// that the guard cannot resolve; both surface before matching begins.

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;

use crate::models::{LedgerRecord, MailRecord};
use crate::schema::{ColumnMap, SAMPLE_ROWS};

/// Read a whole CSV table: headers plus every data row.
pub fn read_table(path: &Path) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header row from {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("{} has no usable header row", path.display());
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record.with_context(|| format!("Malformed CSV row in {}", path.display()))?);
    }
    Ok((headers, rows))
}

/// Leading rows as plain strings, for the schema guard's content probes.
pub fn sample_rows(rows: &[StringRecord]) -> Vec<Vec<String>> {
    rows.iter()
        .take(SAMPLE_ROWS)
        .map(|r| r.iter().map(|v| v.to_string()).collect())
        .collect()
}

/// canonical field -> column index, for fast row extraction.
fn index_map(headers: &[String], map: &ColumnMap, canonicals: &[&str]) -> HashMap<String, usize> {
    let mut out = HashMap::new();
    for canonical in canonicals {
        if let Some(header) = map.header_for(canonical) {
            if let Some(idx) = headers.iter().position(|h| h == header) {
                out.insert((*canonical).to_string(), idx);
            }
        }
    }
    out
}

fn field(row: &StringRecord, indexes: &HashMap<String, usize>, canonical: &str) -> String {
    indexes
        .get(canonical)
        .and_then(|&idx| row.get(idx))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Materialize canonical mail records using a resolved column map.
pub fn to_mail_records(
    headers: &[String],
    rows: &[StringRecord],
    map: &ColumnMap,
) -> Vec<MailRecord> {
    let idx = index_map(
        headers,
        map,
        &["id", "address1", "address2", "city", "state", "zip", "mail_date"],
    );
    rows.iter()
        .map(|row| MailRecord {
            id: field(row, &idx, "id"),
            address1: field(row, &idx, "address1"),
            address2: field(row, &idx, "address2"),
            city: field(row, &idx, "city"),
            state: field(row, &idx, "state"),
            zip: field(row, &idx, "zip"),
            mail_date: field(row, &idx, "mail_date"),
        })
        .collect()
}

/// Materialize canonical ledger records using a resolved column map.
pub fn to_ledger_records(
    headers: &[String],
    rows: &[StringRecord],
    map: &ColumnMap,
) -> Vec<LedgerRecord> {
    let idx = index_map(
        headers,
        map,
        &[
            "id", "address1", "address2", "city", "state", "zip", "job_date", "amount",
        ],
    );
    rows.iter()
        .map(|row| LedgerRecord {
            id: field(row, &idx, "id"),
            address1: field(row, &idx, "address1"),
            address2: field(row, &idx, "address2"),
            city: field(row, &idx, "city"),
            state: field(row, &idx, "state"),
            zip: field(row, &idx, "zip"),
            job_date: field(row, &idx, "job_date"),
            amount: field(row, &idx, "amount"),
        })
        .collect()
}
