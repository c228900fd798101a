// src/schema.rs
// Schema guard: resolves canonical fields against whatever headers a source
// table arrived with, before matching begins. Header-name hints are tried
// first, then content probes over a sample of cell values. A required field
// that cannot be resolved unambiguously is a fatal pre-run error; it must
// never surface mid-run as a matching failure.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::matching::dates::parse_date_any;

/// How many leading rows feed the content probes.
pub const SAMPLE_ROWS: usize = 50;

const PROBE_THRESHOLD: f64 = 0.7;
const ADDRESS_PROBE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Mail,
    Ledger,
}

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Mail => "mail",
            TableKind::Ledger => "ledger",
        }
    }

    pub fn required(&self) -> &'static [&'static str] {
        match self {
            TableKind::Mail => &["address1", "city", "state", "zip", "mail_date"],
            TableKind::Ledger => &["address1", "city", "state", "zip", "job_date", "amount"],
        }
    }

    pub fn optional(&self) -> &'static [&'static str] {
        &["address2", "id"]
    }
}

/// Ranked header-name hints per canonical field; earlier hints score higher.
fn hints(canonical: &str) -> &'static [&'static str] {
    match canonical {
        "address1" => &["address1", "addr1", "address", "street", "line1"],
        "address2" => &[
            "address2", "addr2", "unit", "apt", "suite", "line2", "bldg", "building",
        ],
        "city" => &["city", "town"],
        "state" => &["state", "st"],
        "zip" => &["zip", "zipcode", "zip_code", "postal_code", "postal", "postalcode", "zip5"],
        "mail_date" => &[
            "mail_date", "maildate", "mailed", "sent_date", "date_mailed", "mailing_date", "date",
        ],
        "job_date" => &[
            "job_date", "jobdate", "date_entered", "dateentered", "created_at", "createddate",
            "install_date", "date",
        ],
        "amount" => &[
            "amount", "value", "job_value", "revenue", "invoice", "contract", "total", "$",
        ],
        "id" => &["mail_id", "crm_id", "lead_id", "job_id", "customer_id", "id"],
        _ => &[],
    }
}

fn score_header(canonical: &str, header: &str) -> i32 {
    let h = header.trim().to_lowercase();
    let mut score = 0;
    for (i, hint) in hints(canonical).iter().enumerate() {
        if h.contains(hint) {
            score += (10 - i as i32).max(1);
        }
    }
    if canonical == "amount" && h.contains('$') {
        score += 2;
    }
    score
}

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}[-/]\d{1,2}[-/]\d{2,4})$").expect("date regex")
});
static MONEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?$").expect("money regex"));
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").expect("zip regex"));
static ADDRESS1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,6}\s+\S+").expect("addr regex"));

static US_STATES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "IA", "ID", "IL",
        "IN", "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE",
        "NH", "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
        "VA", "VT", "WA", "WI", "WV", "WY",
    ])
});

fn probe_fraction<F: Fn(&str) -> bool>(values: &[String], pred: F) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|v| pred(v)).count();
    hits as f64 / values.len() as f64
}

/// Content probe for a canonical field, or `None` when the field has no
/// recognizable cell shape.
fn content_probe(canonical: &str, values: &[String]) -> Option<bool> {
    match canonical {
        "mail_date" | "job_date" => Some(
            probe_fraction(values, |v| {
                DATE_RE.is_match(v) || parse_date_any(v).is_some()
            }) >= PROBE_THRESHOLD,
        ),
        "amount" => Some(
            probe_fraction(values, |v| MONEY_RE.is_match(v.replace("USD", "").trim()))
                >= PROBE_THRESHOLD,
        ),
        "zip" => Some(probe_fraction(values, |v| ZIP_RE.is_match(v)) >= PROBE_THRESHOLD),
        "state" => Some(
            probe_fraction(values, |v| US_STATES.contains(v.to_uppercase().as_str()))
                >= PROBE_THRESHOLD,
        ),
        "address1" => {
            Some(probe_fraction(values, |v| ADDRESS1_RE.is_match(v)) >= ADDRESS_PROBE_THRESHOLD)
        }
        _ => None,
    }
}

/// Resolved canonical-field -> source-header mapping for one table.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    map: HashMap<String, String>,
}

impl ColumnMap {
    pub fn header_for(&self, canonical: &str) -> Option<&str> {
        self.map.get(canonical).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Resolve every canonical field the table kind needs against the actual
/// headers. `sample_rows` is row-major sample data aligned with `headers`;
/// `overrides` are explicit canonical -> header picks that always win.
pub fn resolve_columns(
    headers: &[String],
    sample_rows: &[Vec<String>],
    kind: TableKind,
    overrides: &HashMap<String, String>,
) -> Result<ColumnMap> {
    if headers.is_empty() {
        bail!("{} file has no header row", kind.label());
    }

    let needed: Vec<&str> = kind
        .required()
        .iter()
        .chain(kind.optional().iter())
        .copied()
        .collect();

    let mut map = ColumnMap::default();

    for (canonical, header) in overrides {
        if !needed.contains(&canonical.as_str()) {
            bail!(
                "{} file: unknown canonical field '{}' in column override",
                kind.label(),
                canonical
            );
        }
        let matched = headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(header))
            .cloned();
        match matched {
            Some(h) => {
                map.map.insert(canonical.clone(), h);
            }
            None => bail!(
                "{} file: column override '{}={}' names a header that does not exist",
                kind.label(),
                canonical,
                header
            ),
        }
    }

    // Non-empty sampled values per column, for the content probes.
    let column_values: Vec<Vec<String>> = (0..headers.len())
        .map(|col| {
            sample_rows
                .iter()
                .take(SAMPLE_ROWS)
                .filter_map(|row| row.get(col))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        })
        .collect();

    let mut ambiguous: HashMap<&str, Vec<String>> = HashMap::new();

    // Pass 1: ranked header-name hints.
    for canonical in &needed {
        if map.map.contains_key(*canonical) {
            continue;
        }
        let mut scored: Vec<(i32, &String)> = headers
            .iter()
            .map(|h| (score_header(canonical, h), h))
            .filter(|(s, _)| *s > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        if let Some(&(top, _)) = scored.first() {
            let candidates: Vec<String> = scored
                .iter()
                .filter(|(s, _)| *s == top)
                .map(|(_, h)| (*h).clone())
                .collect();
            if candidates.len() == 1 {
                map.map.insert((*canonical).to_string(), candidates[0].clone());
            } else {
                ambiguous.insert(*canonical, candidates.into_iter().take(5).collect());
            }
        }
    }

    // Pass 2: content inference for required fields the hints missed.
    for canonical in kind.required() {
        if map.map.contains_key(*canonical) || ambiguous.contains_key(canonical) {
            continue;
        }
        let candidates: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(col, _)| content_probe(canonical, &column_values[*col]).unwrap_or(false))
            .map(|(_, h)| h.clone())
            .collect();
        match candidates.len() {
            0 => {}
            1 => {
                map.map.insert((*canonical).to_string(), candidates[0].clone());
            }
            _ => {
                ambiguous.insert(*canonical, candidates.into_iter().take(5).collect());
            }
        }
    }

    // Required fields must all be resolved before matching starts.
    let mut problems: Vec<String> = Vec::new();
    for canonical in kind.required() {
        if map.map.contains_key(*canonical) {
            continue;
        }
        match ambiguous.get(canonical) {
            Some(candidates) => problems.push(format!(
                "{} (ambiguous between: {})",
                canonical,
                candidates.join(", ")
            )),
            None => problems.push(format!("{} (no matching column)", canonical)),
        }
    }
    if !problems.is_empty() {
        bail!(
            "{} file: could not resolve required column(s): {}. \
             Use --{}-col CANONICAL=HEADER to map them explicitly.",
            kind.label(),
            problems.join("; "),
            kind.label()
        );
    }

    Ok(map)
}
