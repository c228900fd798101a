// src/normalize.rs
// Address canonicalization: raw free text in, structured NormalizedAddress out.
// Pure and total; malformed input degrades to empty fields, never to an error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::NormalizedAddress;

/// Street-type abbreviation -> one fixed long form.
static STREET_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("street", "street"),
        ("st", "street"),
        ("road", "road"),
        ("rd", "road"),
        ("avenue", "avenue"),
        ("ave", "avenue"),
        ("av", "avenue"),
        ("boulevard", "boulevard"),
        ("blvd", "boulevard"),
        ("lane", "lane"),
        ("ln", "lane"),
        ("drive", "drive"),
        ("dr", "drive"),
        ("court", "court"),
        ("ct", "court"),
        ("circle", "circle"),
        ("cir", "circle"),
        ("parkway", "parkway"),
        ("pkwy", "parkway"),
        ("pkway", "parkway"),
        ("highway", "highway"),
        ("hwy", "highway"),
        ("terrace", "terrace"),
        ("ter", "terrace"),
        ("place", "place"),
        ("pl", "place"),
        ("way", "way"),
        ("wy", "way"),
        ("trail", "trail"),
        ("trl", "trail"),
        ("alley", "alley"),
        ("aly", "alley"),
        ("common", "common"),
        ("cmn", "common"),
        ("park", "park"),
    ])
});

/// Directional abbreviation -> spelled-out form.
static DIRECTIONALS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("n", "north"),
        ("north", "north"),
        ("s", "south"),
        ("south", "south"),
        ("e", "east"),
        ("east", "east"),
        ("w", "west"),
        ("west", "west"),
        ("ne", "northeast"),
        ("northeast", "northeast"),
        ("nw", "northwest"),
        ("northwest", "northwest"),
        ("se", "southeast"),
        ("southeast", "southeast"),
        ("sw", "southwest"),
        ("southwest", "southwest"),
    ])
});

static LONG_STREET_TYPES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STREET_TYPES.values().copied().collect());

static LONG_DIRECTIONALS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| DIRECTIONALS.values().copied().collect());

/// Trailing unit designator: a label word plus value ("Apt 2", "Ste B") or a
/// bare "#4". Anchored at end of line so street names are never swallowed.
static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s,.\-])(?:(apt|apartment|suite|ste|unit|bldg|fl|floor)\s*#?\s*([\w\-]+)|#\s*([\w\-]+))\s*$",
    )
    .expect("invalid unit regex")
});

/// Normalize a unit string to (label, number): "Apt 2" -> ("apt", "2"),
/// "#4" -> ("", "4"), "2B" -> ("", "2b"). Label text never participates in
/// unit equality; only the number does.
pub fn parse_unit(raw: &str) -> (String, String) {
    let s = raw.trim();
    if s.is_empty() {
        return (String::new(), String::new());
    }
    if let Some(caps) = UNIT_RE.captures(s) {
        let label = caps
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let number = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        if !number.is_empty() {
            return (label, number);
        }
    }
    // No label pattern; fall back to a bare value like "2B" or "B-2".
    let bare: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_lowercase();
    if bare.is_empty() {
        (String::new(), String::new())
    } else {
        (String::new(), bare)
    }
}

fn squash_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and strip punctuation, keeping '#' (unit marker) and whitespace.
/// Hyphens become spaces so "123-A Main" tokenizes cleanly.
fn clean_line(s: &str) -> String {
    s.replace('-', " ")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '#')
        .collect()
}

fn canonical_token(tok: &str) -> String {
    if let Some(long) = STREET_TYPES.get(tok) {
        (*long).to_string()
    } else if let Some(long) = DIRECTIONALS.get(tok) {
        (*long).to_string()
    } else {
        tok.to_string()
    }
}

/// Decompose a raw street address into its canonical parts.
///
/// `line2`, when present, is taken verbatim as the unit designator;
/// otherwise a trailing unit pattern is peeled off `line1` before
/// tokenization. Geo fields (`city_norm`, `state_norm`, `zip5`) are left
/// empty here; see [`normalize_record`].
pub fn normalize_address(line1: &str, line2: &str) -> NormalizedAddress {
    let mut norm = NormalizedAddress::default();

    // A trailing unit designator is peeled off line1 either way; line2,
    // when present, wins as the unit value.
    let mut street_part = line1.to_string();
    let mut peeled = (String::new(), String::new());
    if let Some(m) = UNIT_RE.find(line1) {
        let (label, number) = parse_unit(&line1[m.start()..]);
        if !number.is_empty() {
            peeled = (label, number);
            street_part = line1[..m.start()].to_string();
        }
    }
    let (label, number) = if line2.trim().is_empty() {
        peeled
    } else {
        parse_unit(line2)
    };
    norm.unit_label = label;
    norm.unit_number = number;

    let mut tokens: Vec<String> = clean_line(&street_part)
        .split_whitespace()
        .map(canonical_token)
        .collect();

    if tokens
        .first()
        .map_or(false, |t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
    {
        norm.house_number = tokens.remove(0);
    }

    if tokens
        .last()
        .map_or(false, |t| LONG_STREET_TYPES.contains(t.as_str()))
    {
        norm.street_type = tokens.pop().unwrap_or_default();
    }

    if let Some(pos) = tokens
        .iter()
        .position(|t| LONG_DIRECTIONALS.contains(t.as_str()))
    {
        norm.directional = tokens.remove(pos);
    }

    norm.name_tokens = tokens;

    let mut stem_parts: Vec<&str> = Vec::with_capacity(norm.name_tokens.len() + 1);
    if !norm.house_number.is_empty() {
        stem_parts.push(norm.house_number.as_str());
    }
    stem_parts.extend(norm.name_tokens.iter().map(|t| t.as_str()));
    norm.stem = squash_ws(&stem_parts.join(" "));

    norm
}

/// Case-fold and punctuation-strip a city or state value.
pub fn normalize_place(s: &str) -> String {
    squash_ws(
        &s.to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>(),
    )
}

/// Digits only, first five kept.
pub fn normalize_zip5(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).take(5).collect()
}

/// Full per-record normalization: address decomposition plus geo fields.
pub fn normalize_record(
    line1: &str,
    line2: &str,
    city: &str,
    state: &str,
    zip: &str,
) -> NormalizedAddress {
    let mut norm = normalize_address(line1, line2);
    norm.city_norm = normalize_place(city);
    norm.state_norm = normalize_place(state);
    norm.zip5 = normalize_zip5(zip);
    norm
}
