// src/matching/scoring.rs
// Per-pair confidence scoring. Defined only for pairs already admitted by a
// shared BlockKey, so block+stem equality establishes address identity and
// the score starts at the ceiling and takes penalties from there.

use crate::models::{ConfidenceBucket, MatchScore, NormalizedAddress};

/// Block admission already proves stem identity.
pub const BLOCK_BASE_SCORE: i32 = 100;

// Geo bonuses, meaningful mainly under looser blocking variants.
pub const ZIP_BONUS: i32 = 5;
pub const CITY_BONUS: i32 = 2;
pub const STATE_BONUS: i32 = 2;

pub const STREET_TYPE_PENALTY: i32 = 6;
pub const DIRECTIONAL_PENALTY: i32 = 6;
pub const UNIT_ONE_SIDED_PENALTY: i32 = 8;
pub const UNIT_NUMBER_PENALTY: i32 = 18;

fn or_none(s: &str) -> &str {
    if s.is_empty() {
        "none"
    } else {
        s
    }
}

/// Score one admitted (mail, ledger) pair: 0-100 confidence plus ordered
/// discrepancy notes. Pure and reproducible bit-for-bit.
pub fn score_pair(mail: &NormalizedAddress, ledger: &NormalizedAddress) -> MatchScore {
    let mut score = BLOCK_BASE_SCORE;
    let mut notes: Vec<String> = Vec::new();

    if !mail.zip5.is_empty() && mail.zip5 == ledger.zip5 {
        score = (score + ZIP_BONUS).min(100);
    }
    if mail.city_norm == ledger.city_norm {
        score = (score + CITY_BONUS).min(100);
    }
    if mail.state_norm == ledger.state_norm {
        score = (score + STATE_BONUS).min(100);
    }

    if mail.street_type != ledger.street_type {
        score -= STREET_TYPE_PENALTY;
        notes.push(format!(
            "{} vs {} (street type)",
            or_none(&ledger.street_type),
            or_none(&mail.street_type)
        ));
    }

    if mail.directional != ledger.directional {
        score -= DIRECTIONAL_PENALTY;
        notes.push(format!(
            "{} vs {} (direction)",
            or_none(&ledger.directional),
            or_none(&mail.directional)
        ));
    }

    match (ledger.has_unit(), mail.has_unit()) {
        (false, false) => {}
        (true, false) | (false, true) => {
            score -= UNIT_ONE_SIDED_PENALTY;
            notes.push(format!(
                "{} vs {} (unit)",
                or_none(&ledger.unit_number),
                or_none(&mail.unit_number)
            ));
        }
        (true, true) => {
            // Label text is irrelevant: "Apt 2" and "Unit 2" compare equal.
            if ledger.unit_number != mail.unit_number {
                score -= UNIT_NUMBER_PENALTY;
                notes.push(format!(
                    "{} vs {} (unit)",
                    ledger.unit_number, mail.unit_number
                ));
            }
        }
    }

    let value = score.clamp(0, 100);
    if value == 100 && notes.is_empty() {
        notes.push("perfect match".to_string());
    }

    MatchScore {
        value,
        notes,
        bucket: ConfidenceBucket::from_score(value),
    }
}
