// src/matching/dates.rs
// Lenient date parsing plus the temporal-causality window: mail can only be
// credited toward a ledger event it preceded or coincided with.

use chrono::NaiveDate;

use crate::matching::blocking::PreparedMail;

/// Accepted input layouts, tried in order after '/' is unified to '-'.
/// Two-digit-year forms come before four-digit ones so "06-15-24" lands in
/// 2024 rather than year 24.
pub const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m-%d-%y", "%d-%m-%y", "%m-%d-%Y", "%d-%m-%Y"];

/// Parse a date in any accepted layout. Malformed or blank text degrades to
/// `None` ("unknown"), never to an error.
pub fn parse_date_any(s: &str) -> Option<NaiveDate> {
    let z = s.trim().replace('/', "-");
    if z.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&z, fmt).ok())
}

/// Fixed two-digit-year rendering used everywhere a date leaves the core.
pub fn fmt_dd_mm_yy(d: Option<NaiveDate>) -> String {
    match d {
        Some(d) => d.format("%d-%m-%y").to_string(),
        None => "None provided".to_string(),
    }
}

/// Whether a mail event may be credited toward a ledger event.
///
/// An unknown ledger date disables filtering entirely (absence of
/// information must never eliminate all candidates), and an unknown mail
/// date is always retained as an unprovable violation.
pub fn in_window(mail_date: Option<NaiveDate>, ledger_date: Option<NaiveDate>) -> bool {
    match (mail_date, ledger_date) {
        (_, None) => true,
        (None, Some(_)) => true,
        (Some(m), Some(l)) => m <= l,
    }
}

/// Apply the date window to one block of mail candidates.
pub fn filter_candidates(
    ledger_date: Option<NaiveDate>,
    block: &[usize],
    mail: &[PreparedMail],
) -> Vec<usize> {
    block
        .iter()
        .copied()
        .filter(|&idx| in_window(mail[idx].date, ledger_date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date_any("2024-06-01"), Some(d(2024, 6, 1)));
        assert_eq!(parse_date_any("06/01/2024"), Some(d(2024, 6, 1)));
        assert_eq!(parse_date_any("2024/06/01"), Some(d(2024, 6, 1)));
        assert_eq!(parse_date_any("06-15-24"), Some(d(2024, 6, 15)));
        assert_eq!(parse_date_any(" 2024-06-01 "), Some(d(2024, 6, 1)));
        assert_eq!(parse_date_any(""), None);
        assert_eq!(parse_date_any("not a date"), None);
        assert_eq!(parse_date_any("2024-13-45"), None);
    }

    #[test]
    fn test_fmt_dd_mm_yy() {
        assert_eq!(fmt_dd_mm_yy(Some(d(2024, 6, 1))), "01-06-24");
        assert_eq!(fmt_dd_mm_yy(None), "None provided");
    }

    #[test]
    fn test_window_rules() {
        let earlier = Some(d(2024, 1, 1));
        let later = Some(d(2024, 2, 1));
        assert!(in_window(earlier, later));
        assert!(in_window(later, later)); // same day coincides
        assert!(!in_window(later, earlier));
        // unknown ledger date keeps everything
        assert!(in_window(later, None));
        // unknown mail date is an unprovable violation, retained
        assert!(in_window(None, earlier));
    }
}
