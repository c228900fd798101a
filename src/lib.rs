// src/lib.rs

pub mod export;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod utils;

pub use matching::{run_matching, MatchingStats};
pub use models::{ConfidenceBucket, LedgerRecord, MailRecord, MatchRecord, MatchScore};
