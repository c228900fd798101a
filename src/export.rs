// src/export.rs
// Thin presentation boundary: serialize the resolved matches to a summary
// CSV. The engine's MatchRecord collection is the only contract here.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::models::MatchRecord;

pub fn write_summary_csv(path: &Path, records: &[MatchRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .context("Failed to serialize match record")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    info!("Wrote {} match records to {}", records.len(), path.display());
    Ok(())
}
