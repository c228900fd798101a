use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use mailtrace_lib::export::write_summary_csv;
use mailtrace_lib::ingest::{read_table, sample_rows, to_ledger_records, to_mail_records};
use mailtrace_lib::matching::run_matching;
use mailtrace_lib::schema::{resolve_columns, TableKind};
use mailtrace_lib::utils::load_env;
use mailtrace_lib::utils::progress::ProgressConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// Match mailing-list records against a customer/job ledger and write a
/// confidence-scored summary CSV.
#[derive(Parser, Debug)]
#[command(name = "mailtrace", version, about)]
struct Cli {
    /// Path to the mail CSV
    #[arg(long)]
    mail: PathBuf,

    /// Path to the ledger/CRM CSV
    #[arg(long)]
    crm: PathBuf,

    /// Output path for the match summary CSV
    #[arg(long)]
    out: PathBuf,

    /// Explicit mail column mapping, e.g. --mail-col mail_date=Sent (repeatable)
    #[arg(long = "mail-col", value_name = "CANONICAL=HEADER")]
    mail_cols: Vec<String>,

    /// Explicit ledger column mapping, e.g. --ledger-col amount=JobValue (repeatable)
    #[arg(long = "ledger-col", value_name = "CANONICAL=HEADER")]
    ledger_cols: Vec<String>,
}

fn parse_overrides(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((canonical, header)) if !canonical.is_empty() && !header.is_empty() => {
                out.insert(canonical.trim().to_lowercase(), header.trim().to_string());
            }
            _ => bail!("Invalid column override '{}', expected CANONICAL=HEADER", pair),
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();

    let cli = Cli::parse();
    let run_id = Uuid::new_v4();
    let started = Instant::now();
    info!("Starting mail-to-ledger matching run {}", run_id);

    let mail_overrides = parse_overrides(&cli.mail_cols)?;
    let ledger_overrides = parse_overrides(&cli.ledger_cols)?;

    let (mail_headers, mail_rows) =
        read_table(&cli.mail).context("Failed to read mail table")?;
    let (ledger_headers, ledger_rows) =
        read_table(&cli.crm).context("Failed to read ledger table")?;
    info!(
        "Read {} mail rows and {} ledger rows",
        mail_rows.len(),
        ledger_rows.len()
    );

    // Schema resolution is the one place a run is allowed to die: a total
    // schema mismatch must surface here, never mid-run.
    let mail_map = resolve_columns(
        &mail_headers,
        &sample_rows(&mail_rows),
        TableKind::Mail,
        &mail_overrides,
    )?;
    let ledger_map = resolve_columns(
        &ledger_headers,
        &sample_rows(&ledger_rows),
        TableKind::Ledger,
        &ledger_overrides,
    )?;

    let mail_records = to_mail_records(&mail_headers, &mail_rows, &mail_map);
    let ledger_records = to_ledger_records(&ledger_headers, &ledger_rows, &ledger_map);

    let progress = ProgressConfig::from_env();
    let (matches, stats) = run_matching(mail_records, ledger_records, &progress).await?;

    write_summary_csv(&cli.out, &matches)?;

    info!(
        "Run {} stats: {}",
        run_id,
        serde_json::to_string(&stats).unwrap_or_default()
    );
    info!(
        "Run {} finished in {:.2}s: {} of {} ledger records matched",
        run_id,
        started.elapsed().as_secs_f64(),
        stats.matched,
        stats.ledger_records
    );

    println!(
        "[ok] wrote {} ({} matches: {} high / {} mid / {} low)",
        cli.out.display(),
        stats.matched,
        stats.bucket_high,
        stats.bucket_mid,
        stats.bucket_low
    );

    Ok(())
}
