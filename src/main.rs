use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use cross_check::{
    candidate_keys, ingest_path, serialize_result, ReconciliationEngine, ReconciliationStatus,
    Record,
};

#[derive(Parser)]
#[command(name = "cross-check", version, about = "Find which records of File A exist in File B")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the comparison keys available for two files
    Headers { file_a: PathBuf, file_b: PathBuf },

    /// Cross-check File A against File B and write matched.csv / missing.csv
    Check {
        file_a: PathBuf,
        file_b: PathBuf,

        /// Column to compare on (defaults to File A's first column)
        #[arg(short, long)]
        key: Option<String>,

        /// Where matched.csv and missing.csv are written
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// How many missing records to print
        #[arg(short, long, default_value_t = 10)]
        preview: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Headers { file_a, file_b } => run_headers(&file_a, &file_b),
        Command::Check {
            file_a,
            file_b,
            key,
            out_dir,
            preview,
        } => run_check(&file_a, &file_b, key.as_deref(), &out_dir, preview),
    }
}

fn run_headers(file_a: &Path, file_b: &Path) -> Result<()> {
    let table_a = ingest_path(file_a)?;
    let table_b = ingest_path(file_b)?;

    let candidates = candidate_keys(&table_a, &table_b);
    if !candidates.is_selectable() {
        println!("(fixed key, no choice offered)");
    }
    for label in candidates.labels() {
        println!("{}", label);
    }

    Ok(())
}

fn run_check(
    file_a: &Path,
    file_b: &Path,
    key: Option<&str>,
    out_dir: &Path,
    preview: usize,
) -> Result<()> {
    println!("🔎 Cross-Check");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let table_a = ingest_path(file_a)?;
    let table_b = ingest_path(file_b)?;
    println!("✓ File A: {} records ({})", table_a.len(), file_a.display());
    println!("✓ File B: {} records ({})", table_b.len(), file_b.display());

    let engine = ReconciliationEngine::with_preview_limit(preview);
    let result = engine.reconcile(&table_a, &table_b, key)?;

    println!("\n{}", result.summary());

    if result.status != ReconciliationStatus::Completed {
        return Ok(());
    }

    let shown = engine.preview(&result);
    if !shown.is_empty() {
        println!("\nMissing from File B (first {}):", shown.len());
        for record in shown {
            println!("  {}", describe(record));
        }
    }

    let (matched, missing) = serialize_result(&result)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let matched_path = out_dir.join("matched.csv");
    let missing_path = out_dir.join("missing.csv");
    std::fs::write(&matched_path, matched)
        .with_context(|| format!("Failed to write {}", matched_path.display()))?;
    std::fs::write(&missing_path, missing)
        .with_context(|| format!("Failed to write {}", missing_path.display()))?;

    println!("\n💾 {}", matched_path.display());
    println!("💾 {}", missing_path.display());

    Ok(())
}

fn describe(record: &Record) -> String {
    match record {
        Record::Line(line) => line.clone(),
        Record::Structured(_) => {
            serde_json::to_string(record).unwrap_or_else(|_| record.full_text())
        }
    }
}
