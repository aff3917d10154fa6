use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use outlier_quality::{
    dedupe_records, load_records, write_records_json, written_form, EngineConfig, Record,
    ValidationReport,
};

#[derive(Parser)]
#[command(
    name = "outlier-quality",
    version,
    about = "Normalize and validate sports-betting records"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON config file (default: OUTLIER_CONFIG_PATH, then env overrides)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate records against the validation schema
    Validate {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Write the report as JSON
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Exit non-zero when any record is invalid
        #[arg(long)]
        strict: bool,
    },

    /// Coerce records with the normalization schema
    Normalize {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        #[arg(long, value_name = "PATH", default_value = "data/processed/normalized_data.json")]
        output: PathBuf,

        /// Preview without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Full pipeline: load → dedupe → normalize → validate
    Process {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        #[arg(long, value_name = "DIR", default_value = "data/processed")]
        output_dir: PathBuf,

        #[arg(long)]
        strict: bool,

        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::from_env().context("Error loading configuration")?,
    };

    init_tracing(&config);

    let passed = match cli.command {
        Command::Validate { input, output, strict } => {
            run_validate(&config, &input, output.as_deref(), strict || config.strict_mode)?
        }
        Command::Normalize { input, output, dry_run } => {
            run_normalize(&config, &input, &output, dry_run)?;
            true
        }
        Command::Process { input, output_dir, strict, dry_run } => {
            run_process(&config, &input, &output_dir, strict || config.strict_mode, dry_run)?
        }
    };

    if !passed {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.tracing_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(config: &EngineConfig, input: &Path) -> Result<Vec<Record>> {
    println!("📂 Loading {}", input.display());
    let records = load_records(input)?;
    println!("✓ Loaded {} records", records.len());

    let records = match &config.dedupe_key {
        Some(key) if records.iter().any(|r| r.contains_key(key)) => {
            let deduped = dedupe_records(records, key);
            println!("✓ After deduplication: {} records", deduped.len());
            deduped
        }
        _ => records,
    };

    Ok(records)
}

/// Returns false when strict mode rejects the batch
fn run_validate(config: &EngineConfig, input: &Path, output: Option<&Path>, strict: bool) -> Result<bool> {
    let records = load(config, input)?;

    let report = config
        .engine()
        .validate_batch(&records, &config.validation_schema())?;

    print_report(&report)?;

    if let Some(output) = output {
        write_report(output, &report)?;
    }

    Ok(check_strict(&report, strict))
}

fn run_normalize(config: &EngineConfig, input: &Path, output: &Path, dry_run: bool) -> Result<()> {
    let records = load(config, input)?;

    let normalized = config
        .engine()
        .normalize_batch(&records, &config.normalization_schema())?;
    println!("✓ Normalized {} records", normalized.len());

    if dry_run {
        println!("✓ Dry run complete (no data saved)");
    } else {
        write_records_json(output, &normalized)?;
        println!("✓ Data saved to {}", output.display());
    }

    Ok(())
}

fn run_process(
    config: &EngineConfig,
    input: &Path,
    output_dir: &Path,
    strict: bool,
    dry_run: bool,
) -> Result<bool> {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("[1/3] INGESTION");
    let records = load(config, input)?;

    println!("\n[2/3] NORMALIZATION");
    let engine = config.engine();
    let normalized = engine.normalize_batch(&records, &config.normalization_schema())?;
    println!("✓ Normalized {} records", normalized.len());

    // Validate what gets written, not the in-memory timestamps
    println!("\n[3/3] VALIDATION");
    let written = written_form(&normalized)?;
    let report = engine.validate_batch(&written, &config.validation_schema())?;
    println!(
        "✓ Validation complete: {}/{} valid",
        report.valid_records, report.total_records
    );

    if dry_run {
        println!("\n✓ Dry run complete (no data saved)");
    } else {
        write_records_json(output_dir.join("final_data.json"), &normalized)?;
        write_report(&output_dir.join("validation_report.json"), &report)?;
        println!("\n✓ Results saved to {}", output_dir.display());
    }

    print_report(&report)?;
    Ok(check_strict(&report, strict))
}

fn print_report(report: &ValidationReport) -> Result<()> {
    println!("\n📊 {}", report.summary());
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn write_report(path: &Path, report: &ValidationReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
    println!("✓ Report saved to {}", path.display());
    Ok(())
}

fn check_strict(report: &ValidationReport, strict: bool) -> bool {
    if strict && report.invalid_records > 0 {
        eprintln!(
            "❌ Strict mode: {} invalid records found",
            report.invalid_records
        );
        return false;
    }
    true
}
