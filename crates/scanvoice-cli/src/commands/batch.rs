//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use scanvoice_core::models::invoice::ProcessedInvoice;
use scanvoice_core::raster::DocumentKind;
use scanvoice_core::InvoicePipeline;

use super::process::{csv_record, format_report, InvoiceReport, OutputFormat, CSV_HEADER};
use super::{load_config, PipelineArgs};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of documents processed concurrently
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Result<ProcessedInvoice, String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pipeline.apply(&mut config);

    let files = find_documents(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = Arc::new(InvoicePipeline::from_config(&config)?);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Each document is an independent pipeline run
    let mut in_flight = stream::iter(files)
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let outcome = pipeline
                    .process_path(&path)
                    .await
                    .map_err(|e| e.to_string());
                ProcessResult { path, outcome }
            }
        })
        .buffer_unordered(args.jobs.max(1));

    let mut results = Vec::new();
    while let Some(result) = in_flight.next().await {
        if let Err(error_msg) = &result.outcome {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), error_msg);
            } else {
                overall_pb.abandon();
                error!("Failed to process {}: {}", result.path.display(), error_msg);
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), error_msg);
            }
        }
        results.push(result);
        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    // Completion order is arbitrary; report in input order
    results.sort_by(|a, b| a.path.cmp(&b.path));

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            if let Ok(processed) = &result.outcome {
                let report = InvoiceReport::new(&result.path, processed, false);
                let output_path = output_path(output_dir, &result.path, args.format);
                fs::write(&output_path, format_report(&report, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.outcome.is_err()).collect();
    let successful = results.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let Err(error_msg) = &result.outcome {
                println!("  - {}: {}", result.path.display(), error_msg);
            }
        }
    }

    Ok(())
}

/// Expand a glob pattern to supported documents, sorted by path.
fn find_documents(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            DocumentKind::from_extension(ext).is_some()
        })
        .collect();
    files.sort();
    Ok(files)
}

fn output_path(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");
    output_dir.join(format!("{}.{}", stem, format.extension()))
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = CSV_HEADER.to_vec();
    header.extend(["processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        match &result.outcome {
            Ok(processed) => {
                let report = InvoiceReport::new(&result.path, processed, false);
                let mut record = csv_record(&report).to_vec();
                record.push(processed.processing_time_ms.to_string());
                record.push(String::new());
                wtr.write_record(&record)?;
            }
            Err(error_msg) => {
                let file = result
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut record = vec![file];
                record.resize(CSV_HEADER.len() + 1, String::new());
                record.push(error_msg.clone());
                wtr.write_record(&record)?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
