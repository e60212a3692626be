//! Process command - extract data from a single invoice file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use scanvoice_core::models::invoice::{ExtractionPath, InvoiceData, ProcessedInvoice};
use scanvoice_core::raster::DocumentKind;
use scanvoice_core::InvoicePipeline;

use super::{load_config, PipelineArgs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the recognized text in JSON output
    #[arg(long)]
    include_text: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension for outputs in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Serialized view of one processed document.
#[derive(Serialize)]
pub struct InvoiceReport<'a> {
    pub file: String,
    #[serde(flatten)]
    pub invoice: &'a InvoiceData,
    pub path: ExtractionPath,
    pub page_count: usize,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<&'a str>,
}

impl<'a> InvoiceReport<'a> {
    pub fn new(file: &Path, processed: &'a ProcessedInvoice, include_text: bool) -> Self {
        Self {
            file: file_name(file),
            invoice: &processed.invoice,
            path: processed.path,
            page_count: processed.page_count,
            processing_time_ms: processed.processing_time_ms,
            raw_text: include_text.then_some(processed.raw_text.as_str()),
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pipeline.apply(&mut config);

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if DocumentKind::from_extension(extension).is_none() {
        anyhow::bail!("Unsupported file format: {:?}", extension);
    }

    info!("Processing file: {}", args.input.display());

    let pipeline = InvoicePipeline::from_config(&config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Processing {}...", file_name(&args.input)));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = pipeline.process_path(&args.input).await;
    pb.finish_and_clear();
    let processed = result?;

    let report = InvoiceReport::new(&args.input, &processed, args.include_text);
    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output.trim_end());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a report in the requested format.
pub fn format_report(report: &InvoiceReport<'_>, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(std::slice::from_ref(report)),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

pub const CSV_HEADER: [&str; 6] = [
    "file",
    "invoice_number",
    "invoice_date",
    "amount",
    "due_date",
    "path",
];

/// CSV cells for one report, in [`CSV_HEADER`] order.
pub fn csv_record(report: &InvoiceReport<'_>) -> [String; 6] {
    let invoice = report.invoice;
    [
        report.file.clone(),
        invoice.invoice_number.clone().unwrap_or_default(),
        invoice.invoice_date.map(|d| d.to_string()).unwrap_or_default(),
        invoice.amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
        invoice.due_date.map(|d| d.to_string()).unwrap_or_default(),
        report.path.to_string(),
    ]
}

fn format_csv(reports: &[InvoiceReport<'_>]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(CSV_HEADER)?;
    for report in reports {
        wtr.write_record(csv_record(report))?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &InvoiceReport<'_>) -> String {
    let invoice = report.invoice;
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    let mut output = String::new();
    output.push_str(&format!("File:           {}\n", report.file));
    output.push_str(&format!(
        "Invoice number: {}\n",
        or_dash(invoice.invoice_number.clone())
    ));
    output.push_str(&format!(
        "Invoice date:   {}\n",
        or_dash(invoice.invoice_date.map(|d| d.to_string()))
    ));
    output.push_str(&format!(
        "Amount:         {}\n",
        or_dash(invoice.amount.map(|a| format!("{:.2}", a)))
    ));
    output.push_str(&format!(
        "Due date:       {}\n",
        or_dash(invoice.due_date.map(|d| d.to_string()))
    ));
    output.push('\n');
    output.push_str(&format!(
        "Extracted via {} path from {} page(s) in {}ms\n",
        report.path, report.page_count, report.processing_time_ms
    ));

    let missing = invoice.missing_fields();
    if !missing.is_empty() {
        output.push_str(&format!("Missing: {}\n", missing.join(", ")));
    }

    output
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
