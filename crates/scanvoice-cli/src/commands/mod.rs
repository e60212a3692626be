//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use scanvoice_core::models::config::{OcrEngineKind, ScanvoiceConfig};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scanvoice")
        .join("config.json")
}

/// The config file in use: `--config` if given, else the default location.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration.
///
/// An explicit path must exist; the default location falls back to built-in
/// defaults when absent.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ScanvoiceConfig> {
    if let Some(path) = explicit {
        let path = Path::new(path);
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(ScanvoiceConfig::from_file(path)?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(ScanvoiceConfig::from_file(&path)?)
    } else {
        Ok(ScanvoiceConfig::default())
    }
}

/// OCR engine selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EngineArg {
    /// tesseract command-line tool
    Tesseract,
    /// Pure Rust ONNX models
    Onnx,
}

impl From<EngineArg> for OcrEngineKind {
    fn from(engine: EngineArg) -> Self {
        match engine {
            EngineArg::Tesseract => OcrEngineKind::Tesseract,
            EngineArg::Onnx => OcrEngineKind::Onnx,
        }
    }
}

/// Pipeline overrides shared by `process` and `batch`.
#[derive(clap::Args, Debug, Clone)]
pub struct PipelineArgs {
    /// OCR engine
    #[arg(short, long, value_enum)]
    engine: Option<EngineArg>,

    /// Model directory for the ONNX engine
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// DPI used when rendering PDF pages
    #[arg(long)]
    dpi: Option<u32>,

    /// Process at most this many pages per document
    #[arg(long)]
    max_pages: Option<usize>,

    /// Pages recognized concurrently per document
    #[arg(long)]
    page_jobs: Option<usize>,
}

impl PipelineArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut ScanvoiceConfig) {
        if let Some(engine) = self.engine {
            config.ocr.engine = engine.into();
        }
        if let Some(dir) = &self.model_dir {
            config.ocr.model_dir = dir.clone();
        }
        if let Some(dpi) = self.dpi {
            config.raster.dpi = dpi;
        }
        if let Some(max_pages) = self.max_pages {
            config.raster.max_pages = max_pages;
        }
        if let Some(jobs) = self.page_jobs {
            config.ocr.page_concurrency = jobs;
        }
    }
}
