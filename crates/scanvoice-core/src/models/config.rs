//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main configuration for the scanvoice pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanvoiceConfig {
    /// Document rasterization configuration.
    pub raster: RasterConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// AI extraction configuration.
    pub ai: AiConfig,
}

/// Which backend turns PDF pages into images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfRendererKind {
    /// Render with poppler's `pdftoppm`.
    Poppler,
    /// Decode the image embedded in each page (scanned PDFs only).
    Embedded,
}

/// Document rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// DPI for rendering PDF pages to images.
    pub dpi: u32,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,

    /// Longest allowed page side in pixels before downscaling (0 = never).
    pub max_dimension: u32,

    /// PDF rendering backend.
    pub renderer: PdfRendererKind,

    /// Path or name of the `pdftoppm` executable.
    pub pdftoppm_cmd: String,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_pages: 0,
            max_dimension: 4096,
            renderer: PdfRendererKind::Poppler,
            pdftoppm_cmd: "pdftoppm".to_string(),
        }
    }
}

/// Which OCR engine recognizes page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// The `tesseract` command-line tool.
    Tesseract,
    /// Pure Rust ONNX models (requires the `onnx` feature).
    Onnx,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// OCR backend.
    pub engine: OcrEngineKind,

    /// Path or name of the `tesseract` executable.
    pub tesseract_cmd: String,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    pub language: String,

    /// Tesseract page segmentation mode.
    pub page_segmentation_mode: u8,

    /// Directory holding `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` tokens emitted by the ONNX recognizer.
    pub keep_unk: bool,

    /// Pages recognized concurrently within one document (1 = sequential).
    pub page_concurrency: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: 3,
            model_dir: PathBuf::from("models"),
            keep_unk: false,
            page_concurrency: 1,
        }
    }
}

/// AI extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API key; falls back to `GEMINI_API_KEY` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the generative language API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Characters of recognized text sent with the request.
    pub max_input_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash-preview-09-2025".to_string(),
            timeout_secs: 30,
            max_input_chars: 15_000,
        }
    }
}

impl AiConfig {
    /// Resolve the API key from the config, then the environment.
    ///
    /// A blank key counts as missing at either source.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Like [`resolve_api_key`](Self::resolve_api_key) with an injectable
    /// environment lookup.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let present = |key: String| {
            let key = key.trim().to_string();
            (!key.is_empty()).then_some(key)
        };

        self.api_key
            .clone()
            .and_then(present)
            .or_else(|| lookup(API_KEY_ENV).and_then(present))
    }
}

impl ScanvoiceConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
