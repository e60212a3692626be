//! Core library for invoice OCR processing.
//!
//! This crate provides:
//! - Document rasterization (images and PDFs to grayscale pages)
//! - Text recognition via tesseract or pure Rust ONNX models
//! - Invoice field extraction with an AI model and a regex fallback
//! - Validation of extracted fields into a canonical invoice record

pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod raster;

pub use error::{ExtractionError, OcrError, RasterError, Result, ScanvoiceError};
pub use extract::{
    AiExtractor, CandidateFields, ExtractionOrchestrator, ExtractionResult, FallbackExtractor,
    GeminiExtractor, RegexExtractor,
};
pub use models::config::ScanvoiceConfig;
pub use models::invoice::{ExtractionPath, InvoiceData, ProcessedInvoice};
pub use ocr::{create_recognizer, TesseractRecognizer, TextRecognizer};
#[cfg(feature = "onnx")]
pub use ocr::OnnxRecognizer;
pub use pipeline::{InvoicePipeline, RecognizedText};
pub use raster::{DocumentKind, PageImage, Rasterizer, RawDocument};
