//! AI-first extraction with a regex fallback.

use std::sync::Arc;

use tracing::info;

use super::ai::AiExtractor;
use super::rules::FallbackExtractor;
use crate::error::ExtractionError;
use crate::models::invoice::{ExtractionPath, InvoiceData};

/// Validated fields and the path that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub invoice: InvoiceData,
    pub path: ExtractionPath,
}

/// Runs the AI path and falls back to regex rules when it returns nothing.
///
/// The two results are never merged: once the fallback runs, the AI output
/// is discarded.
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    ai: Arc<dyn AiExtractor>,
    fallback: Arc<dyn FallbackExtractor>,
}

impl ExtractionOrchestrator {
    pub fn new(ai: Arc<dyn AiExtractor>, fallback: Arc<dyn FallbackExtractor>) -> Self {
        Self { ai, fallback }
    }

    /// Extract a validated invoice from recognized text.
    ///
    /// Blank text is rejected before either extractor runs.
    pub async fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }

        let candidates = self.ai.extract(text).await;
        let (candidates, path) = if candidates.is_empty() {
            info!("AI extraction returned no data, using regex fallback");
            (self.fallback.extract(text), ExtractionPath::Fallback)
        } else {
            (candidates, ExtractionPath::Ai)
        };

        let invoice = InvoiceData::from(candidates);
        info!(
            "Extracted {}/4 fields via {} path",
            invoice.filled_fields(),
            path
        );
        Ok(ExtractionResult { invoice, path })
    }
}
