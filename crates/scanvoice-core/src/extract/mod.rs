//! Invoice field extraction: AI path, regex fallback, and validation.

pub mod ai;
pub mod fields;
mod orchestrator;
pub mod rules;
pub mod validate;

pub use ai::{AiExtractor, GeminiExtractor};
pub use fields::{CandidateFields, RawAmount};
pub use orchestrator::{ExtractionOrchestrator, ExtractionResult};
pub use rules::{FallbackExtractor, RegexExtractor};
pub use validate::{normalize_amount, normalize_date};
