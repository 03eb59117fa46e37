/// Extraction result and reply interpretation
pub mod extraction;

/// Gemini REST client
pub mod gemini;

/// Input DTOs
pub mod inputs;

/// Model seam
pub mod model;

/// Image normalization
pub mod normalize;

/// Post-processing of extracted prescriptions
pub mod normalized;

/// Instruction sent with every image
pub mod prompt;

/// Extraction pipeline
pub mod service;

pub use extraction::{Extraction, Medication, Prescription};
pub use gemini::{GeminiModel, GeminiProvider};
pub use inputs::ExtractBase64Input;
pub use model::{ExtractionModel, GenerateContentResponse, ModelProvider};
pub use normalize::normalize_to_jpeg;
pub use normalized::{DoseUnit, Issue, IssueCode, NormalizedMedication, NormalizedPrescription};
pub use prompt::EXTRACTION_PROMPT;
pub use service::extract;
