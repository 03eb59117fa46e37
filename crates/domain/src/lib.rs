//! Prescription Extraction Domain

/// Model configuration
pub mod config;

/// Domain errors
pub mod errors;

/// Prescription extraction
pub mod prescriptions;

pub use config::GeminiConfig;
pub use errors::Error;
